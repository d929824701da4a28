//! Countdown timer ticking once per second
//!
//! A [`Timer`] owns a background tick task. Every tick it reports the
//! remaining seconds to its listener and, once the elapsed time reaches the
//! configured duration, reports completion exactly once and goes idle.
//!
//! The listener is held weakly so a step can own its timer without forming a
//! reference cycle through the callbacks.

use crate::core::error::StepError;
use async_trait::async_trait;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, warn};

/// Tick period of every timer
pub const TICK: Duration = Duration::from_secs(1);

/// Receives timer callbacks
#[async_trait]
pub trait TimerListener: Send + Sync {
    /// Called after every tick with the seconds left
    async fn on_timer_update(&self, remaining: u64) -> Result<(), StepError>;

    /// Called once when the countdown reaches zero
    async fn on_timer_done(&self) -> Result<(), StepError>;
}

#[derive(Debug)]
struct TimerState {
    duration: u64,
    elapsed: u64,
    running: bool,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

/// Countdown timer with live update and completion callbacks
///
/// Cloning yields another handle to the same timer.
#[derive(Clone)]
pub struct Timer {
    state: Arc<Mutex<TimerState>>,
    listener: Weak<dyn TimerListener>,
}

/// Pending confirmation that a cancelled tick task has terminated
#[derive(Debug)]
pub struct TimerShutdown {
    handle: JoinHandle<()>,
}

impl TimerShutdown {
    /// Wait until the tick task is gone
    pub async fn confirmed(self) {
        if let Err(e) = self.handle.await {
            if e.is_panic() {
                error!("Timer task panicked before shutdown: {}", e);
            }
        }
    }
}

impl Timer {
    /// Create an idle timer counting down `duration_secs`
    pub fn new(duration_secs: u64, listener: Weak<dyn TimerListener>) -> Self {
        Self {
            state: Arc::new(Mutex::new(TimerState {
                duration: duration_secs,
                elapsed: 0,
                running: false,
                generation: 0,
                task: None,
            })),
            listener,
        }
    }

    /// Start (or resume) ticking
    ///
    /// Returns `false` without side effects if the timer is already running.
    /// A timer that already ran to completion starts a fresh countdown.
    pub async fn start(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.running {
            warn!("Timer already running, ignoring start");
            return false;
        }
        if state.elapsed >= state.duration {
            state.elapsed = 0;
        }
        state.running = true;
        state.generation += 1;

        let generation = state.generation;
        let shared = self.state.clone();
        let listener = self.listener.clone();
        state.task = Some(tokio::spawn(tick_loop(shared, listener, generation)));
        debug!(
            "Timer started ({}s of {}s elapsed)",
            state.elapsed, state.duration
        );
        true
    }

    /// Stop ticking immediately
    ///
    /// No tick begins after this returns. The returned handle resolves once
    /// the background task has fully terminated.
    pub async fn cancel(&self) -> Option<TimerShutdown> {
        let mut state = self.state.lock().await;
        state.running = false;
        state.task.take().map(|handle| {
            handle.abort();
            TimerShutdown { handle }
        })
    }

    /// Stop ticking and wait for the tick task to terminate
    pub async fn stop(&self) {
        if let Some(shutdown) = self.cancel().await {
            shutdown.confirmed().await;
        }
    }

    /// Extend a running countdown by `seconds`
    ///
    /// Returns `false` and leaves the timer untouched if it is not running.
    pub async fn add(&self, seconds: u64) -> bool {
        let mut state = self.state.lock().await;
        if !state.running {
            return false;
        }
        state.duration += seconds;
        true
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.running
    }

    pub async fn elapsed(&self) -> u64 {
        self.state.lock().await.elapsed
    }

    pub async fn duration(&self) -> u64 {
        self.state.lock().await.duration
    }

    pub async fn remaining(&self) -> u64 {
        let state = self.state.lock().await;
        state.duration.saturating_sub(state.elapsed)
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer").finish_non_exhaustive()
    }
}

async fn tick_loop(state: Arc<Mutex<TimerState>>, listener: Weak<dyn TimerListener>, generation: u64) {
    let mut ticker = interval_at(Instant::now() + TICK, TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let (remaining, finished) = {
            let mut state = state.lock().await;
            if !state.running || state.generation != generation {
                return;
            }
            state.elapsed += 1;
            let finished = state.elapsed >= state.duration;
            if finished {
                // Detach: completion callbacks run without a cancellable handle
                state.running = false;
                state.task = None;
            }
            (state.duration.saturating_sub(state.elapsed), finished)
        };

        let Some(listener) = listener.upgrade() else {
            debug!("Timer listener dropped, ending tick loop");
            return;
        };

        if let Err(e) = listener.on_timer_update(remaining).await {
            warn!("Timer update callback failed: {}", e);
        }

        if finished {
            if let Err(e) = listener.on_timer_done().await {
                error!("Timer completion callback failed: {}", e);
            }
            return;
        }
    }
}

/// Render seconds as `MM:SS`, or `HH:MM:SS` from one hour up
pub fn format_time(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
