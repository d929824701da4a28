//! Show a message to the brewer

use super::{stop_timer, timer_for, BrewStep, StepCore, StepKind};
use crate::core::config::NotificationConfig;
use crate::core::error::StepError;
use crate::core::notification::Notification;
use crate::core::state::StepResult;
use crate::core::timer::{Timer, TimerListener};
use crate::hardware::BrewContext;
use async_trait::async_trait;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;

/// Notifies once, then advances on its own or waits for "Next Step"
pub struct NotificationStep {
    core: Arc<StepCore>,
    config: NotificationConfig,
    me: Weak<Self>,
    state: Mutex<NotificationState>,
}

#[derive(Default)]
struct NotificationState {
    timer: Option<Timer>,
    started: bool,
}

impl NotificationStep {
    pub fn new(name: impl Into<String>, config: NotificationConfig, ctx: BrewContext) -> Arc<Self> {
        let core = StepCore::new(name, ctx);
        Arc::new_cyclic(|me| Self {
            core,
            config,
            me: me.clone(),
            state: Mutex::new(NotificationState::default()),
        })
    }

    /// Start the one-tick timer the first time the loop comes round
    async fn start_once(&self) {
        let timer = {
            let mut state = self.state.lock().await;
            if state.started {
                return;
            }
            state.started = true;
            state.timer.get_or_insert_with(|| timer_for(&self.me, 1)).clone()
        };
        timer.start().await;
    }
}

#[async_trait]
impl TimerListener for NotificationStep {
    async fn on_timer_update(&self, _remaining: u64) -> Result<(), StepError> {
        self.core.push_update().await;
        Ok(())
    }

    async fn on_timer_done(&self) -> Result<(), StepError> {
        if !self.core.is_running() {
            return Ok(());
        }
        let text = &self.config.notification;
        self.core.set_summary(text.as_str());

        if self.config.auto_next {
            self.core.notify(Notification::info(self.core.name(), text.as_str()));
            self.core.next();
        } else {
            self.core.notify(
                Notification::info(self.core.name(), text.as_str())
                    .with_action(self.core.next_step_action()),
            );
        }
        self.core.push_update().await;
        Ok(())
    }
}

#[async_trait]
impl BrewStep for NotificationStep {
    fn core(&self) -> &Arc<StepCore> {
        &self.core
    }

    fn kind(&self) -> StepKind {
        StepKind::Notification
    }

    async fn on_start(&self) -> Result<(), StepError> {
        self.core.set_summary("");
        let mut state = self.state.lock().await;
        state.started = false;
        if state.timer.is_none() {
            state.timer = Some(timer_for(&self.me, 1));
        }
        Ok(())
    }

    async fn run(&self) -> StepResult {
        self.start_once().await;
        while self.core.next_cycle().await {}
        StepResult::Done
    }

    async fn on_stop(&self) -> Result<(), StepError> {
        let timer = self.state.lock().await.timer.clone();
        stop_timer(timer).await;
        self.core.set_summary("");
        self.core.push_update().await;
        Ok(())
    }

    async fn reset(&self) -> Result<(), StepError> {
        self.core.ensure_idle()?;
        let mut state = self.state.lock().await;
        state.timer = Some(timer_for(&self.me, 1));
        state.started = false;
        Ok(())
    }
}
