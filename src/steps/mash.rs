//! Temperature-gated mash rest

use super::auto_mode::KettleClaim;
use super::{perform_timer_action, stop_timer, timer_for, BrewStep, StepAction, StepCore, StepKind};
use crate::core::config::MashConfig;
use crate::core::error::StepError;
use crate::core::notification::Notification;
use crate::core::state::StepResult;
use crate::core::timer::{format_time, Timer, TimerListener};
use crate::hardware::BrewContext;
use async_trait::async_trait;
use chrono::Local;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tracing::info;

const ACTIONS: &[StepAction] = &[StepAction::StartTimer, StepAction::AddFiveMinutes];

/// Holds the mash at temperature for `timer` minutes once it gets there
pub struct MashStep {
    core: Arc<StepCore>,
    config: MashConfig,
    me: Weak<Self>,
    state: Mutex<MashState>,
}

#[derive(Default)]
struct MashState {
    timer: Option<Timer>,
    claim: KettleClaim,
    triggered: bool,
}

impl MashStep {
    pub fn new(name: impl Into<String>, config: MashConfig, ctx: BrewContext) -> Arc<Self> {
        let core = StepCore::new(name, ctx);
        Arc::new_cyclic(|me| Self {
            core,
            config,
            me: me.clone(),
            state: Mutex::new(MashState::default()),
        })
    }

    fn duration(&self) -> u64 {
        self.config.timer * 60
    }

    async fn poll(&self) {
        let reading = self.core.ctx().read_sensor(self.config.sensor.as_deref()).await;
        if !reading.is_some_and(|value| value >= self.config.temp) {
            return;
        }

        let timer = {
            let mut state = self.state.lock().await;
            if state.triggered {
                return;
            }
            state.triggered = true;
            state.timer.clone()
        };
        let Some(timer) = timer else {
            return;
        };
        if timer.start().await {
            let eta = Local::now() + chrono::Duration::seconds(timer.remaining().await as i64);
            info!("{}: rest started, ends {}", self.core.name(), eta.format("%H:%M"));
            self.core.notify(Notification::info(
                self.core.name(),
                format!("Timer started. Estimated completion: {}", eta.format("%H:%M")),
            ));
        }
    }
}

#[async_trait]
impl TimerListener for MashStep {
    async fn on_timer_update(&self, remaining: u64) -> Result<(), StepError> {
        self.core.set_summary(format_time(remaining));
        self.core.push_update().await;
        Ok(())
    }

    async fn on_timer_done(&self) -> Result<(), StepError> {
        if !self.core.is_running() {
            return Ok(());
        }
        let claim = self.state.lock().await.claim.clone();

        self.core.set_summary("");
        claim.clear_target(&self.core).await;
        claim.disable_auto(&self.core).await;
        self.core.notify(Notification::success(self.core.name(), "Step finished"));
        self.core.next();
        self.core.push_update().await;
        Ok(())
    }
}

#[async_trait]
impl BrewStep for MashStep {
    fn core(&self) -> &Arc<StepCore> {
        &self.core
    }

    fn kind(&self) -> StepKind {
        StepKind::Mash
    }

    async fn on_start(&self) -> Result<(), StepError> {
        let claim = KettleClaim::acquire(
            &self.core,
            self.config.kettle.as_deref(),
            self.config.temp,
            self.config.auto_mode,
        )
        .await;

        let mut state = self.state.lock().await;
        state.claim = claim;
        state.triggered = false;
        if state.timer.is_none() {
            state.timer = Some(timer_for(&self.me, self.duration()));
        }
        self.core.set_summary("Waiting for Target Temp");
        Ok(())
    }

    async fn run(&self) -> StepResult {
        while self.core.next_cycle().await {
            self.poll().await;
        }
        StepResult::Done
    }

    async fn on_stop(&self) -> Result<(), StepError> {
        let (timer, claim) = {
            let state = self.state.lock().await;
            (state.timer.clone(), state.claim.clone())
        };
        stop_timer(timer).await;
        self.core.set_summary("");
        // Target temperature stays on the kettle; only completion clears it
        claim.disable_auto(&self.core).await;
        self.core.push_update().await;
        Ok(())
    }

    async fn reset(&self) -> Result<(), StepError> {
        self.core.ensure_idle()?;
        let mut state = self.state.lock().await;
        state.timer = Some(timer_for(&self.me, self.duration()));
        state.triggered = false;
        Ok(())
    }

    fn actions(&self) -> &'static [StepAction] {
        ACTIONS
    }

    async fn perform(&self, action: StepAction) -> Result<(), StepError> {
        let timer = {
            let mut state = self.state.lock().await;
            if action == StepAction::StartTimer {
                state.triggered = true;
            }
            state.timer.clone()
        };
        perform_timer_action(&self.core, timer, action).await
    }
}
