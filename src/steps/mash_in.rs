//! Heat strike water, then wait for the brewer to add the malt

use super::auto_mode::KettleClaim;
use super::{stop_timer, timer_for, BrewStep, StepCore, StepKind};
use crate::core::config::MashInConfig;
use crate::core::error::StepError;
use crate::core::notification::Notification;
use crate::core::state::StepResult;
use crate::core::timer::{Timer, TimerListener};
use crate::hardware::BrewContext;
use async_trait::async_trait;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tracing::info;

const DEFAULT_MESSAGE: &str = "Target Temp reached. Please add malt and klick next to move on.";

pub struct MashInStep {
    core: Arc<StepCore>,
    config: MashInConfig,
    me: Weak<Self>,
    state: Mutex<MashInState>,
}

#[derive(Default)]
struct MashInState {
    timer: Option<Timer>,
    claim: KettleClaim,
    triggered: bool,
}

impl MashInStep {
    pub fn new(name: impl Into<String>, config: MashInConfig, ctx: BrewContext) -> Arc<Self> {
        let core = StepCore::new(name, ctx);
        Arc::new_cyclic(|me| Self {
            core,
            config,
            me: me.clone(),
            state: Mutex::new(MashInState::default()),
        })
    }

    async fn poll(&self) {
        let reading = self.core.ctx().read_sensor(self.config.sensor.as_deref()).await;
        let Some(value) = reading else {
            return;
        };
        if value < self.config.temp {
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
        if let Some(timer) = timer {
            info!("{}: target temperature {} reached", self.core.name(), self.config.temp);
            timer.start().await;
        }
    }
}

#[async_trait]
impl TimerListener for MashInStep {
    async fn on_timer_update(&self, _remaining: u64) -> Result<(), StepError> {
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
        self.core.push_update().await;
        claim.disable_auto(&self.core).await;

        let message = self
            .config
            .notification
            .as_deref()
            .filter(|text| !text.is_empty())
            .unwrap_or(DEFAULT_MESSAGE);
        self.core.notify(
            Notification::info(self.core.name(), message).with_action(self.core.next_step_action()),
        );
        Ok(())
    }
}

#[async_trait]
impl BrewStep for MashInStep {
    fn core(&self) -> &Arc<StepCore> {
        &self.core
    }

    fn kind(&self) -> StepKind {
        StepKind::MashIn
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
            state.timer = Some(timer_for(&self.me, 1));
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
        claim.disable_auto(&self.core).await;
        self.core.push_update().await;
        Ok(())
    }

    async fn reset(&self) -> Result<(), StepError> {
        self.core.ensure_idle()?;
        let mut state = self.state.lock().await;
        state.timer = Some(timer_for(&self.me, 1));
        state.triggered = false;
        Ok(())
    }
}
