//! Pure countdown step

use super::{pending_countdown, start_while_running, stop_timer, timer_for, BrewStep, StepCore, StepKind};
use crate::core::config::WaitConfig;
use crate::core::error::StepError;
use crate::core::state::StepResult;
use crate::core::timer::{format_time, Timer, TimerListener};
use crate::hardware::BrewContext;
use async_trait::async_trait;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;

/// Waits for a fixed number of minutes, then advances
pub struct WaitStep {
    core: Arc<StepCore>,
    config: WaitConfig,
    me: Weak<Self>,
    timer: Mutex<Option<Timer>>,
}

impl WaitStep {
    pub fn new(name: impl Into<String>, config: WaitConfig, ctx: BrewContext) -> Arc<Self> {
        let core = StepCore::new(name, ctx);
        Arc::new_cyclic(|me| Self {
            core,
            config,
            me: me.clone(),
            timer: Mutex::new(None),
        })
    }

    fn duration(&self) -> u64 {
        self.config.timer * 60
    }
}

#[async_trait]
impl TimerListener for WaitStep {
    async fn on_timer_update(&self, remaining: u64) -> Result<(), StepError> {
        self.core.set_summary(format_time(remaining));
        self.core.push_update().await;
        Ok(())
    }

    async fn on_timer_done(&self) -> Result<(), StepError> {
        if !self.core.is_running() {
            return Ok(());
        }
        self.core.set_summary("");
        self.core.next();
        self.core.push_update().await;
        Ok(())
    }
}

#[async_trait]
impl BrewStep for WaitStep {
    fn core(&self) -> &Arc<StepCore> {
        &self.core
    }

    fn kind(&self) -> StepKind {
        StepKind::Wait
    }

    async fn on_start(&self) -> Result<(), StepError> {
        let timer = {
            let mut slot = self.timer.lock().await;
            slot.get_or_insert_with(|| timer_for(&self.me, self.duration()))
                .clone()
        };
        self.core.set_summary(format_time(pending_countdown(&timer).await));
        Ok(())
    }

    async fn run(&self) -> StepResult {
        start_while_running(&self.core, &self.timer).await;
        while self.core.next_cycle().await {}
        StepResult::Done
    }

    async fn on_stop(&self) -> Result<(), StepError> {
        let timer = self.timer.lock().await.clone();
        stop_timer(timer).await;
        self.core.set_summary("");
        self.core.push_update().await;
        Ok(())
    }

    async fn reset(&self) -> Result<(), StepError> {
        self.core.ensure_idle()?;
        *self.timer.lock().await = Some(timer_for(&self.me, self.duration()));
        Ok(())
    }
}
