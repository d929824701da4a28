//! Switch one actor on or off, then move on

use super::{start_while_running, stop_timer, switch_actor, timer_for, BrewStep, StepCore, StepKind};
use crate::core::config::{ToggleConfig, ToggleType};
use crate::core::error::StepError;
use crate::core::state::StepResult;
use crate::core::timer::{format_time, Timer, TimerListener};
use crate::hardware::BrewContext;
use async_trait::async_trait;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;

/// Single-tick step that switches its actor once
pub struct ToggleStep {
    core: Arc<StepCore>,
    config: ToggleConfig,
    me: Weak<Self>,
    timer: Mutex<Option<Timer>>,
}

impl ToggleStep {
    pub fn new(name: impl Into<String>, config: ToggleConfig, ctx: BrewContext) -> Arc<Self> {
        let core = StepCore::new(name, ctx);
        Arc::new_cyclic(|me| Self {
            core,
            config,
            me: me.clone(),
            timer: Mutex::new(None),
        })
    }
}

#[async_trait]
impl TimerListener for ToggleStep {
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
impl BrewStep for ToggleStep {
    fn core(&self) -> &Arc<StepCore> {
        &self.core
    }

    fn kind(&self) -> StepKind {
        StepKind::Toggle
    }

    async fn on_start(&self) -> Result<(), StepError> {
        self.timer
            .lock()
            .await
            .get_or_insert_with(|| timer_for(&self.me, 1));

        if let Some(actor) = self.config.actor.as_deref() {
            switch_actor(&self.core, actor, self.config.toggle_type == ToggleType::On).await;
        }
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
        *self.timer.lock().await = Some(timer_for(&self.me, 1));
        Ok(())
    }
}
