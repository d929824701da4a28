//! Hold an actor on for a fixed time

use super::{pending_countdown, start_while_running, switch_actor, timer_for, BrewStep, StepCore, StepKind};
use crate::core::config::ActorConfig;
use crate::core::error::StepError;
use crate::core::state::StepResult;
use crate::core::timer::{format_time, Timer, TimerListener};
use crate::hardware::BrewContext;
use async_trait::async_trait;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;

/// Switches an actor on for `timer` minutes and off again afterwards
pub struct ActorStep {
    core: Arc<StepCore>,
    config: ActorConfig,
    me: Weak<Self>,
    timer: Mutex<Option<Timer>>,
}

impl ActorStep {
    pub fn new(name: impl Into<String>, config: ActorConfig, ctx: BrewContext) -> Arc<Self> {
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

    async fn actor_off(&self) {
        if let Some(actor) = self.config.actor.as_deref() {
            switch_actor(&self.core, actor, false).await;
        }
    }
}

#[async_trait]
impl TimerListener for ActorStep {
    async fn on_timer_update(&self, remaining: u64) -> Result<(), StepError> {
        self.core.set_summary(format_time(remaining));
        self.core.push_update().await;
        Ok(())
    }

    async fn on_timer_done(&self) -> Result<(), StepError> {
        if !self.core.is_running() {
            return Ok(());
        }
        self.actor_off().await;
        self.core.set_summary("");
        self.core.next();
        self.core.push_update().await;
        Ok(())
    }
}

#[async_trait]
impl BrewStep for ActorStep {
    fn core(&self) -> &Arc<StepCore> {
        &self.core
    }

    fn kind(&self) -> StepKind {
        StepKind::Actor
    }

    async fn on_start(&self) -> Result<(), StepError> {
        let timer = {
            let mut slot = self.timer.lock().await;
            slot.get_or_insert_with(|| timer_for(&self.me, self.duration()))
                .clone()
        };
        self.core.set_summary(format_time(pending_countdown(&timer).await));

        if let Some(actor) = self.config.actor.as_deref() {
            switch_actor(&self.core, actor, true).await;
        }
        Ok(())
    }

    async fn run(&self) -> StepResult {
        start_while_running(&self.core, &self.timer).await;
        while self.core.next_cycle().await {}
        StepResult::Done
    }

    /// No tick may run once this begins, and the actor goes off before
    /// the tick task is confirmed gone.
    async fn on_stop(&self) -> Result<(), StepError> {
        let timer = self.timer.lock().await.clone();
        let shutdown = match timer {
            Some(timer) => timer.cancel().await,
            None => None,
        };
        self.actor_off().await;
        if let Some(shutdown) = shutdown {
            shutdown.confirmed().await;
        }
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
