//! Chill the wort down and predict when it will be cold enough
//!
//! A temperature sample is taken every [`SAMPLE_EVERY`] polling cycles. Once
//! per recompute interval the samples are refitted and the predicted
//! completion time is published as the step summary and a notification.

use super::{stop_timer, switch_actor, timer_for, BrewStep, StepCore, StepKind};
use crate::core::config::CooldownConfig;
use crate::core::error::StepError;
use crate::core::estimator::CooldownModel;
use crate::core::notification::Notification;
use crate::core::state::StepResult;
use crate::core::timer::{Timer, TimerListener};
use crate::hardware::BrewContext;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Polling cycles between two samples
pub const SAMPLE_EVERY: u32 = 10;

pub struct CooldownStep {
    core: Arc<StepCore>,
    config: CooldownConfig,
    recompute_interval: Option<Duration>,
    me: Weak<Self>,
    state: Mutex<CooldownState>,
}

struct CooldownState {
    timer: Option<Timer>,
    model: CooldownModel,
    started: Instant,
    started_at: DateTime<Local>,
    next_check: Instant,
    cycles: u32,
    triggered: bool,
}

impl CooldownState {
    fn new(target: f64, interval: Option<Duration>) -> Self {
        let model = match interval {
            Some(interval) => CooldownModel::with_interval(target, interval),
            None => CooldownModel::new(target),
        };
        let now = Instant::now();
        Self {
            timer: None,
            next_check: now + model.recompute_interval(),
            model,
            started: now,
            started_at: Local::now(),
            cycles: 0,
            triggered: false,
        }
    }

    fn seconds_since_start(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn wall_clock(&self, offset_secs: f64) -> DateTime<Local> {
        self.started_at + chrono::Duration::milliseconds((offset_secs * 1000.0) as i64)
    }
}

impl CooldownStep {
    pub fn new(name: impl Into<String>, config: CooldownConfig, ctx: BrewContext) -> Arc<Self> {
        Self::build(name.into(), config, None, ctx)
    }

    /// Refit more or less often than every 15 minutes
    pub fn with_interval(
        name: impl Into<String>,
        config: CooldownConfig,
        interval: Duration,
        ctx: BrewContext,
    ) -> Arc<Self> {
        Self::build(name.into(), config, Some(interval), ctx)
    }

    fn build(name: String, config: CooldownConfig, interval: Option<Duration>, ctx: BrewContext) -> Arc<Self> {
        let core = StepCore::new(name, ctx);
        let state = CooldownState::new(config.temp, interval);
        Arc::new_cyclic(|me| Self {
            core,
            config,
            recompute_interval: interval,
            me: me.clone(),
            state: Mutex::new(state),
        })
    }

    /// Latest predicted completion time
    pub async fn estimated_completion(&self) -> Option<DateTime<Local>> {
        let state = self.state.lock().await;
        state.model.estimate().map(|offset| state.wall_clock(offset))
    }

    async fn poll(&self) {
        let reading = self.core.ctx().read_sensor(self.config.sensor.as_deref()).await;
        let target = self.config.temp;
        let mut publish = None;
        let mut start = None;

        {
            let mut state = self.state.lock().await;
            if state.cycles >= SAMPLE_EVERY {
                if let Some(temp) = reading {
                    let at = state.seconds_since_start();
                    state.model.push(temp, at);
                }
                state.cycles = 0;
            }

            let now = Instant::now();
            if now >= state.next_check {
                state.next_check = now + state.model.recompute_interval();
                match state.model.refresh() {
                    Ok(offset) => publish = Some(state.wall_clock(offset)),
                    Err(e) => warn!("{}: no completion estimate: {}", self.core.name(), e),
                }
            }

            if reading.is_some_and(|temp| temp <= target) && !state.triggered {
                state.triggered = true;
                start = state.timer.clone();
            }
            state.cycles += 1;
        }

        if let Some(eta) = publish {
            debug!("{}: estimated completion {}", self.core.name(), eta);
            self.core.set_summary(format!("ECT: {}", eta.format("%H:%M")));
            if let Some(current) = reading {
                self.core.notify(Notification::info(
                    "Cooldown Step",
                    format!(
                        "Current: {:.1}°, reaching {}° at {}",
                        current,
                        target,
                        eta.format("%d.%m %H:%M")
                    ),
                ));
            }
            self.core.push_update().await;
        }

        if let Some(timer) = start {
            timer.start().await;
        }
    }

    async fn actor_off(&self) {
        if let Some(actor) = self.config.actor.as_deref() {
            switch_actor(&self.core, actor, false).await;
        }
    }
}

#[async_trait]
impl TimerListener for CooldownStep {
    async fn on_timer_update(&self, _remaining: u64) -> Result<(), StepError> {
        self.core.push_update().await;
        Ok(())
    }

    async fn on_timer_done(&self) -> Result<(), StepError> {
        if !self.core.is_running() {
            return Ok(());
        }
        self.core.set_summary("");
        self.actor_off().await;
        self.core.notify(Notification::info(
            "CoolDown",
            "Wort cooled down. Please transfer to Fermenter.",
        ));
        self.core.next();
        self.core.push_update().await;
        Ok(())
    }
}

#[async_trait]
impl BrewStep for CooldownStep {
    fn core(&self) -> &Arc<StepCore> {
        &self.core
    }

    fn kind(&self) -> StepKind {
        StepKind::Cooldown
    }

    async fn on_start(&self) -> Result<(), StepError> {
        self.core.notify(Notification::info(
            self.core.name(),
            format!("Cool down to {}°", self.config.temp),
        ));

        let reading = self.core.ctx().read_sensor(self.config.sensor.as_deref()).await;
        let mut state = self.state.lock().await;
        let timer = state.timer.take();
        *state = CooldownState::new(self.config.temp, self.recompute_interval);
        state.timer = Some(timer.unwrap_or_else(|| timer_for(&self.me, 1)));
        if let Some(temp) = reading {
            state.model.push(temp, 0.0);
        }
        Ok(())
    }

    async fn run(&self) -> StepResult {
        if let Some(actor) = self.config.actor.as_deref() {
            switch_actor(&self.core, actor, true).await;
        }
        let started_at = self.state.lock().await.started_at;
        self.core.set_summary(format!("Started: {}", started_at.format("%H:%M")));
        self.core.push_update().await;

        loop {
            self.poll().await;
            if !self.core.next_cycle().await {
                break;
            }
        }
        StepResult::Done
    }

    async fn on_stop(&self) -> Result<(), StepError> {
        let timer = self.state.lock().await.timer.clone();
        stop_timer(timer).await;
        self.core.set_summary("");
        self.actor_off().await;
        self.core.push_update().await;
        Ok(())
    }

    async fn reset(&self) -> Result<(), StepError> {
        self.core.ensure_idle()?;
        self.state.lock().await.timer = Some(timer_for(&self.me, 1));
        Ok(())
    }
}
