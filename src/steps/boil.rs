//! Boil with lid, first wort and hop addition alerts

use super::alerts::{AlertId, AlertTable};
use super::auto_mode::KettleClaim;
use super::{perform_timer_action, stop_timer, timer_for, BrewStep, StepAction, StepCore, StepKind};
use crate::core::config::{BoilConfig, HopAddition, TEMP_UNIT_KEY};
use crate::core::error::StepError;
use crate::core::notification::Notification;
use crate::core::state::StepResult;
use crate::core::timer::{format_time, Timer, TimerListener};
use crate::hardware::BrewContext;
use async_trait::async_trait;
use chrono::Local;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tracing::{debug, info};

const ACTIONS: &[StepAction] = &[StepAction::StartTimer, StepAction::AddFiveMinutes];

/// Lid alert threshold in Celsius
pub const LID_TEMP_C: f64 = 95.0;
/// Lid alert threshold in Fahrenheit
pub const LID_TEMP_F: f64 = 203.0;

pub struct BoilStep {
    core: Arc<StepCore>,
    config: BoilConfig,
    me: Weak<Self>,
    state: Mutex<BoilState>,
}

struct BoilState {
    timer: Option<Timer>,
    claim: KettleClaim,
    triggered: bool,
    alerts: AlertTable,
    /// Seconds left as of the last tick; `None` until the countdown runs
    remaining: Option<u64>,
    lid_temp: f64,
}

impl Default for BoilState {
    fn default() -> Self {
        Self {
            timer: None,
            claim: KettleClaim::default(),
            triggered: false,
            alerts: AlertTable::new(),
            remaining: None,
            lid_temp: LID_TEMP_C,
        }
    }
}

/// Lid threshold for the configured temperature unit
pub fn lid_temperature(unit: &str) -> f64 {
    if unit == "C" {
        LID_TEMP_C
    } else {
        LID_TEMP_F
    }
}

impl BoilStep {
    pub fn new(name: impl Into<String>, config: BoilConfig, ctx: BrewContext) -> Arc<Self> {
        let core = StepCore::new(name, ctx);
        Arc::new_cyclic(|me| Self {
            core,
            config,
            me: me.clone(),
            state: Mutex::new(BoilState::default()),
        })
    }

    fn duration(&self) -> u64 {
        self.config.timer * 60
    }

    fn hop(&self, number: u8) -> Option<&HopAddition> {
        self.config.hops.get(usize::from(number).checked_sub(1)?)
    }

    async fn first_wort_notice(&self) {
        if !self.state.lock().await.alerts.fire(AlertId::FirstWort) {
            return;
        }
        let message = match self.config.first_wort_text.as_deref() {
            Some(text) if !text.is_empty() => format!("Please add {} for first wort", text),
            _ => "Please add hops for first wort".to_string(),
        };
        self.core.notify(Notification::info("First Wort Hop Addition!", message));
    }

    /// Fire every hop alert due with `remaining` seconds left
    fn due_hops(&self, alerts: &mut AlertTable, remaining: u64) -> Vec<Notification> {
        let mut notices = Vec::new();
        for id in alerts.pending() {
            let AlertId::Hop(number) = id else {
                continue;
            };
            let Some(hop) = self.hop(number) else {
                continue;
            };
            if remaining <= hop.minutes * 60 + 1 && alerts.fire(id) {
                notices.push(hop_notice(number, hop));
            }
        }
        notices
    }

    async fn poll(&self) {
        let reading = self.core.ctx().read_sensor(self.config.sensor.as_deref()).await;
        let mut notices = Vec::new();
        let mut start = None;

        {
            let mut state = self.state.lock().await;
            if let Some(value) = reading {
                if value >= state.lid_temp && state.alerts.fire(AlertId::Lid) {
                    notices.push(Notification::info(
                        "Please remove lid!",
                        "Reached temp close to boiling",
                    ));
                }
                if value >= self.config.temp && !state.triggered {
                    state.triggered = true;
                    start = state.timer.clone();
                }
            }

            if let Some(remaining) = state.remaining {
                notices.extend(self.due_hops(&mut state.alerts, remaining));
            }
        }

        for notice in notices {
            debug!("{}: {}", self.core.name(), notice.message);
            self.core.notify(notice);
        }

        if let Some(timer) = start {
            if timer.start().await {
                let eta = Local::now() + chrono::Duration::seconds(timer.remaining().await as i64);
                info!("{}: boil started, ends {}", self.core.name(), eta.format("%H:%M"));
                self.core.notify(Notification::info(
                    self.core.name(),
                    format!("Timer started. Estimated completion: {}", eta.format("%H:%M")),
                ));
            }
        }
    }
}

fn hop_notice(number: u8, hop: &HopAddition) -> Notification {
    let message = match hop.text.as_deref() {
        Some(text) if !text.is_empty() => format!("Please add {} ({})", text, number),
        _ => format!("Please add Hop {}", number),
    };
    Notification::info("Hop Alert", message)
}

#[async_trait]
impl TimerListener for BoilStep {
    async fn on_timer_update(&self, remaining: u64) -> Result<(), StepError> {
        self.state.lock().await.remaining = Some(remaining);
        self.core.set_summary(format_time(remaining));
        self.core.push_update().await;
        Ok(())
    }

    async fn on_timer_done(&self) -> Result<(), StepError> {
        if !self.core.is_running() {
            return Ok(());
        }
        let (claim, late_hops) = {
            let mut state = self.state.lock().await;
            let late_hops = self.due_hops(&mut state.alerts, 0);
            (state.claim.clone(), late_hops)
        };
        for notice in late_hops {
            self.core.notify(notice);
        }

        self.core.set_summary("");
        claim.clear_target(&self.core).await;
        claim.disable_auto(&self.core).await;
        self.core.notify(Notification::success(self.core.name(), "Boiling completed"));
        self.core.next();
        self.core.push_update().await;
        Ok(())
    }
}

#[async_trait]
impl BrewStep for BoilStep {
    fn core(&self) -> &Arc<StepCore> {
        &self.core
    }

    fn kind(&self) -> StepKind {
        StepKind::Boil
    }

    async fn on_start(&self) -> Result<(), StepError> {
        let unit = self.core.ctx().config.config_value(TEMP_UNIT_KEY, "C");
        let claim = KettleClaim::acquire(
            &self.core,
            self.config.kettle.as_deref(),
            self.config.temp,
            self.config.auto_mode,
        )
        .await;

        let mut state = self.state.lock().await;
        state.lid_temp = lid_temperature(&unit);
        state.claim = claim;
        state.triggered = false;
        state.remaining = None;

        state.alerts.clear();
        if self.config.first_wort {
            state.alerts.arm(AlertId::FirstWort);
        }
        if self.config.lid_alert {
            state.alerts.arm(AlertId::Lid);
        }
        for number in 1..=self.config.hops.len() {
            if let Ok(number) = u8::try_from(number) {
                state.alerts.arm(AlertId::Hop(number));
            }
        }

        if state.timer.is_none() {
            state.timer = Some(timer_for(&self.me, self.duration()));
        }
        self.core.set_summary("Waiting for Target Temp");
        Ok(())
    }

    async fn run(&self) -> StepResult {
        self.first_wort_notice().await;
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
        claim.clear_target(&self.core).await;
        claim.disable_auto(&self.core).await;
        self.core.push_update().await;
        Ok(())
    }

    async fn reset(&self) -> Result<(), StepError> {
        self.core.ensure_idle()?;
        let mut state = self.state.lock().await;
        state.timer = Some(timer_for(&self.me, self.duration()));
        state.triggered = false;
        state.remaining = None;
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
