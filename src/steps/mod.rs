//! Brewing steps
//!
//! Every step implements [`BrewStep`]: `on_start`, a cooperative `run` loop
//! polling once per second, `on_stop` and `reset`. Shared behaviour lives in
//! [`StepCore`] and in small helper functions rather than a base type; each
//! variant composes what it needs.

pub mod actor;
pub mod alerts;
pub mod auto_mode;
pub mod boil;
pub mod cooldown;
pub mod mash;
pub mod mash_in;
pub mod notification;
pub mod toggle;
pub mod wait;

pub use actor::ActorStep;
pub use boil::BoilStep;
pub use cooldown::CooldownStep;
pub use mash::MashStep;
pub use mash_in::MashInStep;
pub use notification::NotificationStep;
pub use toggle::ToggleStep;
pub use wait::WaitStep;

use crate::core::config::{StepConfig, StepProps};
use crate::core::error::StepError;
use crate::core::notification::{ActionCallback, Notification, NotificationAction};
use crate::core::state::{StepResult, StepSnapshot, StepState};
use crate::core::timer::{Timer, TimerListener};
use crate::hardware::BrewContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

/// Period of every step's polling loop
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Label of the notification button that advances a waiting step
pub const NEXT_STEP_LABEL: &str = "Next Step";

/// Step variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Notification,
    MashIn,
    Mash,
    Wait,
    Toggle,
    Actor,
    Boil,
    Cooldown,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepKind::Notification => "NotificationStep",
            StepKind::MashIn => "MashInStep",
            StepKind::Mash => "MashStep",
            StepKind::Wait => "WaitStep",
            StepKind::Toggle => "ToggleStep",
            StepKind::Actor => "ActorStep",
            StepKind::Boil => "BoilStep",
            StepKind::Cooldown => "CooldownStep",
        };
        f.write_str(name)
    }
}

/// Manual actions an operator can trigger on a running step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    /// Start the countdown without waiting for the trigger temperature
    StartTimer,
    /// Extend a running countdown by five minutes
    AddFiveMinutes,
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepAction::StartTimer => f.write_str("Start Timer"),
            StepAction::AddFiveMinutes => f.write_str("Add 5 Minutes to Timer"),
        }
    }
}

/// Lifecycle contract shared by all step variants
#[async_trait]
pub trait BrewStep: Send + Sync {
    /// Shared state (name, running flag, summary, hand-off signal)
    fn core(&self) -> &Arc<StepCore>;

    fn kind(&self) -> StepKind;

    fn name(&self) -> &str {
        self.core().name()
    }

    /// Prepare the step: resolve collaborators, create the timer
    async fn on_start(&self) -> Result<(), StepError>;

    /// Polling loop; returns once the step is no longer running
    async fn run(&self) -> StepResult;

    /// Cleanup after an external stop; safe after a partial `on_start`
    async fn on_stop(&self) -> Result<(), StepError>;

    /// Recreate the timer for a clean restart; only while idle
    async fn reset(&self) -> Result<(), StepError>;

    /// Manual actions this variant exposes
    fn actions(&self) -> &'static [StepAction] {
        &[]
    }

    async fn perform(&self, action: StepAction) -> Result<(), StepError> {
        Err(StepError::UnsupportedAction {
            step: self.name().to_string(),
            action: action.to_string(),
        })
    }
}

/// State every step carries, independent of its variant
pub struct StepCore {
    name: String,
    ctx: BrewContext,
    running: watch::Sender<bool>,
    advanced: watch::Sender<bool>,
    state: watch::Sender<StepState>,
    summary: watch::Sender<String>,
}

impl StepCore {
    pub fn new(name: impl Into<String>, ctx: BrewContext) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            ctx,
            running: watch::Sender::new(false),
            advanced: watch::Sender::new(false),
            state: watch::Sender::new(StepState::Idle),
            summary: watch::Sender::new(String::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ctx(&self) -> &BrewContext {
        &self.ctx
    }

    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    /// Flip the running flag; clearing it unwinds the polling loop
    pub fn set_running(&self, running: bool) {
        self.running.send_replace(running);
    }

    pub fn state(&self) -> StepState {
        *self.state.borrow()
    }

    pub fn set_state(&self, state: StepState) {
        self.state.send_replace(state);
    }

    pub fn summary(&self) -> String {
        self.summary.borrow().clone()
    }

    pub fn set_summary(&self, summary: impl Into<String>) {
        self.summary.send_replace(summary.into());
    }

    pub fn snapshot(&self) -> StepSnapshot {
        StepSnapshot {
            name: self.name.clone(),
            state: self.state(),
            summary: self.summary(),
        }
    }

    /// Publish the current snapshot to observers
    pub async fn push_update(&self) {
        self.ctx.observer.push_update(self.snapshot()).await;
    }

    pub fn notify(&self, notification: Notification) {
        self.ctx.notifier.notify(notification);
    }

    /// Clear the hand-off flag before a (re)start
    pub fn arm(&self) {
        self.advanced.send_replace(false);
    }

    /// Hand control to the following step
    ///
    /// Only the first call has an effect; returns whether this call advanced.
    pub fn next(&self) -> bool {
        if self.advanced.send_replace(true) {
            warn!("Step {} already handed over, ignoring next()", self.name);
            return false;
        }
        info!("Step {} done", self.name);
        self.running.send_replace(false);
        self.state.send_replace(StepState::Done);
        true
    }

    pub fn has_advanced(&self) -> bool {
        *self.advanced.borrow()
    }

    pub fn subscribe_advanced(&self) -> watch::Receiver<bool> {
        self.advanced.subscribe()
    }

    /// Suspend for one polling period
    ///
    /// Returns `false` as soon as the step stops running, without waiting out
    /// the rest of the period.
    pub async fn next_cycle(&self) -> bool {
        let mut running = self.running.subscribe();
        if !*running.borrow_and_update() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => self.is_running(),
            _ = running.wait_for(|r| !*r) => false,
        }
    }

    pub fn ensure_idle(&self) -> Result<(), StepError> {
        let state = self.state();
        if state.is_idle() {
            Ok(())
        } else {
            Err(StepError::InvalidState {
                step: self.name.clone(),
                state: format!("{:?}", state),
            })
        }
    }

    /// Notification button that advances this step
    pub fn next_step_action(self: &Arc<Self>) -> NotificationAction {
        NotificationAction::new(
            NEXT_STEP_LABEL,
            Arc::new(NextStepCallback {
                core: Arc::downgrade(self),
            }),
        )
    }
}

impl fmt::Debug for StepCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepCore")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("running", &self.is_running())
            .finish()
    }
}

struct NextStepCallback {
    core: Weak<StepCore>,
}

#[async_trait]
impl ActionCallback for NextStepCallback {
    async fn invoke(&self) {
        let Some(core) = self.core.upgrade() else {
            return;
        };
        if core.is_running() {
            core.next();
            core.push_update().await;
        } else {
            warn!("Step {} is not running, ignoring Next Step", core.name());
        }
    }
}

/// Instantiate the step a configuration entry describes
pub fn build_step(config: &StepConfig, ctx: BrewContext) -> Arc<dyn BrewStep> {
    let name = config.name.clone();
    match &config.props {
        StepProps::Notification(c) => NotificationStep::new(name, c.clone(), ctx),
        StepProps::MashIn(c) => MashInStep::new(name, c.clone(), ctx),
        StepProps::Mash(c) => MashStep::new(name, c.clone(), ctx),
        StepProps::Wait(c) => WaitStep::new(name, c.clone(), ctx),
        StepProps::Toggle(c) => ToggleStep::new(name, c.clone(), ctx),
        StepProps::Actor(c) => ActorStep::new(name, c.clone(), ctx),
        StepProps::Boil(c) => BoilStep::new(name, c.clone(), ctx),
        StepProps::Cooldown(c) => CooldownStep::new(name, c.clone(), ctx),
    }
}

/// Create a timer whose callbacks go to `listener`
pub(crate) fn timer_for<L: TimerListener + 'static>(listener: &Weak<L>, seconds: u64) -> Timer {
    let listener: Weak<dyn TimerListener> = listener.clone();
    Timer::new(seconds, listener)
}

/// Start the timer in `slot` from the polling task
///
/// Skipped once a stop has begun. The slot stays locked until the start
/// lands, so `on_stop` always sees a timer it can cancel.
pub(crate) async fn start_while_running(core: &StepCore, slot: &Mutex<Option<Timer>>) {
    let slot = slot.lock().await;
    if !core.is_running() {
        return;
    }
    if let Some(timer) = slot.as_ref() {
        timer.start().await;
    }
}

/// Countdown shown before a timer starts; a finished timer counts its full length again
pub(crate) async fn pending_countdown(timer: &Timer) -> u64 {
    match timer.remaining().await {
        0 => timer.duration().await,
        remaining => remaining,
    }
}

/// Stop a timer if one exists
pub(crate) async fn stop_timer(timer: Option<Timer>) {
    if let Some(timer) = timer {
        timer.stop().await;
    }
}

/// Resolve the configured kettle and point it at `temp`
///
/// Returns the kettle id when it exists.
pub(crate) async fn claim_kettle(core: &StepCore, kettle: Option<&str>, temp: f64) -> Option<String> {
    let id = kettle?;
    let ctx = core.ctx();
    if ctx.kettles.kettle(id).await.is_none() {
        warn!("Step {}: kettle {} not found", core.name(), id);
        return None;
    }
    if let Err(e) = ctx.kettles.set_target_temp(id, temp).await {
        warn!("Step {}: failed to set target temp on {}: {}", core.name(), id, e);
    }
    Some(id.to_string())
}

/// Clear a kettle's target temperature
pub(crate) async fn release_kettle(core: &StepCore, kettle: Option<&str>) {
    if let Some(id) = kettle {
        if let Err(e) = core.ctx().kettles.set_target_temp(id, 0.0).await {
            warn!("Step {}: failed to clear target temp on {}: {}", core.name(), id, e);
        }
    }
}

/// Switch an actor, logging instead of failing
pub(crate) async fn switch_actor(core: &StepCore, actor: &str, on: bool) {
    let actors = &core.ctx().actors;
    let result = if on {
        actors.actor_on(actor).await
    } else {
        actors.actor_off(actor).await
    };
    if let Err(e) = result {
        warn!(
            "Step {}: failed to switch actor {} {}: {}",
            core.name(),
            actor,
            if on { "on" } else { "off" },
            e
        );
    }
}

/// Shared handling of the "Start Timer" / "Add 5 Minutes" actions
pub(crate) async fn perform_timer_action(
    core: &StepCore,
    timer: Option<Timer>,
    action: StepAction,
) -> Result<(), StepError> {
    let timer = timer.ok_or_else(|| StepError::NoTimer(core.name().to_string()))?;
    match action {
        StepAction::StartTimer => {
            if timer.is_running().await {
                core.notify(Notification::warning(core.name(), "Timer is already running"));
            } else {
                core.notify(Notification::info(core.name(), "Timer started"));
                timer.start().await;
            }
        }
        StepAction::AddFiveMinutes => {
            if timer.add(300).await {
                core.notify(Notification::info(core.name(), "5 Minutes added"));
            } else {
                core.notify(Notification::warning(
                    core.name(),
                    "Timer must be running to add time",
                ));
            }
        }
    }
    Ok(())
}
