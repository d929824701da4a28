//! Automatic kettle-logic switching tied to a step's lifetime

use super::{claim_kettle, release_kettle, StepCore};
use crate::hardware::BrewContext;
use tracing::{debug, error, warn};

/// Kettle a heating step took over in `on_start`
#[derive(Debug, Clone, Default)]
pub(crate) struct KettleClaim {
    kettle: Option<String>,
    auto_mode: bool,
}

impl KettleClaim {
    /// Point the kettle at `temp` and, with auto mode, switch its logic on
    pub(crate) async fn acquire(core: &StepCore, kettle: Option<&str>, temp: f64, auto_mode: bool) -> Self {
        let kettle = claim_kettle(core, kettle, temp).await;
        if auto_mode {
            if let Some(id) = kettle.as_deref() {
                set_auto_mode(core.ctx(), id, true).await;
            }
        }
        Self { kettle, auto_mode }
    }

    pub(crate) fn kettle(&self) -> Option<&str> {
        self.kettle.as_deref()
    }

    /// Set the target temperature back to 0
    pub(crate) async fn clear_target(&self, core: &StepCore) {
        release_kettle(core, self.kettle()).await;
    }

    /// Switch the kettle logic off if this step switched it on
    pub(crate) async fn disable_auto(&self, core: &StepCore) {
        if !self.auto_mode {
            return;
        }
        if let Some(id) = self.kettle() {
            set_auto_mode(core.ctx(), id, false).await;
        }
    }
}

/// Drive a kettle's heating logic towards `enabled`
///
/// A command is only issued when the current state differs from the
/// desired one. Failures are logged and swallowed so the step keeps running.
/// Returns whether a command was sent successfully.
pub async fn set_auto_mode(ctx: &BrewContext, kettle_id: &str, enabled: bool) -> bool {
    let Some(kettle) = ctx.kettles.kettle(kettle_id).await else {
        warn!("Auto mode: kettle {} not found", kettle_id);
        return false;
    };

    let result = match (kettle.heater_on, enabled) {
        (None | Some(false), true) => ctx.kettles.toggle(kettle_id).await,
        (Some(true), false) => ctx.kettles.stop(kettle_id).await,
        _ => {
            debug!(
                "Auto mode: kettle {} already {}",
                kettle_id,
                if enabled { "on" } else { "off" }
            );
            return false;
        }
    };

    match result {
        Ok(()) => true,
        Err(e) => {
            error!("Failed to switch kettle logic {}: {}", kettle_id, e);
            false
        }
    }
}
