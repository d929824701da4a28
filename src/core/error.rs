//! Error types for steps and the recipe engine

use crate::hardware::HardwareError;
use thiserror::Error;

/// Errors raised by step lifecycle hooks and manual actions
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Hardware(#[from] HardwareError),

    #[error("Step '{step}' is {state}, expected it to be idle")]
    InvalidState { step: String, state: String },

    #[error("Step '{step}' does not support action '{action}'")]
    UnsupportedAction { step: String, action: String },

    #[error("Step '{0}' has no timer")]
    NoTimer(String),
}

/// Errors surfaced by the recipe engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Step '{step}' failed to start: {source}")]
    StartFailed {
        step: String,
        #[source]
        source: StepError,
    },

    #[error("Polling task for step '{0}' panicked")]
    RunPanicked(String),

    #[error("Step '{0}' is not running")]
    NotRunning(String),

    #[error("Recipe is already running")]
    AlreadyRunning,

    #[error("No step is active")]
    NoActiveStep,

    #[error(transparent)]
    Step(#[from] StepError),
}
