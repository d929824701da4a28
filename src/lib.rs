//! brewsteps - a guided brew day: timed, sensor-triggered brewing steps

pub mod cli;
pub mod core;
pub mod execution;
pub mod hardware;
pub mod steps;

// Re-export commonly used types
pub use core::config::RecipeConfig;
pub use core::{EngineError, ExecutionStatus, Recipe, StepError, StepState, Timer};
pub use execution::{BrewEngine, EngineHandle, ExecutionEvent, ExecutionResult, StepExecutor};
pub use hardware::{BrewContext, HardwareError, SimulatedBrewery};
pub use steps::{BrewStep, StepAction, StepKind};
