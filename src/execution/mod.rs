//! Recipe execution engine

pub mod engine;
pub mod executor;

pub use engine::{BrewEngine, EngineHandle, EventHandler, ExecutionEvent};
pub use executor::{ExecutionResult, StepExecutor};
