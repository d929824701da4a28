//! Core domain models for brewing recipes
//!
//! This module defines the recipe and its configuration, the countdown
//! timer, the cooldown estimator, notifications and execution state.

pub mod config;
pub mod error;
pub mod estimator;
pub mod notification;
pub mod recipe;
pub mod state;
pub mod timer;

pub use error::{EngineError, StepError};
pub use recipe::*;
pub use state::*;
pub use timer::{format_time, Timer, TimerListener};
