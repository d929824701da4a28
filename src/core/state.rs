//! Execution state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Overall recipe execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Recipe has not started
    Pending,
    /// Recipe is currently running
    Running,
    /// Every step reached Done
    Completed,
    /// A step could not be started
    Failed,
    /// The active step was stopped from outside
    Cancelled,
}

/// Lifecycle state of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepState {
    /// Not running; may be (re)started or reset
    Idle,
    /// `on_start` in progress
    Starting,
    /// Polling loop active
    Running,
    /// `on_stop` in progress
    Stopping,
    /// Step handed control to the next one
    Done,
}

impl StepState {
    /// Check if step is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepState::Done)
    }

    /// Whether `reset` is allowed in this state
    pub fn is_idle(&self) -> bool {
        matches!(self, StepState::Idle | StepState::Done)
    }
}

/// Terminal signal returned by a step's polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    Done,
}

/// What observers receive on every `push_update`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSnapshot {
    pub name: String,
    pub state: StepState,
    pub summary: String,
}

/// Overall recipe state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeState {
    /// Unique execution ID
    pub execution_id: Uuid,

    /// Current execution status
    pub status: ExecutionStatus,

    /// When execution started
    pub started_at: Option<DateTime<Utc>>,

    /// When execution completed/failed/was cancelled
    pub completed_at: Option<DateTime<Utc>>,

    /// Total number of steps
    pub total_steps: usize,

    /// Number of steps that reached Done
    pub completed_steps: usize,

    /// Index of the step currently active, if any
    pub active_step: Option<usize>,
}

impl RecipeState {
    pub fn new() -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            status: ExecutionStatus::Pending,
            started_at: None,
            completed_at: None,
            total_steps: 0,
            completed_steps: 0,
            active_step: None,
        }
    }

    /// Mark recipe as started
    pub fn start(&mut self, total_steps: usize) {
        self.status = ExecutionStatus::Running;
        self.started_at = Some(Utc::now());
        self.total_steps = total_steps;
        self.completed_steps = 0;
        self.active_step = None;
    }

    /// Record that the active step finished
    pub fn step_done(&mut self) {
        self.completed_steps += 1;
        self.active_step = None;
    }

    /// Mark recipe as finished with the given status
    pub fn finish(&mut self, status: ExecutionStatus) {
        self.status = status;
        self.completed_at = Some(Utc::now());
        self.active_step = None;
    }

    /// Calculate progress percentage (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_steps == 0 {
            return 0.0;
        }
        self.completed_steps as f64 / self.total_steps as f64
    }
}

impl Default for RecipeState {
    fn default() -> Self {
        Self::new()
    }
}
