//! Step executor - drives one step through its lifecycle

use crate::core::error::{EngineError, StepError};
use crate::core::state::{StepResult, StepState};
use crate::steps::BrewStep;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// How a step's polling loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionResult {
    /// The step called `next()`
    Completed,
    /// The loop unwound without the step handing over
    Interrupted,
}

/// Runs a single step: `on_start`, the polling task, and `on_stop`
pub struct StepExecutor {
    step: Arc<dyn BrewStep>,
    task: Option<JoinHandle<StepResult>>,
}

impl StepExecutor {
    pub fn new(step: Arc<dyn BrewStep>) -> Self {
        Self { step, task: None }
    }

    pub fn step(&self) -> &Arc<dyn BrewStep> {
        &self.step
    }

    /// Whether a polling task is alive
    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    /// Start the step and spawn its polling loop
    ///
    /// If `on_start` fails the step is cleaned up with `on_stop` and left idle.
    pub async fn start(&mut self) -> Result<(), StepError> {
        let core = self.step.core().clone();
        if self.task.is_some() {
            return Err(StepError::InvalidState {
                step: core.name().to_string(),
                state: format!("{:?}", core.state()),
            });
        }

        info!("Starting step: {} ({})", core.name(), self.step.kind());
        core.arm();
        core.set_state(StepState::Starting);

        if let Err(e) = self.step.on_start().await {
            error!("Step {} failed to start: {}", core.name(), e);
            if let Err(stop_err) = self.step.on_stop().await {
                warn!("Cleanup of step {} failed: {}", core.name(), stop_err);
            }
            core.set_state(StepState::Idle);
            core.push_update().await;
            return Err(e);
        }

        core.set_running(true);
        core.set_state(StepState::Running);
        core.push_update().await;

        let step = self.step.clone();
        self.task = Some(tokio::spawn(async move { step.run().await }));
        Ok(())
    }

    /// Wait until the step hands over or its loop ends
    pub async fn wait_done(&mut self) -> Result<ExecutionResult, EngineError> {
        let core = self.step.core().clone();
        let Some(task) = self.task.as_mut() else {
            return Err(EngineError::NotRunning(core.name().to_string()));
        };

        let mut advanced = core.subscribe_advanced();
        let joined = tokio::select! {
            changed = advanced.wait_for(|done| *done) => {
                drop(changed);
                None
            }
            joined = &mut *task => Some(joined),
        };
        let joined = match joined {
            Some(joined) => joined,
            None => task.await,
        };
        self.task = None;

        match joined {
            Ok(StepResult::Done) if core.has_advanced() => {
                debug!("Step {} completed", core.name());
                Ok(ExecutionResult::Completed)
            }
            Ok(StepResult::Done) => Ok(ExecutionResult::Interrupted),
            Err(e) => {
                error!("Polling task of step {} failed: {}", core.name(), e);
                Err(EngineError::RunPanicked(core.name().to_string()))
            }
        }
    }

    /// Stop the step from outside and wait for its loop to unwind
    pub async fn stop(&mut self) -> Result<(), StepError> {
        let core = self.step.core().clone();
        if self.task.is_none() && !core.is_running() {
            debug!("Step {} is not running, nothing to stop", core.name());
            return Ok(());
        }

        info!("Stopping step: {}", core.name());
        core.set_state(StepState::Stopping);
        core.set_running(false);
        let result = self.step.on_stop().await;

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("Polling task of step {} failed during stop: {}", core.name(), e);
            }
        }

        core.set_state(StepState::Idle);
        core.push_update().await;
        result
    }
}
