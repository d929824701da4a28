//! Main execution engine - runs a recipe step by step

use crate::{
    core::{EngineError, ExecutionStatus, Recipe},
    execution::{ExecutionResult, StepExecutor},
    steps::{BrewStep, StepAction, StepKind},
};
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events that can occur during recipe execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    RecipeStarted {
        execution_id: Uuid,
        recipe_name: String,
        total_steps: usize,
    },
    StepStarted {
        index: usize,
        name: String,
        kind: StepKind,
    },
    StepCompleted {
        index: usize,
        name: String,
    },
    StepStopped {
        index: usize,
        name: String,
    },
    StepFailed {
        index: usize,
        name: String,
        error: String,
    },
    RecipeCompleted {
        execution_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

type ActiveStep = Arc<Mutex<Option<Arc<dyn BrewStep>>>>;

/// Remote control for a running engine
#[derive(Clone)]
pub struct EngineHandle {
    stop: Arc<watch::Sender<bool>>,
    active: ActiveStep,
}

impl EngineHandle {
    /// Ask the engine to stop the active step and end the recipe
    pub fn stop(&self) {
        info!("Stop requested");
        self.stop.send_replace(true);
    }

    pub fn active_step(&self) -> Option<Arc<dyn BrewStep>> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Trigger a manual action on the active step
    pub async fn perform(&self, action: StepAction) -> Result<(), EngineError> {
        let step = self.active_step().ok_or(EngineError::NoActiveStep)?;
        info!("Performing '{}' on step {}", action, step.name());
        step.perform(action).await?;
        Ok(())
    }
}

/// Recipe execution engine
pub struct BrewEngine {
    event_handlers: Vec<EventHandler>,
    stop: Arc<watch::Sender<bool>>,
    active: ActiveStep,
    busy: AtomicBool,
}

impl BrewEngine {
    pub fn new() -> Self {
        Self {
            event_handlers: Vec::new(),
            stop: Arc::new(watch::Sender::new(false)),
            active: Arc::new(Mutex::new(None)),
            busy: AtomicBool::new(false),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            stop: self.stop.clone(),
            active: self.active.clone(),
        }
    }

    /// Emit an event to all handlers
    fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    fn set_active(&self, step: Option<Arc<dyn BrewStep>>) {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = step;
    }

    /// Execute every step of the recipe in order
    ///
    /// Returns the final status; a step that cannot start ends the recipe
    /// with an error after its cleanup ran.
    pub async fn execute(&self, recipe: &mut Recipe) -> Result<ExecutionStatus, EngineError> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(EngineError::AlreadyRunning);
        }
        self.stop.send_replace(false);

        let result = self.run_recipe(recipe).await;

        self.set_active(None);
        self.busy.store(false, Ordering::SeqCst);
        result
    }

    async fn run_recipe(&self, recipe: &mut Recipe) -> Result<ExecutionStatus, EngineError> {
        let execution_id = recipe.state.execution_id;
        info!("Starting recipe: {} ({})", recipe.name, execution_id);
        self.emit_event(ExecutionEvent::RecipeStarted {
            execution_id,
            recipe_name: recipe.name.clone(),
            total_steps: recipe.len(),
        });
        recipe.state.start(recipe.len());

        let mut stop_rx = self.stop.subscribe();
        let mut status = ExecutionStatus::Completed;
        let steps = recipe.steps.clone();

        for (index, step) in steps.into_iter().enumerate() {
            if *stop_rx.borrow_and_update() {
                status = ExecutionStatus::Cancelled;
                break;
            }

            let name = step.name().to_string();
            recipe.state.active_step = Some(index);
            self.set_active(Some(step.clone()));
            self.emit_event(ExecutionEvent::StepStarted {
                index,
                name: name.clone(),
                kind: step.kind(),
            });

            let mut executor = StepExecutor::new(step);
            if let Err(source) = executor.start().await {
                self.emit_event(ExecutionEvent::StepFailed {
                    index,
                    name: name.clone(),
                    error: source.to_string(),
                });
                self.finish(recipe, ExecutionStatus::Failed);
                return Err(EngineError::StartFailed { step: name, source });
            }

            let outcome = tokio::select! {
                outcome = executor.wait_done() => Some(outcome),
                changed = stop_rx.wait_for(|stop| *stop) => {
                    drop(changed);
                    None
                }
            };

            match outcome {
                Some(Ok(ExecutionResult::Completed)) => {
                    recipe.state.step_done();
                    self.emit_event(ExecutionEvent::StepCompleted { index, name });
                }
                Some(Ok(ExecutionResult::Interrupted)) => {
                    warn!("Step {} ended without handing over", name);
                    self.emit_event(ExecutionEvent::StepStopped { index, name });
                    status = ExecutionStatus::Cancelled;
                    break;
                }
                Some(Err(e)) => {
                    error!("Step {} failed: {}", name, e);
                    self.emit_event(ExecutionEvent::StepFailed {
                        index,
                        name,
                        error: e.to_string(),
                    });
                    self.finish(recipe, ExecutionStatus::Failed);
                    return Err(e);
                }
                None => {
                    if let Err(e) = executor.stop().await {
                        warn!("Cleanup of step {} failed: {}", name, e);
                    }
                    self.emit_event(ExecutionEvent::StepStopped { index, name });
                    status = ExecutionStatus::Cancelled;
                    break;
                }
            }
        }

        info!("Recipe finished: {} - {:?}", recipe.name, status);
        self.finish(recipe, status);
        Ok(status)
    }

    fn finish(&self, recipe: &mut Recipe, status: ExecutionStatus) {
        recipe.state.finish(status);
        self.emit_event(ExecutionEvent::RecipeCompleted {
            execution_id: recipe.state.execution_id,
            status,
        });
    }
}

impl Default for BrewEngine {
    fn default() -> Self {
        Self::new()
    }
}
