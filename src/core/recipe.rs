//! Recipe domain model

use crate::core::{config::RecipeConfig, state::RecipeState};
use crate::hardware::BrewContext;
use crate::steps::{build_step, BrewStep};
use std::fmt;
use std::sync::Arc;

/// An ordered brew day, ready to execute
pub struct Recipe {
    /// Recipe name
    pub name: String,

    /// Steps in execution order
    pub steps: Vec<Arc<dyn BrewStep>>,

    /// Execution state
    pub state: RecipeState,
}

impl Recipe {
    pub fn new(name: impl Into<String>, steps: Vec<Arc<dyn BrewStep>>) -> Self {
        Self {
            name: name.into(),
            steps,
            state: RecipeState::new(),
        }
    }

    /// Build every configured step against `ctx`
    pub fn from_config(config: &RecipeConfig, ctx: BrewContext) -> Self {
        let steps = config
            .steps
            .iter()
            .map(|step| build_step(step, ctx.clone()))
            .collect();
        Self::new(config.name.clone(), steps)
    }

    /// Get a step by position
    pub fn step(&self, index: usize) -> Option<&Arc<dyn BrewStep>> {
        self.steps.get(index)
    }

    /// Find a step by display name
    pub fn step_by_name(&self, name: &str) -> Option<&Arc<dyn BrewStep>> {
        self.steps.iter().find(|s| s.name() == name)
    }

    /// The step currently being executed
    pub fn active_step(&self) -> Option<&Arc<dyn BrewStep>> {
        self.state.active_step.and_then(|i| self.steps.get(i))
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Check if every step has reached Done
    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.core().state().is_terminal())
    }
}

impl fmt::Debug for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.steps.iter().map(|s| s.name()).collect();
        f.debug_struct("Recipe")
            .field("name", &self.name)
            .field("steps", &names)
            .field("state", &self.state)
            .finish()
    }
}
