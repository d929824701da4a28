//! Test utility functions for brewsteps
#![allow(dead_code)]

use brewsteps::core::config::RecipeConfig;
use brewsteps::hardware::memory::BrewEvent;
use brewsteps::steps::NEXT_STEP_LABEL;
use brewsteps::{BrewContext, BrewStep, ExecutionStatus, Recipe, SimulatedBrewery};
use std::sync::Arc;

pub const AMBIENT: f64 = 20.0;

/// Brewery with the hardware the scenarios refer to
///
/// Kettle `kettle1` (logic off), actors `pump`, `stirrer` and `chiller`,
/// sensor `wort` at ambient temperature.
pub fn brewery() -> Arc<SimulatedBrewery> {
    let brewery = Arc::new(SimulatedBrewery::new());
    brewery.add_kettle("kettle1", "Mash Tun", Some(false));
    for actor in ["pump", "stirrer", "chiller"] {
        brewery.add_actor(actor);
    }
    brewery.set_sensor("wort", Some(AMBIENT));
    brewery
}

/// Parse and build a recipe wired to `brewery`
pub fn recipe_from_yaml(brewery: &Arc<SimulatedBrewery>, yaml: &str) -> Recipe {
    let config = RecipeConfig::from_yaml(yaml).expect("recipe should parse");
    config.to_recipe(BrewContext::from_brewery(brewery.clone()))
}

/// The only step of a one-step recipe
pub fn single_step(brewery: &Arc<SimulatedBrewery>, yaml: &str) -> Arc<dyn BrewStep> {
    let recipe = recipe_from_yaml(brewery, yaml);
    assert_eq!(recipe.len(), 1, "expected a single step");
    recipe.steps[0].clone()
}

/// Press the most recent "Next Step" button; false if there is none
pub async fn press_next_step(brewery: &SimulatedBrewery) -> bool {
    let action = brewery
        .notifications()
        .iter()
        .rev()
        .find_map(|n| n.action(NEXT_STEP_LABEL).cloned());
    match action {
        Some(action) => {
            action.trigger().await;
            true
        }
        None => false,
    }
}

/// Journal index of the first entry matching `predicate`
pub fn first_position(journal: &[BrewEvent], predicate: impl Fn(&BrewEvent) -> bool) -> Option<usize> {
    journal.iter().position(predicate)
}

/// Journal index of the last entry matching `predicate`
pub fn last_position(journal: &[BrewEvent], predicate: impl Fn(&BrewEvent) -> bool) -> Option<usize> {
    journal.iter().rposition(predicate)
}

/// Messages of all notifications with `title`
pub fn messages(brewery: &SimulatedBrewery, title: &str) -> Vec<String> {
    brewery
        .notifications_titled(title)
        .into_iter()
        .map(|n| n.message)
        .collect()
}

pub fn assert_recipe_completed(recipe: &Recipe) {
    assert_eq!(recipe.state.status, ExecutionStatus::Completed);
    assert_eq!(recipe.state.completed_steps, recipe.len());
    assert!(recipe.is_complete());
}
