//! Test: A whole brew day through the engine with simulated physics

use crate::helpers::*;
use brewsteps::core::config::RecipeConfig;
use brewsteps::{BrewContext, BrewEngine, ExecutionEvent, ExecutionStatus, StepAction};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

const BREW_DAY: &str = r#"
name: "Pale Ale"
version: "1"
steps:
  - name: "Welcome"
    type: notification
    notification: "Fill the kettle with water"
  - name: "Mash In"
    type: mash_in
    temp: 65
    sensor: "wort"
    kettle: "kettle1"
    auto_mode: true
  - name: "Rest"
    type: mash
    timer: 1
    temp: 66
    sensor: "wort"
    kettle: "kettle1"
    auto_mode: true
  - name: "Pump on"
    type: toggle
    toggle_type: "On"
    actor: "pump"
  - name: "Boil"
    type: boil
    timer: 1
    temp: 99
    sensor: "wort"
    kettle: "kettle1"
    auto_mode: true
    lid_alert: true
  - name: "Chill"
    type: cooldown
    temp: 25
    sensor: "wort"
    actor: "chiller"
"#;

#[tokio::test(start_paused = true)]
async fn test_brew_day_runs_every_step_in_order() {
    let brewery = brewery();
    let config = RecipeConfig::from_yaml(BREW_DAY).unwrap();
    let physics = brewery.spawn_physics(config.thermal_bindings(), AMBIENT);
    let mut recipe = config.to_recipe(BrewContext::from_brewery(brewery.clone()));

    // Operator answering every "Next Step" prompt
    let operator = {
        let brewery = brewery.clone();
        tokio::spawn(async move {
            loop {
                sleep(Duration::from_secs(1)).await;
                press_next_step(&brewery).await;
            }
        })
    };

    let completed = Arc::new(Mutex::new(Vec::new()));
    let mut engine = BrewEngine::new();
    let sink = completed.clone();
    engine.add_event_handler(move |event| {
        if let ExecutionEvent::StepCompleted { name, .. } = event {
            sink.lock().unwrap().push(name);
        }
    });

    let status = engine.execute(&mut recipe).await.unwrap();
    operator.abort();
    physics.abort();

    assert_eq!(status, ExecutionStatus::Completed);
    assert_recipe_completed(&recipe);
    assert_eq!(
        *completed.lock().unwrap(),
        vec!["Welcome", "Mash In", "Rest", "Pump on", "Boil", "Chill"]
    );

    assert_eq!(brewery.actor_state("pump"), Some(true));
    assert_eq!(brewery.actor_state("chiller"), Some(false));
    assert_eq!(brewery.target_temp("kettle1"), Some(0.0));
    assert_eq!(brewery.heater_on("kettle1"), Some(false));
    assert_eq!(messages(&brewery, "Please remove lid!").len(), 1);
    assert!(brewery.sensor("wort").unwrap() <= 25.0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_mash_cancels_and_releases_kettle() {
    let brewery = brewery();
    brewery.set_sensor("wort", Some(66.0));
    let mut recipe = recipe_from_yaml(
        &brewery,
        r#"
name: "Stop Test"
steps:
  - name: "Rest"
    type: mash
    timer: 60
    temp: 66
    sensor: "wort"
    kettle: "kettle1"
    auto_mode: true
  - name: "Pump on"
    type: toggle
    toggle_type: "On"
    actor: "pump"
"#,
    );

    let engine = BrewEngine::new();
    let handle = engine.handle();
    let operator = tokio::spawn(async move {
        sleep(Duration::from_secs(10)).await;
        let extended = handle.perform(StepAction::AddFiveMinutes).await;
        sleep(Duration::from_secs(10)).await;
        handle.stop();
        extended
    });

    let status = engine.execute(&mut recipe).await.unwrap();
    operator.await.unwrap().unwrap();

    assert_eq!(status, ExecutionStatus::Cancelled);
    assert_eq!(recipe.state.completed_steps, 0);
    assert_eq!(brewery.target_temp("kettle1"), Some(0.0));
    assert_eq!(brewery.heater_on("kettle1"), Some(false));
    assert_eq!(brewery.actor_state("pump"), Some(false));
    assert!(messages(&brewery, "Rest").contains(&"5 Minutes added".to_string()));
}
