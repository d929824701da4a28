//! Test: Mash In and Mash steps wait for the sensor before counting down

use crate::helpers::*;
use brewsteps::hardware::memory::BrewEvent;
use brewsteps::{ExecutionResult, StepAction, StepExecutor};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_test::{assert_err, assert_ok};

const MASH_IN: &str = r#"
name: "Test: Mash In"
steps:
  - name: "Mash In"
    type: mash_in
    temp: 65
    sensor: "wort"
    kettle: "kettle1"
    auto_mode: true
"#;

const MASH_REST: &str = r#"
name: "Test: Mash"
steps:
  - name: "Saccharification"
    type: mash
    timer: 2
    temp: 67
    sensor: "wort"
    kettle: "kettle1"
"#;

#[tokio::test(start_paused = true)]
async fn test_mash_in_waits_for_target_then_asks_for_malt() {
    let brewery = brewery();
    let step = single_step(&brewery, MASH_IN);
    let mut executor = StepExecutor::new(step.clone());

    executor.start().await.unwrap();
    assert_eq!(brewery.target_temp("kettle1"), Some(65.0));
    assert_eq!(brewery.heater_on("kettle1"), Some(true));
    assert_eq!(step.core().summary(), "Waiting for Target Temp");

    // Far below target: nothing happens
    sleep(Duration::from_secs(30)).await;
    assert!(messages(&brewery, "Mash In").is_empty());

    brewery.set_sensor("wort", Some(66.0));
    sleep(Duration::from_secs(5)).await;

    let asked = messages(&brewery, "Mash In");
    assert_eq!(asked.len(), 1);
    assert!(asked[0].contains("add malt"));
    assert_eq!(brewery.target_temp("kettle1"), Some(0.0));
    assert_eq!(brewery.heater_on("kettle1"), Some(false));
    assert_eq!(step.core().summary(), "");

    // Still waiting for the operator
    assert!(!step.core().has_advanced());
    assert!(press_next_step(&brewery).await);
    assert_eq!(executor.wait_done().await.unwrap(), ExecutionResult::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_mash_in_clears_target_after_setting_it() {
    let brewery = brewery();
    brewery.set_sensor("wort", Some(70.0));
    let step = single_step(&brewery, MASH_IN);
    let mut executor = StepExecutor::new(step);

    executor.start().await.unwrap();
    sleep(Duration::from_secs(5)).await;
    assert!(press_next_step(&brewery).await);
    executor.wait_done().await.unwrap();

    let journal = brewery.journal();
    let set = first_position(&journal, |e| {
        matches!(e, BrewEvent::TargetTemp(id, t) if id == "kettle1" && *t == 65.0)
    })
    .unwrap();
    let cleared = last_position(&journal, |e| {
        matches!(e, BrewEvent::TargetTemp(id, t) if id == "kettle1" && *t == 0.0)
    })
    .unwrap();
    assert!(set < cleared);
    assert_eq!(brewery.kettle_toggles("kettle1"), 1);
    assert_eq!(brewery.kettle_stops("kettle1"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_mash_counts_down_only_once_temperature_is_reached() {
    let brewery = brewery();
    let step = single_step(&brewery, MASH_REST);
    let mut executor = StepExecutor::new(step.clone());

    executor.start().await.unwrap();
    sleep(Duration::from_secs(10)).await;
    assert_eq!(step.core().summary(), "Waiting for Target Temp");

    brewery.set_sensor("wort", Some(67.5));
    let heated = Instant::now();
    assert_eq!(executor.wait_done().await.unwrap(), ExecutionResult::Completed);

    let elapsed = heated.elapsed();
    assert!(elapsed >= Duration::from_secs(120));
    assert!(elapsed <= Duration::from_secs(123));
    assert_eq!(brewery.target_temp("kettle1"), Some(0.0));
    assert_eq!(messages(&brewery, "Saccharification").last().map(String::as_str), Some("Step finished"));
}

#[tokio::test(start_paused = true)]
async fn test_manual_start_and_extension() {
    let brewery = brewery();
    let step = single_step(&brewery, MASH_REST);
    let mut executor = StepExecutor::new(step.clone());

    executor.start().await.unwrap();
    sleep(Duration::from_millis(1_500)).await;

    let started = Instant::now();
    assert_ok!(step.perform(StepAction::StartTimer).await);
    assert_ok!(step.perform(StepAction::AddFiveMinutes).await);
    assert_eq!(executor.wait_done().await.unwrap(), ExecutionResult::Completed);

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(420));
    assert!(elapsed <= Duration::from_secs(422));
    assert!(messages(&brewery, "Saccharification").contains(&"5 Minutes added".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_reset_rejected_while_running() {
    let brewery = brewery();
    let step = single_step(&brewery, MASH_REST);
    let mut executor = StepExecutor::new(step.clone());

    executor.start().await.unwrap();
    assert_err!(step.reset().await);

    executor.stop().await.unwrap();
    assert_ok!(step.reset().await);
}
