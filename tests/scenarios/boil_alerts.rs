//! Test: Boil step alerts (first wort, lid, hop additions) fire once each

use crate::helpers::*;
use brewsteps::{ExecutionResult, StepExecutor};
use std::time::Duration;
use tokio::time::sleep;

const HOPPED_BOIL: &str = r#"
name: "Test: Boil"
steps:
  - name: "Boil"
    type: boil
    timer: 2
    temp: 99
    sensor: "wort"
    kettle: "kettle1"
    lid_alert: true
    first_wort: true
    first_wort_text: "Magnum"
    hops:
      - minutes: 1
        text: "Cascade"
"#;

#[tokio::test(start_paused = true)]
async fn test_boil_alerts_fire_once_each() {
    let brewery = brewery();
    brewery.set_sensor("wort", Some(90.0));
    let step = single_step(&brewery, HOPPED_BOIL);
    let mut executor = StepExecutor::new(step);

    executor.start().await.unwrap();
    sleep(Duration::from_millis(500)).await;
    assert_eq!(
        messages(&brewery, "First Wort Hop Addition!"),
        vec!["Please add Magnum for first wort"]
    );

    sleep(Duration::from_secs(5)).await;
    assert!(messages(&brewery, "Please remove lid!").is_empty());

    brewery.set_sensor("wort", Some(96.0));
    sleep(Duration::from_secs(5)).await;
    assert_eq!(messages(&brewery, "Please remove lid!").len(), 1);

    // Boiling: countdown starts, hop alert waits for the last minute
    brewery.set_sensor("wort", Some(100.0));
    sleep(Duration::from_secs(30)).await;
    assert!(messages(&brewery, "Hop Alert").is_empty());
    assert!(messages(&brewery, "Boil")
        .iter()
        .any(|m| m.starts_with("Timer started. Estimated completion:")));

    assert_eq!(executor.wait_done().await.unwrap(), ExecutionResult::Completed);
    assert_eq!(messages(&brewery, "Hop Alert"), vec!["Please add Cascade (1)"]);
    assert_eq!(messages(&brewery, "Please remove lid!").len(), 1);
    assert_eq!(messages(&brewery, "First Wort Hop Addition!").len(), 1);
    assert_eq!(messages(&brewery, "Boil").last().map(String::as_str), Some("Boiling completed"));
    assert_eq!(brewery.target_temp("kettle1"), Some(0.0));
}

#[tokio::test(start_paused = true)]
async fn test_hop_alert_timing() {
    let brewery = brewery();
    brewery.set_sensor("wort", Some(100.0));
    let step = single_step(&brewery, HOPPED_BOIL);
    let mut executor = StepExecutor::new(step);

    executor.start().await.unwrap();
    // Countdown runs from the first poll; 120s total, alert due with 60s left
    sleep(Duration::from_secs(55)).await;
    assert!(messages(&brewery, "Hop Alert").is_empty());

    sleep(Duration::from_secs(10)).await;
    assert_eq!(messages(&brewery, "Hop Alert").len(), 1);

    executor.wait_done().await.unwrap();
    assert_eq!(messages(&brewery, "Hop Alert").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_lid_threshold_follows_fahrenheit_setting() {
    let brewery = brewery();
    brewery.set_sensor("wort", Some(200.0));
    let step = single_step(
        &brewery,
        r#"
name: "Test: Boil F"
settings:
  temp_unit: F
steps:
  - name: "Boil"
    type: boil
    timer: 60
    temp: 212
    sensor: "wort"
    lid_alert: true
"#,
    );
    let mut executor = StepExecutor::new(step);

    executor.start().await.unwrap();
    sleep(Duration::from_secs(10)).await;
    assert!(messages(&brewery, "Please remove lid!").is_empty());

    brewery.set_sensor("wort", Some(204.0));
    sleep(Duration::from_secs(3)).await;
    assert_eq!(messages(&brewery, "Please remove lid!").len(), 1);

    executor.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_stop_before_boiling_releases_kettle() {
    let brewery = brewery();
    let step = single_step(
        &brewery,
        r#"
name: "Test: Boil Stop"
steps:
  - name: "Boil"
    type: boil
    timer: 60
    temp: 99
    sensor: "wort"
    kettle: "kettle1"
    auto_mode: true
"#,
    );
    let mut executor = StepExecutor::new(step.clone());

    executor.start().await.unwrap();
    assert_eq!(brewery.target_temp("kettle1"), Some(99.0));
    assert_eq!(brewery.heater_on("kettle1"), Some(true));

    sleep(Duration::from_secs(20)).await;
    executor.stop().await.unwrap();
    assert_eq!(brewery.target_temp("kettle1"), Some(0.0));
    assert_eq!(brewery.heater_on("kettle1"), Some(false));
    assert!(!step.core().has_advanced());
    assert!(messages(&brewery, "Boil").is_empty());
}

const SIX_HOPS: &str = r#"
name: "Test: Six Hops"
steps:
  - name: "Boil"
    type: boil
    timer: 3
    temp: 99
    sensor: "wort"
    hops:
      - minutes: 2
        text: "Magnum"
      - minutes: 2
        text: "Perle"
      - minutes: 1
        text: "Cascade"
      - minutes: 1
        text: "Centennial"
      - minutes: 0
        text: "Citra"
      - minutes: 5
        text: "Mosaic"
"#;

#[tokio::test(start_paused = true)]
async fn test_six_hop_alerts_fire_once_each() {
    let brewery = brewery();
    brewery.set_sensor("wort", Some(100.0));
    let step = single_step(&brewery, SIX_HOPS);
    let mut executor = StepExecutor::new(step);

    executor.start().await.unwrap();

    // Longer than the boil: due as soon as the countdown runs
    sleep(Duration::from_secs(10)).await;
    assert_eq!(messages(&brewery, "Hop Alert"), vec!["Please add Mosaic (6)"]);

    // Two additions sharing the two-minute mark
    sleep(Duration::from_secs(60)).await;
    let alerts = messages(&brewery, "Hop Alert");
    assert_eq!(alerts.len(), 3);
    assert!(alerts.contains(&"Please add Magnum (1)".to_string()));
    assert!(alerts.contains(&"Please add Perle (2)".to_string()));

    sleep(Duration::from_secs(60)).await;
    assert_eq!(messages(&brewery, "Hop Alert").len(), 5);

    assert_eq!(executor.wait_done().await.unwrap(), ExecutionResult::Completed);

    let mut alerts = messages(&brewery, "Hop Alert");
    assert_eq!(alerts.len(), 6);
    assert_eq!(alerts.last().map(String::as_str), Some("Please add Citra (5)"));
    alerts.sort();
    alerts.dedup();
    assert_eq!(alerts.len(), 6, "no addition announced twice");

    // Nothing more after the hand-over
    sleep(Duration::from_secs(30)).await;
    assert_eq!(messages(&brewery, "Hop Alert").len(), 6);
}
