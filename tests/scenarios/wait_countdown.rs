//! Test: Wait step counts its timer down and hands over exactly once

use crate::helpers::*;
use brewsteps::{ExecutionResult, StepExecutor};
use std::time::Duration;
use tokio::time::{sleep, Instant};

const ONE_MINUTE: &str = r#"
name: "Test: Wait"
steps:
  - name: "Rest"
    type: wait
    timer: 1
"#;

#[tokio::test(start_paused = true)]
async fn test_wait_finishes_after_its_minute() {
    let brewery = brewery();
    let step = single_step(&brewery, ONE_MINUTE);
    let mut executor = StepExecutor::new(step.clone());

    let started = Instant::now();
    executor.start().await.unwrap();
    assert_eq!(step.core().summary(), "01:00");

    sleep(Duration::from_millis(59_500)).await;
    assert!(!step.core().has_advanced(), "must not hand over early");

    let result = executor.wait_done().await.unwrap();
    assert_eq!(result, ExecutionResult::Completed);

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(60));
    assert!(elapsed <= Duration::from_secs(61));
    assert_eq!(step.core().summary(), "");
}

#[tokio::test(start_paused = true)]
async fn test_wait_publishes_countdown() {
    let brewery = brewery();
    let step = single_step(&brewery, ONE_MINUTE);
    let mut executor = StepExecutor::new(step);

    executor.start().await.unwrap();
    executor.wait_done().await.unwrap();

    let summaries: Vec<String> = brewery
        .updates()
        .into_iter()
        .filter(|s| s.name == "Rest")
        .map(|s| s.summary)
        .collect();
    assert!(summaries.contains(&"00:30".to_string()));
    assert!(summaries.contains(&"00:01".to_string()));
    assert_eq!(summaries.last().map(String::as_str), Some(""));
}

#[tokio::test(start_paused = true)]
async fn test_stopped_wait_can_restart_from_scratch() {
    let brewery = brewery();
    let step = single_step(&brewery, ONE_MINUTE);
    let mut executor = StepExecutor::new(step.clone());

    executor.start().await.unwrap();
    sleep(Duration::from_millis(20_500)).await;
    executor.stop().await.unwrap();
    assert!(!step.core().has_advanced());

    step.reset().await.unwrap();
    let restarted = Instant::now();
    executor.start().await.unwrap();
    assert_eq!(step.core().summary(), "01:00");

    executor.wait_done().await.unwrap();
    assert!(restarted.elapsed() >= Duration::from_secs(60));
}
