//! Test: Stopping an Actor step switches the actor off before the final update

use crate::helpers::*;
use brewsteps::hardware::memory::BrewEvent;
use brewsteps::{StepExecutor, StepState};
use std::time::Duration;
use tokio::time::sleep;

const STIR: &str = r#"
name: "Test: Actor"
steps:
  - name: "Stir"
    type: actor
    timer: 5
    actor: "stirrer"
"#;

#[tokio::test(start_paused = true)]
async fn test_stop_switches_off_then_publishes_final_update() {
    let brewery = brewery();
    let step = single_step(&brewery, STIR);
    let mut executor = StepExecutor::new(step.clone());

    executor.start().await.unwrap();
    sleep(Duration::from_millis(10_500)).await;
    assert_eq!(brewery.actor_state("stirrer"), Some(true));

    executor.stop().await.unwrap();
    assert_eq!(brewery.actor_state("stirrer"), Some(false));
    assert_eq!(step.core().state(), StepState::Idle);
    assert_eq!(step.core().summary(), "");

    let journal = brewery.journal();
    let off = last_position(&journal, |e| matches!(e, BrewEvent::ActorOff(a) if a == "stirrer")).unwrap();
    let cleared = last_position(&journal, |e| {
        matches!(e, BrewEvent::Update(s) if s.name == "Stir" && s.summary.is_empty())
    })
    .unwrap();
    assert!(off < cleared, "actor must be off before the final update");
    assert_eq!(brewery.count(|e| matches!(e, BrewEvent::ActorOff(_))), 1);
}

#[tokio::test(start_paused = true)]
async fn test_no_ticks_after_stop() {
    let brewery = brewery();
    let step = single_step(&brewery, STIR);
    let mut executor = StepExecutor::new(step.clone());

    executor.start().await.unwrap();
    sleep(Duration::from_millis(3_500)).await;
    executor.stop().await.unwrap();

    let journal_len = brewery.journal().len();
    sleep(Duration::from_secs(600)).await;
    assert_eq!(brewery.journal().len(), journal_len);
    assert!(!step.core().has_advanced());
    assert_eq!(brewery.actor_state("stirrer"), Some(false));
}
