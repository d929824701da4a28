//! Test: Toggle switches its actor once and moves on

use crate::helpers::*;
use async_trait::async_trait;
use brewsteps::core::config::{ActorConfig, ToggleConfig, ToggleType};
use brewsteps::hardware::memory::BrewEvent;
use brewsteps::hardware::ActorControl;
use brewsteps::steps::{ActorStep, ToggleStep};
use brewsteps::{BrewContext, BrewStep, ExecutionResult, HardwareError, SimulatedBrewery, StepExecutor};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};

#[tokio::test(start_paused = true)]
async fn test_toggle_on_switches_once_and_leaves_actor_on() {
    let brewery = brewery();
    let step = single_step(
        &brewery,
        r#"
name: "Test: Toggle"
steps:
  - name: "Pump on"
    type: toggle
    toggle_type: "On"
    actor: "pump"
"#,
    );
    let mut executor = StepExecutor::new(step);

    let started = Instant::now();
    executor.start().await.unwrap();
    assert_eq!(brewery.actor_state("pump"), Some(true));

    assert_eq!(executor.wait_done().await.unwrap(), ExecutionResult::Completed);
    assert!(started.elapsed() <= Duration::from_secs(2));

    assert_eq!(brewery.count(|e| matches!(e, BrewEvent::ActorOn(a) if a == "pump")), 1);
    assert_eq!(brewery.count(|e| matches!(e, BrewEvent::ActorOff(_))), 0);
    assert_eq!(brewery.actor_state("pump"), Some(true));
}

#[tokio::test(start_paused = true)]
async fn test_toggle_defaults_to_off() {
    let brewery = brewery();
    let mut recipe = recipe_from_yaml(
        &brewery,
        r#"
name: "Test: Toggle Off"
steps:
  - name: "Pump on"
    type: toggle
    toggle_type: "On"
    actor: "pump"
  - name: "Pump off"
    type: toggle
    actor: "pump"
"#,
    );

    let engine = brewsteps::BrewEngine::new();
    engine.execute(&mut recipe).await.unwrap();

    assert_recipe_completed(&recipe);
    assert_eq!(brewery.actor_state("pump"), Some(false));
    let journal = brewery.journal();
    let on = first_position(&journal, |e| matches!(e, BrewEvent::ActorOn(_))).unwrap();
    let off = first_position(&journal, |e| matches!(e, BrewEvent::ActorOff(_))).unwrap();
    assert!(on < off);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_actor_does_not_block_recipe() {
    let brewery = brewery();
    let step = single_step(
        &brewery,
        r#"
name: "Test: Missing Actor"
steps:
  - name: "Agitator"
    type: toggle
    toggle_type: "On"
    actor: "agitator"
"#,
    );
    let mut executor = StepExecutor::new(step);

    executor.start().await.unwrap();
    assert_eq!(executor.wait_done().await.unwrap(), ExecutionResult::Completed);
    assert_eq!(brewery.actor_state("agitator"), None);
}

/// Relay that takes a while to answer
struct SlowRelay {
    brewery: Arc<SimulatedBrewery>,
    delay: Duration,
}

#[async_trait]
impl ActorControl for SlowRelay {
    async fn actor_on(&self, actor_id: &str) -> Result<(), HardwareError> {
        sleep(self.delay).await;
        self.brewery.actor_on(actor_id).await
    }

    async fn actor_off(&self, actor_id: &str) -> Result<(), HardwareError> {
        sleep(self.delay).await;
        self.brewery.actor_off(actor_id).await
    }
}

fn slow_context(brewery: &Arc<SimulatedBrewery>) -> BrewContext {
    let mut ctx = BrewContext::from_brewery(brewery.clone());
    ctx.actors = Arc::new(SlowRelay {
        brewery: brewery.clone(),
        delay: Duration::from_millis(1_500),
    });
    ctx
}

#[tokio::test(start_paused = true)]
async fn test_toggle_hands_over_behind_slow_relay() {
    let brewery = brewery();
    let step = ToggleStep::new(
        "Pump on",
        ToggleConfig {
            toggle_type: ToggleType::On,
            actor: Some("pump".to_string()),
        },
        slow_context(&brewery),
    );
    let mut executor = StepExecutor::new(step.clone());

    executor.start().await.unwrap();
    let result = timeout(Duration::from_secs(10), executor.wait_done()).await;
    assert_eq!(result.unwrap().unwrap(), ExecutionResult::Completed);
    assert!(step.core().has_advanced());
    assert_eq!(brewery.actor_state("pump"), Some(true));
}

#[tokio::test(start_paused = true)]
async fn test_zero_minute_actor_hands_over_behind_slow_relay() {
    let brewery = brewery();
    let step = ActorStep::new(
        "Stir",
        ActorConfig {
            timer: 0,
            actor: Some("stirrer".to_string()),
        },
        slow_context(&brewery),
    );
    let mut executor = StepExecutor::new(step.clone());

    executor.start().await.unwrap();
    let result = timeout(Duration::from_secs(10), executor.wait_done()).await;
    assert_eq!(result.unwrap().unwrap(), ExecutionResult::Completed);
    assert_eq!(brewery.actor_state("stirrer"), Some(false));
}
