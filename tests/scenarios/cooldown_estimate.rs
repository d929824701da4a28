//! Test: Cooldown chills the wort, publishes an estimate and hands over

use crate::helpers::*;
use brewsteps::core::config::CooldownConfig;
use brewsteps::hardware::memory::{BrewEvent, ThermalBinding};
use brewsteps::steps::CooldownStep;
use brewsteps::{BrewContext, BrewStep, ExecutionResult, StepExecutor};
use std::time::Duration;
use tokio::time::sleep;

fn chiller_binding() -> Vec<ThermalBinding> {
    vec![ThermalBinding {
        sensor: "wort".to_string(),
        kettle: None,
        cooler: Some("chiller".to_string()),
    }]
}

fn cooldown_config() -> CooldownConfig {
    CooldownConfig {
        temp: 25.0,
        sensor: Some("wort".to_string()),
        actor: Some("chiller".to_string()),
        kettle: None,
    }
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_runs_chiller_until_target() {
    let brewery = brewery();
    brewery.set_sensor("wort", Some(90.0));
    let physics = brewery.spawn_physics(chiller_binding(), AMBIENT);

    let step = CooldownStep::with_interval(
        "Chill",
        cooldown_config(),
        Duration::from_secs(60),
        BrewContext::from_brewery(brewery.clone()),
    );
    let mut executor = StepExecutor::new(step.clone());

    executor.start().await.unwrap();
    assert_eq!(messages(&brewery, "Chill"), vec!["Cool down to 25°"]);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(brewery.actor_state("chiller"), Some(true));
    assert!(step.core().summary().starts_with("Started: "));

    // Refit after a minute of samples
    sleep(Duration::from_secs(70)).await;
    assert!(step.core().summary().starts_with("ECT: "));
    let estimates = messages(&brewery, "Cooldown Step");
    assert!(!estimates.is_empty());
    assert!(estimates[0].starts_with("Current: "));
    assert!(estimates[0].contains("reaching 25° at"));

    assert_eq!(executor.wait_done().await.unwrap(), ExecutionResult::Completed);
    physics.abort();

    assert!(brewery.sensor("wort").unwrap() <= 25.0);
    assert_eq!(brewery.actor_state("chiller"), Some(false));
    assert_eq!(
        messages(&brewery, "CoolDown"),
        vec!["Wort cooled down. Please transfer to Fermenter."]
    );
    assert_eq!(brewery.count(|e| matches!(e, BrewEvent::ActorOff(a) if a == "chiller")), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_already_cold_finishes_quickly() {
    let brewery = brewery();
    brewery.set_sensor("wort", Some(18.0));
    let step = single_step(
        &brewery,
        r#"
name: "Test: Cold"
steps:
  - name: "Chill"
    type: cooldown
    temp: 25
    sensor: "wort"
    actor: "chiller"
"#,
    );
    let mut executor = StepExecutor::new(step);

    executor.start().await.unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), executor.wait_done()).await;
    assert_eq!(result.unwrap().unwrap(), ExecutionResult::Completed);
    assert_eq!(brewery.actor_state("chiller"), Some(false));
}

#[tokio::test(start_paused = true)]
async fn test_stop_switches_chiller_off() {
    let brewery = brewery();
    brewery.set_sensor("wort", Some(90.0));
    let step = CooldownStep::new("Chill", cooldown_config(), BrewContext::from_brewery(brewery.clone()));
    let mut executor = StepExecutor::new(step.clone());

    executor.start().await.unwrap();
    sleep(Duration::from_secs(30)).await;
    assert_eq!(brewery.actor_state("chiller"), Some(true));

    executor.stop().await.unwrap();
    assert_eq!(brewery.actor_state("chiller"), Some(false));
    assert!(!step.core().has_advanced());
    assert!(messages(&brewery, "CoolDown").is_empty());
}
