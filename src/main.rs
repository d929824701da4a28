use anyhow::{Context, Result};
use brewsteps::cli::commands::{RunCommand, ValidateCommand};
use brewsteps::cli::output::*;
use brewsteps::cli::terminal_output::{TerminalNotifier, TerminalObserver};
use brewsteps::cli::{Cli, Command};
use brewsteps::core::config::RecipeConfig;
use brewsteps::{BrewContext, BrewEngine, EngineHandle, ExecutionStatus, SimulatedBrewery, StepAction};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Run(cmd) => run_recipe(cmd).await?,
        Command::Validate(cmd) => validate_recipe(cmd)?,
    }

    Ok(())
}

async fn run_recipe(cmd: &RunCommand) -> Result<()> {
    let config = RecipeConfig::from_file(&cmd.file).context("Failed to load recipe")?;
    println!("{} Loaded recipe: {}", INFO, style(&config.name).bold());

    // Register everything the recipe refers to
    let brewery = Arc::new(SimulatedBrewery::new());
    let refs = config.hardware();
    for actor in &refs.actors {
        brewery.add_actor(actor);
    }
    for kettle in &refs.kettles {
        brewery.add_kettle(kettle, kettle, Some(false));
    }
    for sensor in &refs.sensors {
        brewery.set_sensor(sensor, Some(cmd.ambient));
    }
    for (sensor, value) in &cmd.sensor {
        brewery.set_sensor(sensor, Some(*value));
    }
    let physics = cmd
        .simulate
        .then(|| brewery.spawn_physics(config.thermal_bindings(), cmd.ambient));

    let notifier = Arc::new(TerminalNotifier::forwarding_to(brewery.clone()));
    let mut ctx = BrewContext::from_brewery(brewery.clone());
    ctx.notifier = notifier.clone();
    ctx.observer = Arc::new(TerminalObserver::new());
    let mut recipe = config.to_recipe(ctx);

    let mut engine = BrewEngine::new();
    engine.add_event_handler(|event| println!("\n{}", format_execution_event(&event)));
    let handle = engine.handle();

    let stopper = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n{} Stopping...", WARN);
            stopper.stop();
        }
    });
    let input = tokio::spawn(read_operator_input(handle, notifier));

    println!(
        "{} Enter: next step, {}: start timer, {}: add 5 minutes, Ctrl-C: stop",
        INFO,
        style("t").bold(),
        style("+").bold()
    );
    let result = engine.execute(&mut recipe).await;

    input.abort();
    if let Some(physics) = physics {
        physics.abort();
    }

    match result {
        Ok(ExecutionStatus::Completed) => {
            println!(
                "\n{} {} completed {}",
                CHECK,
                style(&recipe.name).bold(),
                style("successfully").green()
            );
        }
        Ok(status) => {
            println!(
                "\n{} {} {} ({}/{} steps)",
                WARN,
                style(&recipe.name).bold(),
                format_status(status),
                recipe.state.completed_steps,
                recipe.state.total_steps
            );
        }
        Err(e) => {
            println!(
                "\n{} {} {}",
                CROSS,
                style(&recipe.name).bold(),
                style("failed").red()
            );
            error!("{}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Keyboard commands while a recipe runs
async fn read_operator_input(handle: EngineHandle, notifier: Arc<TerminalNotifier>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let action = match line.trim() {
            "" | "n" => {
                match notifier.take_pending() {
                    Some(next) => next.trigger().await,
                    None => println!("{} Nothing is waiting for Next Step", INFO),
                }
                continue;
            }
            "t" => StepAction::StartTimer,
            "+" => StepAction::AddFiveMinutes,
            other => {
                println!("{} Unknown command: {}", WARN, other);
                continue;
            }
        };
        if let Err(e) = handle.perform(action).await {
            println!("{} {}", WARN, style(e).yellow());
        }
    }
}

fn validate_recipe(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating recipe...", INFO);

    match RecipeConfig::from_file(&cmd.file) {
        Ok(config) => {
            println!("{} Recipe is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Steps: {}", style(config.steps.len()).cyan());
            for line in format_recipe_steps(&config) {
                println!("  {}", line);
            }

            let refs = config.hardware();
            println!(
                "  Hardware: {} sensors, {} actors, {} kettles",
                style(refs.sensors.len()).cyan(),
                style(refs.actors.len()).cyan(),
                style(refs.kettles.len()).cyan()
            );

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    }
}
