//! CLI output formatting

use crate::{
    core::{
        config::RecipeConfig,
        notification::{Notification, NotificationType},
        ExecutionStatus, StepState,
    },
    execution::ExecutionEvent,
};
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static BELL: Emoji<'_, '_> = Emoji("🔔 ", "* ");
pub static STOP: Emoji<'_, '_> = Emoji("⏹️  ", "# ");

/// Format a step state for display
pub fn format_step_state(state: StepState) -> String {
    match state {
        StepState::Idle => style("IDLE").dim().to_string(),
        StepState::Starting => style("STARTING").yellow().to_string(),
        StepState::Running => style("RUNNING").yellow().to_string(),
        StepState::Stopping => style("STOPPING").yellow().to_string(),
        StepState::Done => style("DONE").green().to_string(),
    }
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
        ExecutionStatus::Cancelled => style("CANCELLED").yellow().to_string(),
    }
}

/// Format a notification for the terminal
pub fn format_notification(notification: &Notification) -> String {
    let title = match notification.kind {
        NotificationType::Info => style(&notification.title).cyan(),
        NotificationType::Warning => style(&notification.title).yellow(),
        NotificationType::Success => style(&notification.title).green(),
        NotificationType::Error => style(&notification.title).red(),
    };
    let mut line = format!("{} {}: {}", BELL, title.bold(), notification.message);
    for action in &notification.actions {
        line.push_str(&format!(" [{}]", style(&action.label).underlined()));
    }
    line
}

/// One line per step of a validated recipe
pub fn format_recipe_steps(config: &RecipeConfig) -> Vec<String> {
    config
        .steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            format!(
                "  {}. {} {}",
                i + 1,
                style(&step.name).bold(),
                style(format!("({})", step.props.kind())).dim()
            )
        })
        .collect()
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::RecipeStarted {
            execution_id,
            recipe_name,
            total_steps,
        } => format!(
            "{} Starting recipe {} with {} steps ({})",
            ROCKET,
            style(recipe_name).bold(),
            total_steps,
            style(&execution_id.to_string()[..8]).dim()
        ),
        ExecutionEvent::StepStarted { index, name, kind } => format!(
            "{} [{}] {} {}",
            SPINNER,
            index + 1,
            style(name).cyan(),
            style(kind).dim()
        ),
        ExecutionEvent::StepCompleted { index, name } => {
            format!("{} [{}] {}", CHECK, index + 1, style(name).green())
        }
        ExecutionEvent::StepStopped { index, name } => {
            format!("{} [{}] {} stopped", STOP, index + 1, style(name).yellow())
        }
        ExecutionEvent::StepFailed { index, name, error } => format!(
            "{} [{}] {}: {}",
            CROSS,
            index + 1,
            style(name).red(),
            style(error).dim()
        ),
        ExecutionEvent::RecipeCompleted {
            execution_id,
            status,
        } => format!(
            "{} Recipe ({}) {}",
            INFO,
            style(&execution_id.to_string()[..8]).dim(),
            format_status(*status)
        ),
    }
}
