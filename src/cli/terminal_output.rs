//! Terminal front end for a running recipe
//!
//! [`TerminalNotifier`] prints notifications and remembers the latest
//! "Next Step" button so the operator can press it from the keyboard.
//! [`TerminalObserver`] keeps a single status line with the active step's
//! summary.

use crate::cli::output::{format_notification, format_step_state, style};
use crate::core::notification::{Notification, NotificationAction};
use crate::core::state::StepSnapshot;
use crate::hardware::{Notifier, StepObserver};
use crate::steps::NEXT_STEP_LABEL;
use async_trait::async_trait;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// Prints notifications and forwards them to another notifier
pub struct TerminalNotifier {
    inner: Option<Arc<dyn Notifier>>,
    pending: Mutex<Option<NotificationAction>>,
}

impl TerminalNotifier {
    pub fn new() -> Self {
        Self {
            inner: None,
            pending: Mutex::new(None),
        }
    }

    /// Also deliver every notification to `inner`
    pub fn forwarding_to(inner: Arc<dyn Notifier>) -> Self {
        Self {
            inner: Some(inner),
            pending: Mutex::new(None),
        }
    }

    /// Take the most recent unanswered "Next Step" button
    pub fn take_pending(&self) -> Option<NotificationAction> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl Default for TerminalNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: Notification) {
        println!("\n{}", format_notification(&notification));
        if let Some(action) = notification.action(NEXT_STEP_LABEL) {
            println!("  {}", style("Press Enter to move on").dim());
            *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(action.clone());
        }
        if let Some(inner) = &self.inner {
            inner.notify(notification);
        }
    }
}

/// Rewrites one terminal line with the latest step summary
#[derive(Debug, Default)]
pub struct TerminalObserver {
    last: Mutex<Option<StepSnapshot>>,
}

impl TerminalObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status line for a snapshot, `None` if nothing changed
    fn status_line(&self, snapshot: StepSnapshot) -> Option<String> {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if last.as_ref() == Some(&snapshot) {
            return None;
        }
        let state = format_step_state(snapshot.state);
        let line = if snapshot.summary.is_empty() {
            format!("  {} {}", style(&snapshot.name).dim(), state)
        } else {
            format!(
                "  {} {} {}",
                style(&snapshot.name).dim(),
                state,
                style(&snapshot.summary).cyan()
            )
        };
        *last = Some(snapshot);
        Some(line)
    }
}

#[async_trait]
impl StepObserver for TerminalObserver {
    async fn push_update(&self, snapshot: StepSnapshot) {
        if let Some(line) = self.status_line(snapshot) {
            print!("\r\x1b[2K{}", line);
            let _ = io::stdout().flush();
        }
    }
}
