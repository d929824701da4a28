//! User-facing notifications

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Info,
    Warning,
    Success,
    Error,
}

/// Callback attached to a notification button
#[async_trait]
pub trait ActionCallback: Send + Sync {
    async fn invoke(&self);
}

/// A labelled button shown with a notification
#[derive(Clone)]
pub struct NotificationAction {
    pub label: String,
    pub callback: Arc<dyn ActionCallback>,
}

impl NotificationAction {
    pub fn new(label: impl Into<String>, callback: Arc<dyn ActionCallback>) -> Self {
        Self {
            label: label.into(),
            callback,
        }
    }

    /// Run the button's callback (what a UI does when it is clicked)
    pub async fn trigger(&self) {
        self.callback.invoke().await;
    }
}

impl fmt::Debug for NotificationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationAction")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// A message for the brewer
#[derive(Debug, Clone)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub kind: NotificationType,
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>, kind: NotificationType) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind,
            actions: Vec::new(),
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, NotificationType::Info)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, NotificationType::Warning)
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, NotificationType::Success)
    }

    /// Attach a button
    pub fn with_action(mut self, action: NotificationAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Find an attached button by label
    pub fn action(&self, label: &str) -> Option<&NotificationAction> {
        self.actions.iter().find(|a| a.label == label)
    }
}
