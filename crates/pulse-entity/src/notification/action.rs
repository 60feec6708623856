//! Inline actions attached to a notification.

use serde::{Deserialize, Serialize};

/// What an inline action does when the recipient triggers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Navigate to a URL carried in the action config.
    OpenUrl,
    /// Invoke a named callback on the source system.
    Callback,
    /// Dismiss the notification.
    Dismiss,
}

/// An action button attached to a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationAction {
    /// Stable identifier, unique within the parent notification.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Effect kind.
    pub kind: ActionKind,
    /// Kind-specific configuration (URL, callback name, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
    /// Whether the client must confirm before executing.
    #[serde(default)]
    pub requires_confirm: bool,
}

impl NotificationAction {
    /// Create a new action with the given identifier and label.
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            config: None,
            requires_confirm: false,
        }
    }

    /// Attach kind-specific configuration.
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = Some(config);
        self
    }

    /// Require confirmation before execution.
    pub fn with_confirm(mut self) -> Self {
        self.requires_confirm = true;
        self
    }
}
