//! Notification enumerations: type, priority, status, and channel.

use serde::{Deserialize, Serialize};

/// Category of a notification for filtering and preference matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// Informational message.
    Info,
    /// Success confirmation.
    Success,
    /// Warning condition.
    Warning,
    /// Error condition.
    Error,
    /// System-level notification.
    System,
    /// Task assignment or update.
    Task,
    /// The user was mentioned.
    Mention,
    /// A comment was posted.
    Comment,
    /// An approval is requested.
    Approval,
    /// A scheduled reminder.
    Reminder,
    /// An operational alert.
    Alert,
}

impl NotificationType {
    /// Return the type as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::System => "system",
            Self::Task => "task",
            Self::Mention => "mention",
            Self::Comment => "comment",
            Self::Approval => "approval",
            Self::Reminder => "reminder",
            Self::Alert => "alert",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Notification priority, totally ordered from `Low` to `Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Lowest priority.
    Low,
    /// Default priority.
    #[default]
    Medium,
    /// Elevated priority.
    High,
    /// Urgent — may override quiet hours when allowed.
    Urgent,
    /// Critical — may override quiet hours when allowed.
    Critical,
}

impl Priority {
    /// Return the priority as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a notification.
///
/// `pending → sent → delivered → read | archived`; any pre-terminal
/// state may move to `failed`. The only backward edge is
/// `read → sent` (mark-unread).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    /// Accepted but not yet dispatched.
    Pending,
    /// Dispatch started; at least one channel attempt is outstanding.
    Sent,
    /// Every targeted channel delivery completed successfully.
    Delivered,
    /// Read by the recipient (terminal, except mark-unread).
    Read,
    /// Archived by the recipient (terminal).
    Archived,
    /// Delivery failed or the notification was suppressed (terminal).
    Failed,
}

impl NotificationStatus {
    /// Whether this status admits no further forward transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Read | Self::Archived | Self::Failed)
    }

    /// Whether a transition from `self` to `to` is allowed.
    ///
    /// Forward movement along the lifecycle is permitted to skip stages
    /// (a recipient may read a notification while a slow channel is
    /// still confirming), and any pre-terminal status may fail.
    pub fn can_transition(&self, to: NotificationStatus) -> bool {
        use NotificationStatus::*;
        match (self, to) {
            (Pending, Sent | Delivered | Read | Archived | Failed) => true,
            (Sent, Delivered | Read | Archived | Failed) => true,
            (Delivered, Read | Archived | Failed) => true,
            // The explicit read/unread toggle.
            (Read, Sent) => true,
            (Read, Archived) => true,
            _ => false,
        }
    }

    /// Return the status as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
            Self::Archived => "archived",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A delivery medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// In-application notification center.
    InApp,
    /// Email delivery.
    Email,
    /// SMS delivery.
    Sms,
    /// Mobile/desktop push.
    Push,
    /// Chat integration (Slack, Teams, ...).
    Chat,
    /// Outbound webhook.
    Webhook,
}

impl Channel {
    /// Return the channel as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InApp => "in_app",
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Push => "push",
            Self::Chat => "chat",
            Self::Webhook => "webhook",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
