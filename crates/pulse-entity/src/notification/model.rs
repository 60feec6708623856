//! Notification entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pulse_core::types::{NotificationId, TenantId, UserId};

use super::action::NotificationAction;
use super::types::{Channel, NotificationStatus, NotificationType, Priority};

/// Source metadata attached to a notification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationMetadata {
    /// Originating system (e.g. `"ci"`, `"billing"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Identifier of the related entity in the source system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_entity: Option<String>,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// A notification to be delivered to a user.
///
/// Invariant: `read_at` is set if and only if `status` is `Read`, and
/// `archived_at` is set if and only if `status` is `Archived`. The
/// store enforces this on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Unique notification identifier.
    pub id: NotificationId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// The recipient user.
    pub recipient: UserId,
    /// Notification type.
    pub kind: NotificationType,
    /// Priority level.
    pub priority: Priority,
    /// Lifecycle status.
    pub status: NotificationStatus,
    /// Notification title.
    pub title: String,
    /// Notification body text.
    pub message: String,
    /// Target delivery channels (non-empty once routed).
    pub channels: Vec<Channel>,
    /// Inline actions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<NotificationAction>,
    /// Source metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<NotificationMetadata>,
    /// When the notification was created.
    pub created_at: DateTime<Utc>,
    /// When the notification was read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    /// When the notification was archived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
    /// When the notification expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Why the notification entered `Failed` status (e.g. `"suppressed"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl Notification {
    /// Create a new pending notification.
    pub fn new(
        tenant_id: TenantId,
        recipient: UserId,
        kind: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            tenant_id,
            recipient,
            kind,
            priority: Priority::default(),
            status: NotificationStatus::Pending,
            title: title.into(),
            message: message.into(),
            channels: Vec::new(),
            actions: Vec::new(),
            metadata: None,
            created_at: Utc::now(),
            read_at: None,
            archived_at: None,
            expires_at: None,
            failure_reason: None,
        }
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the target channels.
    pub fn with_channels(mut self, channels: Vec<Channel>) -> Self {
        self.channels = channels;
        self
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: NotificationMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Attach inline actions.
    pub fn with_actions(mut self, actions: Vec<NotificationAction>) -> Self {
        self.actions = actions;
        self
    }

    /// Set the expiry timestamp.
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Check if the notification is unread.
    pub fn is_unread(&self) -> bool {
        !matches!(
            self.status,
            NotificationStatus::Read | NotificationStatus::Archived
        )
    }

    /// Check if the notification has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| exp <= now).unwrap_or(false)
    }

    /// The source system, when metadata carries one.
    pub fn source(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.source.as_deref())
    }

    /// Look up an inline action by identifier.
    pub fn action(&self, action_id: &str) -> Option<&NotificationAction> {
        self.actions.iter().find(|a| a.id == action_id)
    }

    /// The timestamp of the most recent lifecycle change.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.archived_at
            .or(self.read_at)
            .unwrap_or(self.created_at)
    }
}
