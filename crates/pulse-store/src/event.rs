//! Store mutation events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pulse_core::types::NotificationId;
use pulse_entity::Notification;

/// A mutation event emitted by the store.
///
/// Carries the full notification where a client needs it for
/// replace-by-id merging, and only the identifier for removals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    /// A notification was inserted.
    Created {
        /// The new notification.
        data: Box<Notification>,
        /// When the mutation happened.
        timestamp: DateTime<Utc>,
    },
    /// A notification's content or status changed.
    Updated {
        /// The updated notification.
        data: Box<Notification>,
        /// When the mutation happened.
        timestamp: DateTime<Utc>,
    },
    /// A notification was marked read or unread.
    Read {
        /// The updated notification.
        data: Box<Notification>,
        /// When the mutation happened.
        timestamp: DateTime<Utc>,
    },
    /// A notification was deleted.
    Deleted {
        /// The removed identifier.
        id: NotificationId,
        /// When the mutation happened.
        timestamp: DateTime<Utc>,
    },
    /// A notification was archived.
    Archived {
        /// The archived identifier.
        id: NotificationId,
        /// When the mutation happened.
        timestamp: DateTime<Utc>,
    },
}

impl StoreEvent {
    /// The identifier of the affected notification.
    pub fn notification_id(&self) -> NotificationId {
        match self {
            Self::Created { data, .. } | Self::Updated { data, .. } | Self::Read { data, .. } => {
                data.id
            }
            Self::Deleted { id, .. } | Self::Archived { id, .. } => *id,
        }
    }
}
