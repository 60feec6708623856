//! Push event envelope for the sync channel wire format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pulse_core::types::NotificationId;
use pulse_entity::Notification;
use pulse_store::StoreEvent;

/// An event pushed to (or polled by) a sync client.
///
/// Mutations carry the full notification where the client needs it for
/// replace-by-id merging, and only the identifier for removals. An
/// unrecognized discriminator deserializes to [`SyncEvent::Unknown`]
/// and is ignored by the reconciler — newer servers may speak a newer
/// vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    /// A notification was created.
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
    /// A notification's read state changed.
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
    /// Unrecognized discriminator; ignored.
    #[serde(other)]
    Unknown,
}

impl SyncEvent {
    /// The identifier of the affected notification, if known.
    pub fn notification_id(&self) -> Option<NotificationId> {
        match self {
            Self::Created { data, .. } | Self::Updated { data, .. } | Self::Read { data, .. } => {
                Some(data.id)
            }
            Self::Deleted { id, .. } | Self::Archived { id, .. } => Some(*id),
            Self::Unknown => None,
        }
    }

    /// The recipient, when the event carries the notification body.
    pub fn recipient(&self) -> Option<pulse_core::types::UserId> {
        match self {
            Self::Created { data, .. } | Self::Updated { data, .. } | Self::Read { data, .. } => {
                Some(data.recipient)
            }
            _ => None,
        }
    }
}

impl From<StoreEvent> for SyncEvent {
    fn from(event: StoreEvent) -> Self {
        match event {
            StoreEvent::Created { data, timestamp } => Self::Created { data, timestamp },
            StoreEvent::Updated { data, timestamp } => Self::Updated { data, timestamp },
            StoreEvent::Read { data, timestamp } => Self::Read { data, timestamp },
            StoreEvent::Deleted { id, timestamp } => Self::Deleted { id, timestamp },
            StoreEvent::Archived { id, timestamp } => Self::Archived { id, timestamp },
        }
    }
}
