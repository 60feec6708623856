//! Combinable notification filters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pulse_core::types::UserId;
use pulse_entity::{Channel, Notification, NotificationStatus, NotificationType, Priority};

/// A combinable filter over the notification collection.
///
/// Every predicate left unset matches all notifications; set predicates
/// are conjoined.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationFilter {
    /// Restrict to a single recipient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<UserId>,
    /// Match any of these statuses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statuses: Option<Vec<NotificationStatus>>,
    /// Match any of these types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kinds: Option<Vec<NotificationType>>,
    /// Match any of these priorities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priorities: Option<Vec<Priority>>,
    /// Match notifications targeting any of these channels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<Vec<Channel>>,
    /// Created at or after this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_after: Option<DateTime<Utc>>,
    /// Created strictly before this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_before: Option<DateTime<Utc>>,
    /// Case-insensitive free-text search over title, message, and source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Only unread notifications.
    #[serde(default)]
    pub unread_only: bool,
    /// Include expired notifications (excluded by default).
    #[serde(default)]
    pub include_expired: bool,
}

impl NotificationFilter {
    /// A filter scoped to one recipient.
    pub fn for_recipient(recipient: UserId) -> Self {
        Self {
            recipient: Some(recipient),
            ..Default::default()
        }
    }

    /// Restrict to the given statuses.
    pub fn with_statuses(mut self, statuses: Vec<NotificationStatus>) -> Self {
        self.statuses = Some(statuses);
        self
    }

    /// Restrict to the given types.
    pub fn with_kinds(mut self, kinds: Vec<NotificationType>) -> Self {
        self.kinds = Some(kinds);
        self
    }

    /// Restrict to unread notifications.
    pub fn unread(mut self) -> Self {
        self.unread_only = true;
        self
    }

    /// Restrict by free-text search.
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Whether the notification satisfies every set predicate at `now`.
    pub fn matches(&self, notification: &Notification, now: DateTime<Utc>) -> bool {
        if !self.include_expired && notification.is_expired_at(now) {
            return false;
        }
        if let Some(recipient) = self.recipient {
            if notification.recipient != recipient {
                return false;
            }
        }
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&notification.status) {
                return false;
            }
        }
        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&notification.kind) {
                return false;
            }
        }
        if let Some(priorities) = &self.priorities {
            if !priorities.contains(&notification.priority) {
                return false;
            }
        }
        if let Some(channels) = &self.channels {
            if !notification.channels.iter().any(|c| channels.contains(c)) {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if notification.created_at < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if notification.created_at >= before {
                return false;
            }
        }
        if self.unread_only && !notification.is_unread() {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_title = notification.title.to_lowercase().contains(&needle);
            let in_message = notification.message.to_lowercase().contains(&needle);
            let in_source = notification
                .source()
                .map(|s| s.to_lowercase().contains(&needle))
                .unwrap_or(false);
            if !(in_title || in_message || in_source) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::types::TenantId;

    fn sample() -> Notification {
        Notification::new(
            TenantId::new(),
            UserId::new(),
            NotificationType::Alert,
            "Disk almost full",
            "Volume /data is at 92%",
        )
        .with_priority(Priority::High)
        .with_channels(vec![Channel::Email, Channel::InApp])
    }

    #[test]
    fn test_empty_filter_matches() {
        let n = sample();
        assert!(NotificationFilter::default().matches(&n, Utc::now()));
    }

    #[test]
    fn test_status_and_kind_sets() {
        let n = sample();
        let f = NotificationFilter::default()
            .with_statuses(vec![NotificationStatus::Pending, NotificationStatus::Sent])
            .with_kinds(vec![NotificationType::Alert]);
        assert!(f.matches(&n, Utc::now()));

        let f = NotificationFilter::default().with_kinds(vec![NotificationType::Comment]);
        assert!(!f.matches(&n, Utc::now()));
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let n = sample();
        let f = NotificationFilter::default().with_search("DISK");
        assert!(f.matches(&n, Utc::now()));
        let f = NotificationFilter::default().with_search("volume /data");
        assert!(f.matches(&n, Utc::now()));
        let f = NotificationFilter::default().with_search("nothing here");
        assert!(!f.matches(&n, Utc::now()));
    }

    #[test]
    fn test_expired_excluded_by_default() {
        let now = Utc::now();
        let n = sample().with_expiry(now - chrono::Duration::hours(1));
        assert!(!NotificationFilter::default().matches(&n, now));
        let f = NotificationFilter {
            include_expired: true,
            ..Default::default()
        };
        assert!(f.matches(&n, now));
    }

    #[test]
    fn test_channel_overlap() {
        let n = sample();
        let f = NotificationFilter {
            channels: Some(vec![Channel::Email]),
            ..Default::default()
        };
        assert!(f.matches(&n, Utc::now()));
        let f = NotificationFilter {
            channels: Some(vec![Channel::Sms]),
            ..Default::default()
        };
        assert!(!f.matches(&n, Utc::now()));
    }
}
