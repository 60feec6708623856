//! Derived notification statistics.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};

use pulse_entity::{Channel, Notification, NotificationStatus, NotificationType, Priority};

/// A statistics snapshot over the notification collection.
///
/// Recomputed in full on every store mutation; the working set is a
/// bounded recent window, not unbounded history, so a full pass is
/// cheap enough.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationStats {
    /// Total notifications (archived included; deleted are gone).
    pub total: u64,
    /// Notifications not yet read or archived.
    pub unread: u64,
    /// Counts by notification type.
    pub by_type: HashMap<NotificationType, u64>,
    /// Counts by priority.
    pub by_priority: HashMap<Priority, u64>,
    /// Counts by lifecycle status.
    pub by_status: HashMap<NotificationStatus, u64>,
    /// Counts by targeted channel.
    pub by_channel: HashMap<Channel, u64>,
    /// Created today (observer's current UTC day).
    pub today: u64,
    /// Created within the last 7 days.
    pub this_week: u64,
    /// Created within the current calendar month.
    pub this_month: u64,
    /// When this snapshot was computed.
    pub computed_at: DateTime<Utc>,
}

impl NotificationStats {
    /// Compute a snapshot over the given notifications at `now`.
    pub fn compute<'a, I>(notifications: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a Notification>,
    {
        let mut stats = Self {
            computed_at: now,
            ..Default::default()
        };
        let today = now.date_naive();
        let week_ago = now - Duration::days(7);

        for n in notifications {
            stats.total += 1;
            if n.is_unread() {
                stats.unread += 1;
            }
            *stats.by_type.entry(n.kind).or_insert(0) += 1;
            *stats.by_priority.entry(n.priority).or_insert(0) += 1;
            *stats.by_status.entry(n.status).or_insert(0) += 1;
            for channel in &n.channels {
                *stats.by_channel.entry(*channel).or_insert(0) += 1;
            }

            let created = n.created_at;
            if created.date_naive() == today {
                stats.today += 1;
            }
            if created >= week_ago {
                stats.this_week += 1;
            }
            if created.year() == now.year() && created.month() == now.month() {
                stats.this_month += 1;
            }
        }

        stats
    }
}
