//! Display grouping of notifications.

use serde::{Deserialize, Serialize};

use pulse_entity::Notification;

/// How to group notifications for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    /// No grouping; a single flat group.
    #[default]
    None,
    /// Group by notification type.
    Type,
    /// Group by source system.
    Source,
    /// Group by calendar date of creation.
    Date,
    /// Group by priority.
    Priority,
}

/// One display group of notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationGroup {
    /// Group key (type name, source, date, or priority).
    pub key: String,
    /// Members, newest-first.
    pub items: Vec<Notification>,
}

/// Group notifications for display.
///
/// Groups are ordered by their most-recently-updated member descending;
/// within a group, members are sorted newest-first by creation time.
pub fn group_notifications(
    mut notifications: Vec<Notification>,
    by: GroupBy,
) -> Vec<NotificationGroup> {
    notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    if by == GroupBy::None {
        return vec![NotificationGroup {
            key: "all".to_string(),
            items: notifications,
        }];
    }

    // Insertion order preserves newest-first within each group.
    let mut groups: Vec<NotificationGroup> = Vec::new();
    for notification in notifications {
        let key = group_key(&notification, by);
        match groups.iter_mut().find(|g| g.key == key) {
            Some(group) => group.items.push(notification),
            None => groups.push(NotificationGroup {
                key,
                items: vec![notification],
            }),
        }
    }

    groups.sort_by(|a, b| {
        let a_latest = a.items.iter().map(|n| n.updated_at()).max();
        let b_latest = b.items.iter().map(|n| n.updated_at()).max();
        b_latest.cmp(&a_latest)
    });

    groups
}

fn group_key(notification: &Notification, by: GroupBy) -> String {
    match by {
        GroupBy::None => "all".to_string(),
        GroupBy::Type => notification.kind.to_string(),
        GroupBy::Source => notification
            .source()
            .unwrap_or("unknown")
            .to_string(),
        GroupBy::Date => notification.created_at.date_naive().to_string(),
        GroupBy::Priority => notification.priority.to_string(),
    }
}
