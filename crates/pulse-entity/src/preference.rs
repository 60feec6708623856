//! Per-user notification preferences.

use std::collections::HashMap;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use pulse_core::types::UserId;

use crate::notification::{Channel, NotificationType, Priority};

/// Digest cadence as an alternative to immediate delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestCadence {
    /// Deliver each notification as it arrives.
    #[default]
    Immediate,
    /// Batch into an hourly digest.
    Hourly,
    /// Batch into a daily digest.
    Daily,
    /// Batch into a weekly digest.
    Weekly,
}

/// A do-not-disturb window.
///
/// The window restricts only the configured weekdays; on other days
/// delivery proceeds normally. Within the window, only priorities the
/// override flags admit are delivered immediately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuietHours {
    /// Whether quiet hours are active at all.
    #[serde(default)]
    pub enabled: bool,
    /// Inclusive window start (local time of day).
    pub start: NaiveTime,
    /// Exclusive window end; an end before the start wraps past midnight.
    pub end: NaiveTime,
    /// Weekdays on which the window applies. Empty means every day.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weekdays: Vec<Weekday>,
    /// Deliver `urgent` notifications despite the window.
    #[serde(default)]
    pub allow_urgent: bool,
    /// Deliver `critical` notifications despite the window.
    #[serde(default)]
    pub allow_critical: bool,
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            enabled: false,
            start: NaiveTime::from_hms_opt(22, 0, 0).expect("valid time"),
            end: NaiveTime::from_hms_opt(8, 0, 0).expect("valid time"),
            weekdays: Vec::new(),
            allow_urgent: true,
            allow_critical: true,
        }
    }
}

impl QuietHours {
    /// Whether the window applies on the given weekday.
    pub fn applies_on(&self, weekday: Weekday) -> bool {
        self.weekdays.is_empty() || self.weekdays.contains(&weekday)
    }

    /// Whether `time` falls within the window, handling midnight wrap.
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            time >= self.start && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }

    /// Whether the given priority overrides the window.
    pub fn overrides(&self, priority: Priority) -> bool {
        match priority {
            Priority::Urgent => self.allow_urgent,
            Priority::Critical => self.allow_critical,
            _ => false,
        }
    }
}

/// Preference settings for a single notification type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypePreference {
    /// Whether notifications of this type are delivered at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Channel override: when set, replaces the notification's routed
    /// channels for this type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<Vec<Channel>>,
    /// Minimum priority required for delivery of this type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_priority: Option<Priority>,
}

impl Default for TypePreference {
    fn default() -> Self {
        Self {
            enabled: true,
            channels: None,
            min_priority: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Per-user delivery policy consumed by the gate and dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preference {
    /// The user these preferences belong to.
    pub user_id: UserId,
    /// Master switch; disabling suppresses all delivery.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Per-channel enablement. Channels absent from the map are enabled.
    #[serde(default)]
    pub channels: HashMap<Channel, bool>,
    /// Per-type policy. Types absent from the map use defaults.
    #[serde(default)]
    pub types: HashMap<NotificationType, TypePreference>,
    /// Do-not-disturb window.
    #[serde(default)]
    pub quiet_hours: QuietHours,
    /// Digest cadence.
    #[serde(default)]
    pub digest: DigestCadence,
}

impl Preference {
    /// Create default preferences for a user.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            enabled: true,
            channels: HashMap::new(),
            types: HashMap::new(),
            quiet_hours: QuietHours::default(),
            digest: DigestCadence::Immediate,
        }
    }

    /// Whether the given channel is enabled.
    pub fn channel_enabled(&self, channel: Channel) -> bool {
        self.enabled && *self.channels.get(&channel).unwrap_or(&true)
    }

    /// Whether the given type passes its enablement and minimum-priority
    /// policy at the given priority.
    pub fn type_allows(&self, kind: NotificationType, priority: Priority) -> bool {
        if !self.enabled {
            return false;
        }
        match self.types.get(&kind) {
            Some(pref) => {
                pref.enabled && pref.min_priority.map(|min| priority >= min).unwrap_or(true)
            }
            None => true,
        }
    }

    /// Resolve the effective channel set for a notification: the routed
    /// channels (or the type's channel override), filtered by
    /// per-channel enablement.
    pub fn resolve_channels(
        &self,
        kind: NotificationType,
        priority: Priority,
        routed: &[Channel],
    ) -> Vec<Channel> {
        if !self.type_allows(kind, priority) {
            return Vec::new();
        }
        let base: Vec<Channel> = match self.types.get(&kind).and_then(|p| p.channels.as_ref()) {
            Some(override_set) => override_set
                .iter()
                .copied()
                .filter(|c| routed.contains(c))
                .collect(),
            None => routed.to_vec(),
        };
        base.into_iter()
            .filter(|c| self.channel_enabled(*c))
            .collect()
    }
}
