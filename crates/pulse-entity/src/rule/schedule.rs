//! Rule activation schedules.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// A half-open `[start, end)` time-of-day range.
///
/// A range whose end precedes its start wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Inclusive start of the range.
    pub start: NaiveTime,
    /// Exclusive end of the range.
    pub end: NaiveTime,
}

impl TimeRange {
    /// Whether `time` falls within the range, handling midnight wrap.
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            time >= self.start && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }
}

/// When a rule is active.
///
/// An empty weekday set means every day; an empty time-range list means
/// all day.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSchedule {
    /// First day the rule is active (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// Last day the rule is active (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Active weekdays.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weekdays: Vec<Weekday>,
    /// Active time-of-day ranges.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_ranges: Vec<TimeRange>,
}

impl RuleSchedule {
    /// Whether the schedule is active at the given moment.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        let date = now.date_naive();
        if let Some(start) = self.start_date {
            if date < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if date > end {
                return false;
            }
        }
        if !self.weekdays.is_empty() && !self.weekdays.contains(&now.weekday()) {
            return false;
        }
        if !self.time_ranges.is_empty() {
            let time = NaiveTime::from_hms_opt(now.hour(), now.minute(), now.second())
                .unwrap_or(NaiveTime::MIN);
            if !self.time_ranges.iter().any(|r| r.contains(time)) {
                return false;
            }
        }
        true
    }
}
