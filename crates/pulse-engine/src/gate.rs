//! Quiet-hours gating of delivery attempts.

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Timelike, Utc};

use pulse_entity::{Preference, Priority, QuietHours};

/// Whether a delivery may proceed now or must wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Deliver immediately.
    Allow,
    /// Queue and re-evaluate at the end of the quiet window or on the
    /// next dispatcher tick, whichever comes first.
    Defer,
}

/// Consulted by the dispatcher before each delivery attempt.
///
/// Quiet hours restrict only the configured weekdays; on other days
/// delivery is allowed. This is the source-literal behavior — flip the
/// weekday check here if product ever wants the inverse.
#[derive(Debug, Default)]
pub struct QuietHoursGate;

impl QuietHoursGate {
    /// Decide whether a notification of the given priority may be
    /// delivered at `now` under the user's preference.
    pub fn check(&self, preference: &Preference, priority: Priority, now: DateTime<Utc>) -> GateDecision {
        let quiet = &preference.quiet_hours;
        if !quiet.enabled {
            return GateDecision::Allow;
        }
        if !quiet.applies_on(now.weekday()) {
            return GateDecision::Allow;
        }
        let time = time_of_day(now);
        if !quiet.contains(time) {
            return GateDecision::Allow;
        }
        if quiet.overrides(priority) {
            return GateDecision::Allow;
        }
        GateDecision::Defer
    }

    /// The instant the current quiet window ends, for scheduling a
    /// deferred wake. Returns `now` when the window is not active.
    pub fn window_end(&self, quiet: &QuietHours, now: DateTime<Utc>) -> DateTime<Utc> {
        if !quiet.enabled || !quiet.contains(time_of_day(now)) {
            return now;
        }
        let today_end = Utc
            .with_ymd_and_hms(
                now.year(),
                now.month(),
                now.day(),
                quiet.end.hour(),
                quiet.end.minute(),
                quiet.end.second(),
            )
            .single()
            .unwrap_or(now);
        if today_end > now {
            today_end
        } else {
            today_end + Duration::days(1)
        }
    }
}

fn time_of_day(now: DateTime<Utc>) -> NaiveTime {
    NaiveTime::from_hms_opt(now.hour(), now.minute(), now.second()).unwrap_or(NaiveTime::MIN)
}
