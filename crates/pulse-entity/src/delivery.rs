//! Channel delivery records and retry policy.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pulse_core::config::delivery::DeliveryConfig;
use pulse_core::types::{DeliveryId, NotificationId};

use crate::notification::Channel;

/// Status of a single channel delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Created, no attempt made yet.
    Pending,
    /// An attempt failed; a retry is scheduled.
    Sent,
    /// The channel confirmed delivery (terminal).
    Delivered,
    /// All attempts exhausted (terminal).
    Failed,
    /// The channel reported a permanent rejection (terminal).
    Bounced,
}

impl DeliveryStatus {
    /// Whether this status admits no further attempts.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Failed | Self::Bounced)
    }

    /// Return the status as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::Bounced => "bounced",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Exponential backoff policy for channel retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum attempts before the delivery goes terminal `failed`.
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Multiplier applied per failed attempt.
    pub backoff_multiplier: f64,
    /// Upper bound on the computed delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// Delay to wait after the `attempts`-th failed attempt
    /// (`attempts` is 1-based): `min(max, initial * multiplier^(attempts-1))`.
    pub fn delay_after(&self, attempts: u32) -> Duration {
        let exp = attempts.saturating_sub(1);
        let delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exp as i32);
        Duration::from_millis(delay.min(self.max_delay_ms as f64) as u64)
    }
}

impl From<&DeliveryConfig> for RetryPolicy {
    fn from(config: &DeliveryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_delay_ms: config.initial_delay_ms,
            backoff_multiplier: config.backoff_multiplier,
            max_delay_ms: config.max_delay_ms,
        }
    }
}

/// One channel-specific delivery record, child of exactly one
/// notification.
///
/// Invariant: `attempts <= max_attempts`, and once the status is
/// terminal no further attempt may increment `attempts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    /// Unique delivery identifier.
    pub id: DeliveryId,
    /// Parent notification.
    pub notification_id: NotificationId,
    /// Target channel.
    pub channel: Channel,
    /// Delivery status.
    pub status: DeliveryStatus,
    /// Recipient address on this channel.
    pub address: String,
    /// Number of attempts made so far.
    pub attempts: u32,
    /// Maximum permitted attempts.
    pub max_attempts: u32,
    /// When the most recent attempt was made.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// Earliest time for the next attempt, when a retry is scheduled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_attempt_at: Option<DateTime<Utc>>,
    /// When the channel confirmed delivery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    /// Last error message, if any attempt failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Delivery {
    /// Create a new pending delivery record.
    pub fn new(
        notification_id: NotificationId,
        channel: Channel,
        address: impl Into<String>,
        max_attempts: u32,
    ) -> Self {
        Self {
            id: DeliveryId::new(),
            notification_id,
            channel,
            status: DeliveryStatus::Pending,
            address: address.into(),
            attempts: 0,
            max_attempts,
            last_attempt_at: None,
            next_attempt_at: None,
            delivered_at: None,
            error: None,
        }
    }

    /// Whether the delivery may still be attempted.
    pub fn is_retryable(&self) -> bool {
        !self.status.is_terminal() && self.attempts < self.max_attempts
    }

    /// Whether a scheduled retry is due at `now`.
    pub fn is_due_at(&self, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        match self.next_attempt_at {
            Some(next) => next <= now,
            None => self.status == DeliveryStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_delay_ms: 1_000,
            backoff_multiplier: 2.0,
            max_delay_ms: 60_000,
        }
    }

    #[test]
    fn test_backoff_progression() {
        let p = policy();
        assert_eq!(p.delay_after(1), Duration::from_millis(1_000));
        assert_eq!(p.delay_after(2), Duration::from_millis(2_000));
        assert_eq!(p.delay_after(3), Duration::from_millis(4_000));
    }

    #[test]
    fn test_backoff_is_capped() {
        let p = RetryPolicy {
            max_delay_ms: 3_000,
            ..policy()
        };
        assert_eq!(p.delay_after(10), Duration::from_millis(3_000));
    }

    #[test]
    fn test_terminal_not_retryable() {
        let mut d = Delivery::new(NotificationId::new(), Channel::Email, "a@b.c", 3);
        assert!(d.is_retryable());
        d.status = DeliveryStatus::Bounced;
        assert!(!d.is_retryable());
        assert!(!d.is_due_at(Utc::now()));
    }

    #[test]
    fn test_exhausted_attempts_not_retryable() {
        let mut d = Delivery::new(NotificationId::new(), Channel::Sms, "+1555", 2);
        d.attempts = 2;
        d.status = DeliveryStatus::Sent;
        assert!(!d.is_retryable());
    }
}
