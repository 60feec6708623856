//! Channel delivery and retry configuration.

use serde::{Deserialize, Serialize};

/// Default retry policy applied to channel deliveries.
///
/// Individual channels may carry their own overrides via the
/// channel-config provider; these values are the fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Maximum delivery attempts per channel before the record goes
    /// terminal `failed`.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    /// Multiplier applied to the delay after each failed attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Upper bound on the computed retry delay, in milliseconds.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    /// Deduplication window for rapid duplicate events, in milliseconds.
    #[serde(default = "default_dedup_window")]
    pub dedup_window_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            max_delay_ms: default_max_delay(),
            dedup_window_ms: default_dedup_window(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> u64 {
    1_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_delay() -> u64 {
    60_000
}

fn default_dedup_window() -> u64 {
    500
}
