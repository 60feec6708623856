//! Client sync channel configuration.

use serde::{Deserialize, Serialize};

/// Settings for the client-facing sync channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Base reconnect delay in milliseconds.
    ///
    /// The effective delay is `reconnect_delay_ms * attempt_number`
    /// (linear backoff).
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
    /// Maximum automatic reconnect attempts before degrading to
    /// polling only.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// Polling fallback interval in seconds, used only while the push
    /// connection is down.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            poll_interval_seconds: default_poll_interval(),
        }
    }
}

fn default_reconnect_delay() -> u64 {
    1_000
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_poll_interval() -> u64 {
    30
}
