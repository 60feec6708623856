//! Dispatcher run loop configuration.

use serde::{Deserialize, Serialize};

/// Settings for the dispatcher tick loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Whether the dispatcher loop is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of concurrent channel delivery tasks.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Interval in seconds between dispatcher ticks.
    ///
    /// A tick re-evaluates quiet-hours deferrals and resumes due retries.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_seconds: u64,
    /// Seconds to wait for in-flight deliveries during shutdown.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            concurrency: default_concurrency(),
            tick_interval_seconds: default_tick_interval(),
            shutdown_grace_seconds: default_shutdown_grace(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    8
}

fn default_tick_interval() -> u64 {
    5
}

fn default_shutdown_grace() -> u64 {
    30
}
