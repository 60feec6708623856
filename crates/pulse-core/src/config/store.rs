//! Notification store configuration.

use serde::{Deserialize, Serialize};

/// Settings for the notification store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum stored notifications per recipient.
    #[serde(default = "default_max_stored")]
    pub max_stored_per_user: u64,
    /// Number of days after which read/archived notifications are
    /// eligible for cleanup.
    #[serde(default = "default_cleanup_days")]
    pub cleanup_after_days: u32,
    /// Buffer size of the store event broadcast channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_stored_per_user: default_max_stored(),
            cleanup_after_days: default_cleanup_days(),
            event_buffer_size: default_event_buffer(),
        }
    }
}

fn default_max_stored() -> u64 {
    1_000
}

fn default_cleanup_days() -> u32 {
    30
}

fn default_event_buffer() -> usize {
    256
}
