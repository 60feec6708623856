//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod delivery;
pub mod dispatcher;
pub mod logging;
pub mod store;
pub mod sync;

use serde::{Deserialize, Serialize};

use self::delivery::DeliveryConfig;
use self::dispatcher::DispatcherConfig;
use self::logging::LoggingConfig;
use self::store::StoreConfig;
use self::sync::SyncConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Per-channel delivery and retry settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// Dispatcher run loop settings.
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    /// Client sync channel settings.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Notification store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `PULSE__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("PULSE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            delivery: DeliveryConfig::default(),
            dispatcher: DispatcherConfig::default(),
            sync: SyncConfig::default(),
            store: StoreConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
