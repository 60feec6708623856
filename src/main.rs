//! Pulse server — notification delivery and synchronization engine.
//!
//! Entry point that wires the store, delivery engine, and sync layer
//! together and runs until a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use pulse_core::config::AppConfig;
use pulse_core::error::AppError;
use pulse_engine::{
    ChannelError, ChannelRegistry, ChannelSender, Dispatcher, DispatcherRunner, MemoryPreferences,
    MemoryRules, PreferenceProvider, RuleProvider,
};
use pulse_entity::{Channel, Notification};
use pulse_store::NotificationStore;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("PULSE_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// In-app delivery: the notification is already in the store, which is
/// what in-app clients read via the sync channel, so the send itself
/// always succeeds.
#[derive(Debug)]
struct InAppSender;

#[async_trait]
impl ChannelSender for InAppSender {
    fn channel(&self) -> Channel {
        Channel::InApp
    }

    fn address(&self, notification: &Notification) -> Option<String> {
        Some(notification.recipient.to_string())
    }

    async fn send(&self, notification: &Notification, address: &str) -> Result<(), ChannelError> {
        tracing::debug!(id = %notification.id, address, "In-app delivery");
        Ok(())
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Pulse v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Notification store ───────────────────────────────
    let store = Arc::new(NotificationStore::new(config.store.clone()));
    tracing::info!("Notification store initialized");

    // ── Step 2: Channel senders ──────────────────────────────────
    let mut registry = ChannelRegistry::new();
    registry.register(Arc::new(InAppSender));
    let registry = Arc::new(registry);

    // ── Step 3: Rule and preference providers ────────────────────
    let rules = Arc::new(MemoryRules::new());
    let preferences = Arc::new(MemoryPreferences::new());

    // ── Step 4: Dispatcher ───────────────────────────────────────
    let dispatcher = Dispatcher::new(
        Arc::clone(&store),
        registry,
        Arc::clone(&rules) as Arc<dyn RuleProvider>,
        Arc::clone(&preferences) as Arc<dyn PreferenceProvider>,
        &config.delivery,
        &config.dispatcher,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Step 5: Dispatcher run loop ──────────────────────────────
    let runner_handle = if config.dispatcher.enabled {
        let runner = DispatcherRunner::new(Arc::clone(&dispatcher), config.dispatcher.clone());
        let cancel = shutdown_rx.clone();
        let handle = tokio::spawn(async move {
            runner.run(cancel).await;
        });
        tracing::info!("Dispatcher runner started");
        Some(handle)
    } else {
        tracing::info!("Dispatcher runner disabled");
        None
    };

    // ── Step 6: Expiry cleanup loop ──────────────────────────────
    let cleanup_handle = {
        let store = Arc::clone(&store);
        let mut cancel = shutdown_rx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(3600));
            interval.tick().await;
            loop {
                tokio::select! {
                    changed = cancel.changed() => {
                        if changed.is_err() || *cancel.borrow() {
                            return;
                        }
                    }
                    _ = interval.tick() => {
                        let purged = store.purge_expired(chrono::Utc::now());
                        if purged > 0 {
                            tracing::info!(purged, "Purged expired notifications");
                        }
                    }
                }
            }
        })
    };

    tracing::info!("Pulse server running");

    // ── Step 7: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
    let _ = shutdown_tx.send(true);

    let grace = Duration::from_secs(config.dispatcher.shutdown_grace_seconds);
    if let Some(handle) = runner_handle {
        let _ = tokio::time::timeout(grace, handle).await;
    }
    let _ = tokio::time::timeout(Duration::from_secs(5), cleanup_handle).await;

    tracing::info!("Pulse server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
