//! Dispatcher runner — periodic tick loop driving deferred wakes and
//! retry resumption.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;
use tracing;

use pulse_core::config::dispatcher::DispatcherConfig;

use crate::dispatcher::Dispatcher;

/// Runs the dispatcher tick loop until cancelled.
///
/// The tick re-evaluates quiet-hours deferrals against current
/// preferences and resumes any delivery whose retry became due while no
/// attempt loop was watching it (e.g. after a restart).
#[derive(Debug)]
pub struct DispatcherRunner {
    /// The shared dispatcher.
    dispatcher: Arc<Dispatcher>,
    /// Dispatcher configuration.
    config: DispatcherConfig,
}

impl DispatcherRunner {
    /// Create a new runner.
    pub fn new(dispatcher: Arc<Dispatcher>, config: DispatcherConfig) -> Self {
        Self { dispatcher, config }
    }

    /// Start the tick loop — runs until the cancel signal is received.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        tracing::info!(
            "Dispatcher runner started with concurrency={}, tick_interval={}s",
            self.config.concurrency,
            self.config.tick_interval_seconds
        );

        let tick_interval = Duration::from_secs(self.config.tick_interval_seconds);

        loop {
            tokio::select! {
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        tracing::info!("Dispatcher runner received shutdown signal");
                        break;
                    }
                }
                _ = self.dispatcher.tick() => {
                    tokio::select! {
                        _ = cancel.changed() => {
                            if *cancel.borrow() {
                                tracing::info!("Dispatcher runner shutting down");
                                break;
                            }
                        }
                        _ = time::sleep(tick_interval) => {}
                    }
                }
            }
        }

        tracing::info!("Dispatcher runner waiting for in-flight deliveries to complete...");

        let semaphore = self.dispatcher.semaphore();
        let max_permits = self.config.concurrency as u32;
        let _ = time::timeout(
            Duration::from_secs(self.config.shutdown_grace_seconds),
            semaphore.acquire_many(max_permits),
        )
        .await;

        tracing::info!("Dispatcher runner shut down complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pulse_core::config::delivery::DeliveryConfig;
    use pulse_core::config::store::StoreConfig;

    use pulse_store::NotificationStore;

    use crate::channel::ChannelRegistry;
    use crate::providers::{
        MemoryPreferences, MemoryRules, PreferenceProvider, RuleProvider,
    };

    #[tokio::test]
    async fn test_runner_stops_on_cancel() {
        let store = Arc::new(NotificationStore::new(StoreConfig::default()));
        let dispatcher = Dispatcher::new(
            store,
            Arc::new(ChannelRegistry::new()),
            Arc::new(MemoryRules::new()) as Arc<dyn RuleProvider>,
            Arc::new(MemoryPreferences::new()) as Arc<dyn PreferenceProvider>,
            &DeliveryConfig::default(),
            &DispatcherConfig::default(),
        );
        let config = DispatcherConfig {
            shutdown_grace_seconds: 1,
            ..Default::default()
        };
        let runner = DispatcherRunner::new(dispatcher, config);

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { runner.run(rx).await });

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("runner did not stop")
            .unwrap();
    }
}
