//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use pulse_core::config::delivery::DeliveryConfig;
use pulse_core::config::dispatcher::DispatcherConfig;
use pulse_core::config::store::StoreConfig;
use pulse_core::types::{NotificationId, TenantId, UserId};
use pulse_engine::{
    ChannelError, ChannelRegistry, ChannelSender, Dispatcher, MemoryPreferences, MemoryRules,
    PreferenceProvider, RuleProvider,
};
use pulse_entity::{Channel, Notification, NotificationMetadata, NotificationType};
use pulse_store::NotificationStore;

/// Channel sender that records every send and can be told to fail.
#[derive(Debug)]
pub struct RecordingSender {
    channel: Channel,
    /// Number of upcoming attempts to fail transiently.
    pub transient_failures: AtomicU32,
    /// Number of upcoming attempts to reject permanently.
    pub permanent_failures: AtomicU32,
    sent: Mutex<Vec<NotificationId>>,
}

impl RecordingSender {
    pub fn new(channel: Channel) -> Arc<Self> {
        Arc::new(Self {
            channel,
            transient_failures: AtomicU32::new(0),
            permanent_failures: AtomicU32::new(0),
            sent: Mutex::new(Vec::new()),
        })
    }

    /// Notification ids successfully sent, in order.
    pub fn sent(&self) -> Vec<NotificationId> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelSender for RecordingSender {
    fn channel(&self) -> Channel {
        self.channel
    }

    fn address(&self, notification: &Notification) -> Option<String> {
        Some(format!("{}@{}", notification.recipient, self.channel))
    }

    async fn send(&self, notification: &Notification, _address: &str) -> Result<(), ChannelError> {
        if self
            .permanent_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ChannelError::Permanent("invalid recipient".into()));
        }
        if self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ChannelError::Transient("gateway timeout".into()));
        }
        self.sent.lock().unwrap().push(notification.id);
        Ok(())
    }
}

/// A fully wired engine over in-memory providers and recording senders.
pub struct TestEngine {
    pub store: Arc<NotificationStore>,
    pub dispatcher: Arc<Dispatcher>,
    pub rules: Arc<MemoryRules>,
    pub preferences: Arc<MemoryPreferences>,
    pub in_app: Arc<RecordingSender>,
    pub email: Arc<RecordingSender>,
    pub tenant: TenantId,
    pub user: UserId,
}

impl TestEngine {
    pub fn new() -> Self {
        // Tests dispatch several same-source events back to back; the
        // dedup window would swallow all but the first.
        Self::with_config(DeliveryConfig {
            dedup_window_ms: 0,
            ..Default::default()
        })
    }

    pub fn with_config(delivery: DeliveryConfig) -> Self {
        let store = Arc::new(NotificationStore::new(StoreConfig::default()));
        let in_app = RecordingSender::new(Channel::InApp);
        let email = RecordingSender::new(Channel::Email);
        let mut registry = ChannelRegistry::new();
        registry.register(Arc::clone(&in_app) as Arc<dyn ChannelSender>);
        registry.register(Arc::clone(&email) as Arc<dyn ChannelSender>);
        let rules = Arc::new(MemoryRules::new());
        let preferences = Arc::new(MemoryPreferences::new());
        let dispatcher = Dispatcher::new(
            Arc::clone(&store),
            Arc::new(registry),
            Arc::clone(&rules) as Arc<dyn RuleProvider>,
            Arc::clone(&preferences) as Arc<dyn PreferenceProvider>,
            &delivery,
            &DispatcherConfig::default(),
        );
        Self {
            store,
            dispatcher,
            rules,
            preferences,
            in_app,
            email,
            tenant: TenantId::new(),
            user: UserId::new(),
        }
    }

    /// A draft info notification from the monitoring source.
    pub fn draft(&self, title: &str) -> Notification {
        Notification::new(self.tenant, self.user, NotificationType::Info, title, "body")
            .with_metadata(NotificationMetadata {
                source: Some("monitoring".to_string()),
                ..Default::default()
            })
    }
}

/// Poll until `check` returns true or a generous deadline passes.
///
/// Under `start_paused` runtimes the sleeps auto-advance, so waiting is
/// effectively instant.
pub async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}
