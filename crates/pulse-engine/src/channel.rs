//! Channel sender abstraction and registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing;

use pulse_entity::{Channel, Notification};

/// Error from a channel delivery attempt.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Transient failure (network, timeout) — may retry.
    #[error("Transient channel failure: {0}")]
    Transient(String),

    /// Permanent rejection (hard bounce, invalid recipient) — the
    /// delivery goes terminal `bounced` immediately.
    #[error("Permanent channel failure: {0}")]
    Permanent(String),
}

/// Trait for channel sender implementations.
///
/// A sender owns the wire specifics of one delivery medium (SMTP, SMS
/// gateway, push service, ...). The dispatcher treats it as a black
/// box: success, retryable failure, or permanent failure.
#[async_trait]
pub trait ChannelSender: Send + Sync + std::fmt::Debug {
    /// The channel this sender serves.
    fn channel(&self) -> Channel;

    /// Resolve the recipient address on this channel, if the user has
    /// one configured.
    fn address(&self, notification: &Notification) -> Option<String>;

    /// Attempt one delivery.
    async fn send(&self, notification: &Notification, address: &str) -> Result<(), ChannelError>;
}

/// Dispatches delivery attempts to the sender registered per channel.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    /// Registered senders by channel.
    senders: HashMap<Channel, Arc<dyn ChannelSender>>,
}

impl ChannelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            senders: HashMap::new(),
        }
    }

    /// Register a channel sender.
    pub fn register(&mut self, sender: Arc<dyn ChannelSender>) {
        let channel = sender.channel();
        tracing::info!("Registered channel sender for '{}'", channel);
        self.senders.insert(channel, sender);
    }

    /// Look up the sender for a channel.
    ///
    /// A missing sender is a configuration error: the affected channel
    /// is skipped, processing continues for everything else.
    pub fn sender(&self, channel: Channel) -> Option<Arc<dyn ChannelSender>> {
        self.senders.get(&channel).cloned()
    }

    /// Whether a sender is registered for a channel.
    pub fn has_sender(&self, channel: Channel) -> bool {
        self.senders.contains_key(&channel)
    }

    /// The list of registered channels.
    pub fn registered_channels(&self) -> Vec<Channel> {
        self.senders.keys().copied().collect()
    }
}
