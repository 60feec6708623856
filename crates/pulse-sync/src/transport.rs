//! Transport seams between a sync client and the server.
//!
//! Real deployments put a network protocol behind these traits; the
//! in-process [`StoreTransport`] wires a client straight to a
//! [`NotificationStore`] for single-node use and tests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use tracing;

use pulse_core::result::AppResult;
use pulse_core::types::{NotificationId, UserId};
use pulse_entity::Notification;
use pulse_store::{NotificationFilter, NotificationStore};

use crate::envelope::SyncEvent;

/// A client-issued mutation against the server store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Mark one notification read.
    MarkRead(NotificationId),
    /// Mark one notification unread.
    MarkUnread(NotificationId),
    /// Mark every notification of the user read.
    MarkAllRead,
    /// Archive one notification.
    Archive(NotificationId),
    /// Delete one notification.
    Delete(NotificationId),
}

/// Opens the persistent push connection.
#[async_trait]
pub trait PushTransport: Send + Sync + std::fmt::Debug {
    /// Subscribe to the user's event feed. The returned receiver yields
    /// events until the connection closes; dropping it tears the
    /// subscription down.
    async fn connect(&self, user: UserId) -> AppResult<mpsc::Receiver<SyncEvent>>;
}

/// Request/response path: full fetches for the polling fallback and
/// client mutations.
#[async_trait]
pub trait FetchTransport: Send + Sync + std::fmt::Debug {
    /// Full filtered fetch of the user's notifications.
    async fn fetch(&self, user: UserId, filter: &NotificationFilter) -> AppResult<Vec<Notification>>;

    /// Apply one mutation on the server.
    async fn mutate(&self, user: UserId, mutation: Mutation) -> AppResult<()>;
}

/// In-process transport bridging a client to the local store.
#[derive(Debug)]
pub struct StoreTransport {
    store: Arc<NotificationStore>,
    buffer: usize,
}

impl StoreTransport {
    /// Create a transport over the given store.
    pub fn new(store: Arc<NotificationStore>) -> Self {
        Self { store, buffer: 64 }
    }
}

#[async_trait]
impl PushTransport for StoreTransport {
    async fn connect(&self, user: UserId) -> AppResult<mpsc::Receiver<SyncEvent>> {
        let mut events = self.store.subscribe();
        let (tx, rx) = mpsc::channel(self.buffer);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let event = SyncEvent::from(event);
                        // Removal events carry no recipient; forward
                        // them and let the reconciler no-op when the id
                        // is not in this user's view.
                        if event.recipient().is_some_and(|r| r != user) {
                            continue;
                        }
                        if tx.send(event).await.is_err() {
                            return;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(%user, skipped, "Push subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        });
        Ok(rx)
    }
}

#[async_trait]
impl FetchTransport for StoreTransport {
    async fn fetch(
        &self,
        user: UserId,
        filter: &NotificationFilter,
    ) -> AppResult<Vec<Notification>> {
        let mut filter = filter.clone();
        filter.recipient = Some(user);
        Ok(self.store.list(&filter))
    }

    async fn mutate(&self, user: UserId, mutation: Mutation) -> AppResult<()> {
        match mutation {
            Mutation::MarkRead(id) => self.store.mark_read(&[id]),
            Mutation::MarkUnread(id) => self.store.mark_unread(&[id]),
            Mutation::MarkAllRead => self.store.mark_all_read(user),
            Mutation::Archive(id) => self.store.archive(&[id]),
            Mutation::Delete(id) => self.store.delete(&[id]),
        }
    }
}
