//! The sync client: push connection driver, reconnect state machine,
//! polling fallback, and optimistic mutations.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tracing;

use pulse_core::config::sync::SyncConfig;
use pulse_core::result::AppResult;
use pulse_core::types::{NotificationId, UserId};
use pulse_entity::Notification;
use pulse_store::NotificationFilter;

use crate::envelope::SyncEvent;
use crate::reconciler::LocalView;
use crate::state::ConnectionState;
use crate::transport::{FetchTransport, Mutation, PushTransport};

/// Keeps a local notification view eventually consistent with the
/// server under unreliable connectivity.
///
/// A single driver task owns every timer: the push read loop, the
/// linear-backoff reconnect schedule, and the polling fallback. All of
/// them die with the driver on [`SyncClient::shutdown`], so a disposed
/// client never leaks repeated fetches.
#[derive(Debug)]
pub struct SyncClient {
    inner: Arc<ClientInner>,
    shutdown_tx: watch::Sender<bool>,
    reconnect_tx: mpsc::Sender<()>,
    task: StdMutex<Option<JoinHandle<()>>>,
}

#[derive(Debug)]
struct ClientInner {
    user: UserId,
    config: SyncConfig,
    push: Arc<dyn PushTransport>,
    fetch: Arc<dyn FetchTransport>,
    filter: NotificationFilter,
    view: StdMutex<LocalView>,
    state_tx: watch::Sender<ConnectionState>,
}

impl SyncClient {
    /// Start the client and its driver task.
    pub fn start(
        user: UserId,
        config: SyncConfig,
        push: Arc<dyn PushTransport>,
        fetch: Arc<dyn FetchTransport>,
        filter: NotificationFilter,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (reconnect_tx, reconnect_rx) = mpsc::channel(1);
        let inner = Arc::new(ClientInner {
            user,
            config,
            push,
            fetch,
            filter,
            view: StdMutex::new(LocalView::new()),
            state_tx,
        });
        let driver = Arc::clone(&inner);
        let task = tokio::spawn(async move {
            driver.drive(shutdown_rx, reconnect_rx).await;
        });
        Self {
            inner,
            shutdown_tx,
            reconnect_tx,
            task: StdMutex::new(Some(task)),
        }
    }

    /// The current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    /// Watch connection state changes.
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// The local view, newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.inner.view().list()
    }

    /// Look up one notification in the local view.
    pub fn get(&self, id: NotificationId) -> Option<Notification> {
        self.inner.view().get(id).cloned()
    }

    /// Number of unread notifications in the local view.
    pub fn unread_count(&self) -> usize {
        self.inner.view().unread_count()
    }

    /// Mark a notification read (optimistic).
    pub async fn mark_read(&self, id: NotificationId) -> AppResult<()> {
        self.mutate(Mutation::MarkRead(id)).await
    }

    /// Mark a notification unread (optimistic).
    pub async fn mark_unread(&self, id: NotificationId) -> AppResult<()> {
        self.mutate(Mutation::MarkUnread(id)).await
    }

    /// Mark every notification read (optimistic).
    pub async fn mark_all_read(&self) -> AppResult<()> {
        self.mutate(Mutation::MarkAllRead).await
    }

    /// Archive a notification (optimistic).
    pub async fn archive(&self, id: NotificationId) -> AppResult<()> {
        self.mutate(Mutation::Archive(id)).await
    }

    /// Delete a notification (optimistic).
    pub async fn delete(&self, id: NotificationId) -> AppResult<()> {
        self.mutate(Mutation::Delete(id)).await
    }

    /// Restart the reconnect cycle after the attempt cap was reached.
    pub fn reconnect(&self) {
        let _ = self.reconnect_tx.try_send(());
    }

    /// Stop the driver and cancel every pending timer.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let task = self
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    /// Apply locally first, then confirm with the server; roll the view
    /// back if the server rejects the mutation.
    async fn mutate(&self, mutation: Mutation) -> AppResult<()> {
        let undo = {
            let mut view = self.inner.view();
            match mutation {
                Mutation::MarkRead(id) => view.mark_read_local(id),
                Mutation::MarkUnread(id) => view.mark_unread_local(id),
                Mutation::MarkAllRead => view.mark_all_read_local(),
                Mutation::Archive(id) | Mutation::Delete(id) => view.remove_local(id),
            }
        };
        match self.inner.fetch.mutate(self.inner.user, mutation).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(user = %self.inner.user, "Mutation rejected, rolling back: {e}");
                self.inner.view().revert(undo);
                Err(e)
            }
        }
    }
}

impl ClientInner {
    fn view(&self) -> std::sync::MutexGuard<'_, LocalView> {
        self.view.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: ConnectionState) {
        if *self.state_tx.borrow() != state {
            tracing::debug!(user = %self.user, %state, "Sync state changed");
            // send_replace stores the value even with no subscribers.
            self.state_tx.send_replace(state);
        }
    }

    /// Full filtered fetch replacing the local view.
    async fn poll(&self) {
        match self.fetch.fetch(self.user, &self.filter).await {
            Ok(items) => {
                tracing::debug!(user = %self.user, count = items.len(), "Poll snapshot applied");
                self.view().replace_all(items);
            }
            Err(e) => {
                // Connectivity problems degrade silently; the next poll
                // or reconnect catches up.
                tracing::warn!(user = %self.user, "Poll failed: {e}");
            }
        }
    }

    async fn drive(
        self: Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
        mut reconnect: mpsc::Receiver<()>,
    ) {
        let poll_interval = Duration::from_secs(self.config.poll_interval_seconds.max(1));
        let mut attempt: u32 = 0;
        loop {
            self.set_state(ConnectionState::Connecting);
            match self.push.connect(self.user).await {
                Ok(mut events) => {
                    attempt = 0;
                    self.set_state(ConnectionState::Connected);
                    tracing::info!(user = %self.user, "Push connection established");
                    // Catch-up snapshot: anything that happened before
                    // the subscription (or during a gap) lands here;
                    // replayed push events merge idempotently on top.
                    self.poll().await;
                    loop {
                        tokio::select! {
                            changed = shutdown.changed() => {
                                if changed.is_err() || *shutdown.borrow() {
                                    self.set_state(ConnectionState::Disconnected);
                                    return;
                                }
                            }
                            event = events.recv() => match event {
                                Some(event) => self.apply(event),
                                None => break,
                            }
                        }
                    }
                    tracing::warn!(user = %self.user, "Push connection closed");
                }
                Err(e) => {
                    tracing::warn!(user = %self.user, "Push connect failed: {e}");
                }
            }
            self.set_state(ConnectionState::Disconnected);
            attempt += 1;

            if attempt > self.config.max_reconnect_attempts {
                tracing::warn!(
                    user = %self.user,
                    attempts = self.config.max_reconnect_attempts,
                    "Reconnect attempts exhausted; polling until manual reconnect"
                );
                let mut poll = time::interval(poll_interval);
                poll.tick().await;
                loop {
                    tokio::select! {
                        changed = shutdown.changed() => {
                            if changed.is_err() || *shutdown.borrow() {
                                return;
                            }
                        }
                        trigger = reconnect.recv() => match trigger {
                            Some(()) => {
                                tracing::info!(user = %self.user, "Manual reconnect requested");
                                attempt = 0;
                                break;
                            }
                            None => return,
                        },
                        _ = poll.tick() => self.poll().await,
                    }
                }
                continue;
            }

            // Linear backoff; the polling fallback stays active while
            // the connection is down.
            let delay = Duration::from_millis(self.config.reconnect_delay_ms * attempt as u64);
            tracing::info!(user = %self.user, attempt, ?delay, "Reconnect scheduled");
            let deadline = time::Instant::now() + delay;
            let mut poll = time::interval(poll_interval);
            poll.tick().await;
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            return;
                        }
                    }
                    trigger = reconnect.recv() => match trigger {
                        Some(()) => {
                            attempt = 0;
                            break;
                        }
                        None => return,
                    },
                    _ = time::sleep_until(deadline) => break,
                    _ = poll.tick() => self.poll().await,
                }
            }
        }
    }

    fn apply(&self, event: SyncEvent) {
        if matches!(event, SyncEvent::Unknown) {
            tracing::debug!(user = %self.user, "Ignoring unknown sync event type");
            return;
        }
        self.view().apply(event);
    }
}
