//! Idempotent reconciliation of push/poll events into the local view.
//!
//! Push and polling are two producers feeding one merge function; both
//! paths land here so the merge rules live in exactly one place.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use tracing;

use pulse_core::types::NotificationId;
use pulse_entity::{Notification, NotificationStatus};

use crate::envelope::SyncEvent;

/// The client-side view of the notification store.
///
/// Merging is idempotent and tolerates out-of-order arrival: a `read`
/// for an id may land before its `created` and the final state is the
/// same either way. Removal events leave a tombstone so that a late
/// `created`/`updated` for a deleted id cannot resurrect it; tombstones
/// are cleared by a full poll snapshot, which is authoritative.
#[derive(Debug, Default)]
pub struct LocalView {
    items: HashMap<NotificationId, Notification>,
    tombstones: HashSet<NotificationId>,
}

/// Saved state for rolling back an optimistic mutation.
#[derive(Debug, Default)]
pub struct ViewUndo {
    saved: Vec<Notification>,
    tombstoned: Vec<NotificationId>,
}

impl LocalView {
    /// Create an empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one sync event.
    pub fn apply(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::Created { data, .. } => {
                if self.tombstones.contains(&data.id) {
                    tracing::trace!(id = %data.id, "Created for tombstoned id ignored");
                    return;
                }
                // Duplicate delivery across reconnect + poll: first
                // write wins, the replay is a no-op.
                self.items.entry(data.id).or_insert(*data);
            }
            SyncEvent::Updated { data, .. } | SyncEvent::Read { data, .. } => {
                if self.tombstones.contains(&data.id) {
                    tracing::trace!(id = %data.id, "Update for tombstoned id ignored");
                    return;
                }
                // Replace-by-id; inserting when absent makes a read
                // that outran its created converge to the same state.
                self.items.insert(data.id, *data);
            }
            SyncEvent::Deleted { id, .. } | SyncEvent::Archived { id, .. } => {
                self.items.remove(&id);
                self.tombstones.insert(id);
            }
            SyncEvent::Unknown => {}
        }
    }

    /// Replace the whole view with a full poll snapshot.
    pub fn replace_all(&mut self, items: Vec<Notification>) {
        self.tombstones.clear();
        self.items = items.into_iter().map(|n| (n.id, n)).collect();
    }

    /// Look up a notification.
    pub fn get(&self, id: NotificationId) -> Option<&Notification> {
        self.items.get(&id)
    }

    /// All notifications, newest first.
    pub fn list(&self) -> Vec<Notification> {
        let mut items: Vec<Notification> = self.items.values().cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }

    /// Number of notifications in the view.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the view is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of unread notifications.
    pub fn unread_count(&self) -> usize {
        self.items.values().filter(|n| n.is_unread()).count()
    }

    // ---- optimistic mutations ----

    /// Optimistically mark a notification read.
    pub fn mark_read_local(&mut self, id: NotificationId) -> ViewUndo {
        let mut undo = ViewUndo::default();
        if let Some(item) = self.items.get_mut(&id) {
            if item.status != NotificationStatus::Read {
                undo.saved.push(item.clone());
                item.status = NotificationStatus::Read;
                item.read_at = Some(Utc::now());
            }
        }
        undo
    }

    /// Optimistically mark a notification unread.
    pub fn mark_unread_local(&mut self, id: NotificationId) -> ViewUndo {
        let mut undo = ViewUndo::default();
        if let Some(item) = self.items.get_mut(&id) {
            if item.status == NotificationStatus::Read {
                undo.saved.push(item.clone());
                item.status = NotificationStatus::Sent;
                item.read_at = None;
            }
        }
        undo
    }

    /// Optimistically mark everything read.
    pub fn mark_all_read_local(&mut self) -> ViewUndo {
        let mut undo = ViewUndo::default();
        let now = Utc::now();
        for item in self.items.values_mut() {
            if item.is_unread() {
                undo.saved.push(item.clone());
                item.status = NotificationStatus::Read;
                item.read_at = Some(now);
            }
        }
        undo
    }

    /// Optimistically remove a notification (delete or archive).
    pub fn remove_local(&mut self, id: NotificationId) -> ViewUndo {
        let mut undo = ViewUndo::default();
        if let Some(item) = self.items.remove(&id) {
            undo.saved.push(item);
        }
        if self.tombstones.insert(id) {
            undo.tombstoned.push(id);
        }
        undo
    }

    /// Roll back an optimistic mutation the server rejected.
    pub fn revert(&mut self, undo: ViewUndo) {
        for id in undo.tombstoned {
            self.tombstones.remove(&id);
        }
        for item in undo.saved {
            self.items.insert(item.id, item);
        }
    }
}
