//! In-memory notification store.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing;

use pulse_core::config::store::StoreConfig;
use pulse_core::error::AppError;
use pulse_core::result::AppResult;
use pulse_core::types::{DeliveryId, NotificationId, UserId};
use pulse_entity::notification::NotificationAction;
use pulse_entity::{Delivery, Notification, NotificationStatus};

use crate::event::StoreEvent;
use crate::filter::NotificationFilter;
use crate::group::{group_notifications, GroupBy, NotificationGroup};
use crate::stats::NotificationStats;

/// The authoritative collection of notifications and delivery records.
///
/// Mutations enforce the status lifecycle, keep the `read_at`/
/// `archived_at` invariants, emit a [`StoreEvent`] per change, and
/// recompute the statistics snapshot. Batch mutations validate every
/// identifier before touching anything, so a rejected call leaves the
/// store unmodified.
#[derive(Debug)]
pub struct NotificationStore {
    /// Notifications keyed by identifier.
    notifications: DashMap<NotificationId, Notification>,
    /// Delivery records keyed by identifier.
    deliveries: DashMap<DeliveryId, Delivery>,
    /// Delivery index per parent notification.
    delivery_index: DashMap<NotificationId, Vec<DeliveryId>>,
    /// Mutation event fan-out.
    events: broadcast::Sender<StoreEvent>,
    /// Cached statistics snapshot, recomputed on every mutation.
    stats: Mutex<NotificationStats>,
    /// Store limits.
    config: StoreConfig,
}

impl NotificationStore {
    /// Create an empty store.
    pub fn new(config: StoreConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer_size.max(1));
        Self {
            notifications: DashMap::new(),
            deliveries: DashMap::new(),
            delivery_index: DashMap::new(),
            events,
            stats: Mutex::new(NotificationStats::default()),
            config,
        }
    }

    /// Subscribe to store mutation events.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    // ---- notification mutations ----

    /// Insert a new notification.
    ///
    /// Rejects duplicates and notifications violating the timestamp
    /// invariants; evicts the recipient's oldest notifications beyond
    /// the configured cap.
    pub fn insert(&self, notification: Notification) -> AppResult<()> {
        validate_invariants(&notification)?;
        if self.notifications.contains_key(&notification.id) {
            return Err(AppError::conflict(format!(
                "Notification {} already exists",
                notification.id
            )));
        }

        let recipient = notification.recipient;
        let event = StoreEvent::Created {
            data: Box::new(notification.clone()),
            timestamp: Utc::now(),
        };
        self.notifications.insert(notification.id, notification);
        self.emit(event);
        self.evict_over_cap(recipient);
        self.recompute_stats();
        Ok(())
    }

    /// Fetch a notification by identifier.
    pub fn get(&self, id: NotificationId) -> Option<Notification> {
        self.notifications.get(&id).map(|n| n.clone())
    }

    /// List notifications matching the filter, newest first.
    pub fn list(&self, filter: &NotificationFilter) -> Vec<Notification> {
        let now = Utc::now();
        let mut result: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|entry| filter.matches(entry.value(), now))
            .map(|entry| entry.value().clone())
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        result
    }

    /// List notifications matching the filter, grouped for display.
    pub fn grouped(&self, filter: &NotificationFilter, by: GroupBy) -> Vec<NotificationGroup> {
        group_notifications(self.list(filter), by)
    }

    /// Mark the given notifications as read.
    ///
    /// Already-read and archived-free no-ops are skipped; an unknown
    /// identifier or an illegal transition rejects the whole batch.
    pub fn mark_read(&self, ids: &[NotificationId]) -> AppResult<()> {
        self.transition_batch(ids, NotificationStatus::Read, |n| {
            n.status == NotificationStatus::Read
        })
    }

    /// Mark the given notifications as unread (`read → sent`).
    pub fn mark_unread(&self, ids: &[NotificationId]) -> AppResult<()> {
        // Only read notifications move; everything else unread already.
        for id in ids {
            let entry = self
                .notifications
                .get(id)
                .ok_or_else(|| AppError::not_found(format!("Notification {id} not found")))?;
            if entry.status == NotificationStatus::Archived {
                return Err(AppError::conflict(format!(
                    "Notification {id} is archived and cannot be marked unread"
                )));
            }
        }
        for id in ids {
            let mut changed = None;
            if let Some(mut entry) = self.notifications.get_mut(id) {
                if entry.status == NotificationStatus::Read {
                    entry.status = NotificationStatus::Sent;
                    entry.read_at = None;
                    changed = Some(entry.clone());
                }
            }
            if let Some(n) = changed {
                self.emit(StoreEvent::Read {
                    data: Box::new(n),
                    timestamp: Utc::now(),
                });
            }
        }
        self.recompute_stats();
        Ok(())
    }

    /// Mark every unread notification of the recipient as read.
    pub fn mark_all_read(&self, recipient: UserId) -> AppResult<()> {
        let ids: Vec<NotificationId> = self
            .notifications
            .iter()
            .filter(|e| e.recipient == recipient && e.is_unread())
            .map(|e| e.id)
            .collect();
        self.mark_read(&ids)
    }

    /// Archive the given notifications.
    pub fn archive(&self, ids: &[NotificationId]) -> AppResult<()> {
        self.transition_batch(ids, NotificationStatus::Archived, |n| {
            n.status == NotificationStatus::Archived
        })
    }

    /// Delete the given notifications and their delivery records.
    pub fn delete(&self, ids: &[NotificationId]) -> AppResult<()> {
        for id in ids {
            if !self.notifications.contains_key(id) {
                return Err(AppError::not_found(format!("Notification {id} not found")));
            }
        }
        for id in ids {
            self.remove_internal(*id);
        }
        self.recompute_stats();
        Ok(())
    }

    /// Validate and resolve an inline action, marking the parent
    /// notification read.
    ///
    /// The effect itself (URL open, source-system callback) is executed
    /// by the caller; the store owns only the lifecycle consequence.
    pub fn execute_action(
        &self,
        id: NotificationId,
        action_id: &str,
    ) -> AppResult<NotificationAction> {
        let action = {
            let entry = self
                .notifications
                .get(&id)
                .ok_or_else(|| AppError::not_found(format!("Notification {id} not found")))?;
            entry
                .action(action_id)
                .cloned()
                .ok_or_else(|| {
                    AppError::validation(format!(
                        "Notification {id} has no action '{action_id}'"
                    ))
                })?
        };
        if self
            .get(id)
            .map(|n| n.status != NotificationStatus::Read)
            .unwrap_or(false)
        {
            self.mark_read(&[id])?;
        }
        Ok(action)
    }

    /// Apply a single lifecycle transition, enforcing the status
    /// machine and timestamp invariants.
    pub fn update_status(
        &self,
        id: NotificationId,
        to: NotificationStatus,
    ) -> AppResult<Notification> {
        let now = Utc::now();
        let updated = {
            let mut entry = self
                .notifications
                .get_mut(&id)
                .ok_or_else(|| AppError::not_found(format!("Notification {id} not found")))?;
            if !entry.status.can_transition(to) {
                return Err(AppError::conflict(format!(
                    "Illegal status transition {} -> {} for notification {id}",
                    entry.status, to
                )));
            }
            apply_status(&mut entry, to, now);
            entry.clone()
        };
        self.emit(status_event(&updated, now));
        self.recompute_stats();
        Ok(updated)
    }

    /// Mark a notification failed with a reason.
    pub fn mark_failed(&self, id: NotificationId, reason: impl Into<String>) -> AppResult<()> {
        let now = Utc::now();
        let updated = {
            let mut entry = self
                .notifications
                .get_mut(&id)
                .ok_or_else(|| AppError::not_found(format!("Notification {id} not found")))?;
            if !entry.status.can_transition(NotificationStatus::Failed) {
                return Err(AppError::conflict(format!(
                    "Notification {id} is terminal and cannot fail"
                )));
            }
            entry.status = NotificationStatus::Failed;
            entry.failure_reason = Some(reason.into());
            entry.clone()
        };
        self.emit(StoreEvent::Updated {
            data: Box::new(updated),
            timestamp: now,
        });
        self.recompute_stats();
        Ok(())
    }

    /// Remove expired notifications. Returns how many were purged.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let expired: Vec<NotificationId> = self
            .notifications
            .iter()
            .filter(|e| e.is_expired_at(now))
            .map(|e| e.id)
            .collect();
        for id in &expired {
            self.remove_internal(*id);
        }
        if !expired.is_empty() {
            self.recompute_stats();
        }
        expired.len()
    }

    // ---- delivery records ----

    /// Insert a delivery record.
    pub fn insert_delivery(&self, delivery: Delivery) -> AppResult<()> {
        if !self.notifications.contains_key(&delivery.notification_id) {
            return Err(AppError::validation(format!(
                "Delivery references unknown notification {}",
                delivery.notification_id
            )));
        }
        self.delivery_index
            .entry(delivery.notification_id)
            .or_default()
            .push(delivery.id);
        self.deliveries.insert(delivery.id, delivery);
        Ok(())
    }

    /// Fetch a delivery by identifier.
    pub fn delivery(&self, id: DeliveryId) -> Option<Delivery> {
        self.deliveries.get(&id).map(|d| d.clone())
    }

    /// Replace a delivery record, guarding the attempt invariants.
    pub fn update_delivery(&self, delivery: Delivery) -> AppResult<()> {
        let mut entry = self.deliveries.get_mut(&delivery.id).ok_or_else(|| {
            AppError::not_found(format!("Delivery {} not found", delivery.id))
        })?;
        if entry.status.is_terminal() && delivery.attempts > entry.attempts {
            return Err(AppError::conflict(format!(
                "Delivery {} is terminal; attempts may not advance",
                delivery.id
            )));
        }
        if delivery.attempts > delivery.max_attempts {
            return Err(AppError::conflict(format!(
                "Delivery {} exceeds max attempts",
                delivery.id
            )));
        }
        *entry = delivery;
        Ok(())
    }

    /// All delivery records for a notification.
    pub fn deliveries_for(&self, notification_id: NotificationId) -> Vec<Delivery> {
        self.delivery_index
            .get(&notification_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.deliveries.get(id).map(|d| d.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Non-terminal deliveries whose next attempt is due at `now`.
    pub fn due_deliveries(&self, now: DateTime<Utc>) -> Vec<Delivery> {
        self.deliveries
            .iter()
            .filter(|d| d.is_due_at(now))
            .map(|d| d.clone())
            .collect()
    }

    /// Recompute the parent notification's aggregate status from its
    /// delivery records.
    ///
    /// The notification advances to `delivered` only when every
    /// targeted channel's delivery is terminal-successful; if all
    /// deliveries are terminal and none succeeded, it fails. Anything
    /// in between stays `sent`. The update happens under the entry
    /// lock, so racing channel completions cannot lose updates.
    pub fn recompute_aggregate(&self, notification_id: NotificationId) -> AppResult<()> {
        let deliveries = self.deliveries_for(notification_id);
        if deliveries.is_empty() {
            return Ok(());
        }
        let all_terminal = deliveries.iter().all(|d| d.status.is_terminal());
        let all_delivered = deliveries
            .iter()
            .all(|d| d.status == pulse_entity::DeliveryStatus::Delivered);
        let any_delivered = deliveries
            .iter()
            .any(|d| d.status == pulse_entity::DeliveryStatus::Delivered);

        let now = Utc::now();
        let updated = {
            let mut entry = self.notifications.get_mut(&notification_id).ok_or_else(|| {
                AppError::not_found(format!("Notification {notification_id} not found"))
            })?;
            // The recipient may already have read it; leave terminal
            // states alone.
            if entry.status != NotificationStatus::Sent
                && entry.status != NotificationStatus::Pending
            {
                return Ok(());
            }
            let before = entry.status;
            if all_terminal && all_delivered {
                apply_status(&mut entry, NotificationStatus::Delivered, now);
            } else if all_terminal && !any_delivered {
                entry.status = NotificationStatus::Failed;
                entry.failure_reason = Some("all channels failed".to_string());
            } else if entry.status == NotificationStatus::Pending {
                // Still retrying, or a partial success: remains sent.
                apply_status(&mut entry, NotificationStatus::Sent, now);
            }
            if entry.status == before {
                return Ok(());
            }
            entry.clone()
        };
        self.emit(StoreEvent::Updated {
            data: Box::new(updated),
            timestamp: now,
        });
        self.recompute_stats();
        Ok(())
    }

    // ---- stats ----

    /// The current statistics snapshot.
    pub fn stats(&self) -> NotificationStats {
        self.stats
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Statistics restricted to one recipient, computed on demand.
    pub fn stats_for(&self, recipient: UserId) -> NotificationStats {
        let now = Utc::now();
        let items: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|e| e.recipient == recipient)
            .map(|e| e.clone())
            .collect();
        NotificationStats::compute(items.iter(), now)
    }

    // ---- internal ----

    fn transition_batch(
        &self,
        ids: &[NotificationId],
        to: NotificationStatus,
        is_noop: impl Fn(&Notification) -> bool,
    ) -> AppResult<()> {
        // Validate everything before mutating anything.
        for id in ids {
            let entry = self
                .notifications
                .get(id)
                .ok_or_else(|| AppError::not_found(format!("Notification {id} not found")))?;
            if !is_noop(&entry) && !entry.status.can_transition(to) {
                return Err(AppError::conflict(format!(
                    "Illegal status transition {} -> {} for notification {id}",
                    entry.status, to
                )));
            }
        }

        let now = Utc::now();
        for id in ids {
            let mut changed = None;
            if let Some(mut entry) = self.notifications.get_mut(id) {
                if !is_noop(&entry) {
                    apply_status(&mut entry, to, now);
                    changed = Some(entry.clone());
                }
            }
            if let Some(n) = changed {
                self.emit(status_event(&n, now));
            }
        }
        self.recompute_stats();
        Ok(())
    }

    fn remove_internal(&self, id: NotificationId) {
        if self.notifications.remove(&id).is_some() {
            self.emit(StoreEvent::Deleted {
                id,
                timestamp: Utc::now(),
            });
        }
        if let Some((_, delivery_ids)) = self.delivery_index.remove(&id) {
            for did in delivery_ids {
                self.deliveries.remove(&did);
            }
        }
    }

    fn evict_over_cap(&self, recipient: UserId) {
        let cap = self.config.max_stored_per_user as usize;
        if cap == 0 {
            return;
        }
        let mut owned: Vec<(NotificationId, DateTime<Utc>)> = self
            .notifications
            .iter()
            .filter(|e| e.recipient == recipient)
            .map(|e| (e.id, e.created_at))
            .collect();
        if owned.len() <= cap {
            return;
        }
        owned.sort_by_key(|(_, created)| *created);
        let excess = owned.len() - cap;
        for (id, _) in owned.into_iter().take(excess) {
            tracing::debug!("Evicting notification {} over per-user cap", id);
            self.remove_internal(id);
        }
    }

    fn emit(&self, event: StoreEvent) {
        // No receivers is fine; the sync layer may not be attached.
        let _ = self.events.send(event);
    }

    fn recompute_stats(&self) {
        let now = Utc::now();
        let items: Vec<Notification> = self.notifications.iter().map(|e| e.clone()).collect();
        let snapshot = NotificationStats::compute(items.iter(), now);
        *self.stats.lock().unwrap_or_else(|e| e.into_inner()) = snapshot;
    }
}

/// Set the status and keep the `read_at`/`archived_at` invariants.
fn apply_status(notification: &mut Notification, to: NotificationStatus, now: DateTime<Utc>) {
    notification.status = to;
    notification.read_at = (to == NotificationStatus::Read).then_some(now);
    notification.archived_at = (to == NotificationStatus::Archived).then_some(now);
}

fn status_event(notification: &Notification, now: DateTime<Utc>) -> StoreEvent {
    match notification.status {
        NotificationStatus::Read => StoreEvent::Read {
            data: Box::new(notification.clone()),
            timestamp: now,
        },
        NotificationStatus::Archived => StoreEvent::Archived {
            id: notification.id,
            timestamp: now,
        },
        _ => StoreEvent::Updated {
            data: Box::new(notification.clone()),
            timestamp: now,
        },
    }
}

fn validate_invariants(notification: &Notification) -> AppResult<()> {
    if notification.title.trim().is_empty() {
        return Err(AppError::validation("Notification title must not be empty"));
    }
    let read_ok = notification.read_at.is_some() == (notification.status == NotificationStatus::Read);
    let archived_ok =
        notification.archived_at.is_some() == (notification.status == NotificationStatus::Archived);
    if !read_ok || !archived_ok {
        return Err(AppError::validation(
            "Notification timestamp invariants violated",
        ));
    }
    Ok(())
}
