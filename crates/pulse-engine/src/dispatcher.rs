//! Delivery dispatcher — turns events into channel deliveries.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::{DashMap, DashSet};
use tokio::sync::Semaphore;
use tracing;

use pulse_core::config::delivery::DeliveryConfig;
use pulse_core::config::dispatcher::DispatcherConfig;
use pulse_core::error::AppError;
use pulse_core::result::AppResult;
use pulse_core::types::{DeliveryId, NotificationId};
use pulse_entity::{
    Channel, Delivery, DeliveryStatus, Notification, NotificationStatus, Preference, RetryPolicy,
    RuleAction,
};
use pulse_store::NotificationStore;

use crate::channel::{ChannelError, ChannelRegistry};
use crate::dedup::EventDeduplicator;
use crate::evaluator::{Evaluation, RuleEvaluator};
use crate::event::Event;
use crate::gate::{GateDecision, QuietHoursGate};
use crate::providers::{PreferenceProvider, RuleProvider};
use crate::template;

/// What happened to a dispatched event.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Channel attempts are running on the listed channels.
    Dispatched {
        /// The resolved channel set.
        channels: Vec<Channel>,
    },
    /// A rule suppressed the event; persisted as failed, no delivery.
    Suppressed {
        /// The rule's reason, if any.
        reason: Option<String>,
    },
    /// A duplicate within the dedup window; nothing was persisted.
    Duplicate,
    /// Preference filtering left no channel to deliver on.
    NoEligibleChannels,
    /// Quiet hours deferred the dispatch until the given wake time.
    Deferred {
        /// Scheduled wake instant.
        until: DateTime<Utc>,
    },
    /// A `delay` action rescheduled the dispatch to the given time.
    Delayed {
        /// Earliest scheduled attempt.
        until: DateTime<Utc>,
    },
    /// Nothing left to do (already terminal or no open deliveries).
    Settled,
}

/// Executes rule actions: creates one delivery per resolved channel and
/// drives concurrent per-channel attempts with bounded exponential
/// backoff.
///
/// Channel attempts are independent units of work; failure on one
/// channel never blocks the others. Within one channel, attempts are
/// strictly sequential, guarded by an in-flight marker. The parent
/// notification's aggregate status is recomputed by the store under the
/// entry lock, so racing completions cannot lose updates.
#[derive(Debug)]
pub struct Dispatcher {
    /// Notification/delivery persistence.
    store: Arc<NotificationStore>,
    /// Channel senders.
    registry: Arc<ChannelRegistry>,
    /// Tenant rule source.
    rules: Arc<dyn RuleProvider>,
    /// User preference source.
    preferences: Arc<dyn PreferenceProvider>,
    /// Rule evaluator.
    evaluator: RuleEvaluator,
    /// Quiet-hours gate.
    gate: QuietHoursGate,
    /// Retry policy applied to every delivery.
    policy: RetryPolicy,
    /// Rapid-duplicate suppression.
    dedup: EventDeduplicator,
    /// Quiet-hours deferrals: notification id to scheduled wake.
    deferred: DashMap<NotificationId, DateTime<Utc>>,
    /// Deliveries with a running attempt loop.
    in_flight: DashSet<DeliveryId>,
    /// Bounds concurrent channel sends.
    semaphore: Arc<Semaphore>,
}

impl Dispatcher {
    /// Create a dispatcher.
    pub fn new(
        store: Arc<NotificationStore>,
        registry: Arc<ChannelRegistry>,
        rules: Arc<dyn RuleProvider>,
        preferences: Arc<dyn PreferenceProvider>,
        delivery: &DeliveryConfig,
        dispatcher: &DispatcherConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            registry,
            rules,
            preferences,
            evaluator: RuleEvaluator,
            gate: QuietHoursGate,
            policy: RetryPolicy::from(delivery),
            dedup: EventDeduplicator::new(delivery.dedup_window_ms),
            deferred: DashMap::new(),
            in_flight: DashSet::new(),
            semaphore: Arc::new(Semaphore::new(dispatcher.concurrency)),
        })
    }

    /// The semaphore bounding concurrent sends (used for shutdown drain).
    pub fn semaphore(&self) -> Arc<Semaphore> {
        Arc::clone(&self.semaphore)
    }

    /// Number of notifications currently deferred by quiet hours.
    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }

    /// Dispatch a draft notification using only its own fields as the
    /// event.
    pub async fn dispatch(self: &Arc<Self>, draft: Notification) -> AppResult<DispatchOutcome> {
        let event = Event::from_notification(&draft);
        self.dispatch_event(draft, event).await
    }

    /// Dispatch a draft notification against an explicit event map
    /// (draft fields plus source-system payload fields).
    pub async fn dispatch_event(
        self: &Arc<Self>,
        mut draft: Notification,
        event: Event,
    ) -> AppResult<DispatchOutcome> {
        let now = Utc::now();
        if draft.is_expired_at(now) {
            tracing::debug!(id = %draft.id, "Skipping expired notification");
            return Ok(DispatchOutcome::Settled);
        }

        let dedup_key = EventDeduplicator::make_key(
            &draft.tenant_id.to_string(),
            &draft.recipient.to_string(),
            draft.kind.as_str(),
            draft.source().unwrap_or(""),
        );
        if !self.dedup.should_dispatch(&dedup_key) {
            tracing::trace!(key = %dedup_key, "Event deduplicated");
            return Ok(DispatchOutcome::Duplicate);
        }

        let rules = self.rules.rules_for(draft.tenant_id).await?;
        let actions = match self.evaluator.evaluate(&rules, &event, now) {
            Evaluation::Suppressed { reason } => {
                tracing::info!(id = %draft.id, ?reason, "Notification suppressed by rule");
                draft.status = NotificationStatus::Failed;
                draft.failure_reason = Some("suppressed".to_string());
                self.store.insert(draft)?;
                return Ok(DispatchOutcome::Suppressed { reason });
            }
            Evaluation::Actions(actions) => actions,
        };

        let mut routed: Vec<Channel> = Vec::new();
        let mut delay_seconds: u64 = 0;
        for action in actions {
            match action {
                RuleAction::Route { channels } => {
                    for channel in channels {
                        if !routed.contains(&channel) {
                            routed.push(channel);
                        }
                    }
                }
                RuleAction::Escalate {
                    priority,
                    add_channels,
                } => {
                    if let Some(p) = priority {
                        // Escalation never lowers priority.
                        draft.priority = draft.priority.max(p);
                    }
                    for channel in add_channels {
                        if !routed.contains(&channel) {
                            routed.push(channel);
                        }
                    }
                }
                RuleAction::Transform { title, message } => {
                    if let Some(t) = title {
                        draft.title = template::render(&t, &event);
                    }
                    if let Some(m) = message {
                        draft.message = template::render(&m, &event);
                    }
                }
                RuleAction::Delay { seconds } => {
                    delay_seconds = delay_seconds.max(seconds);
                }
                // The evaluator returns suppress as its own outcome.
                RuleAction::Suppress { .. } => {}
            }
        }

        // No routing rule matched: fall back to the draft's own channels.
        if routed.is_empty() {
            routed = draft.channels.clone();
        }

        let preference = self.preferences.preferences(draft.recipient).await?;
        let resolved = preference.resolve_channels(draft.kind, draft.priority, &routed);

        // Pair each channel with a sender and address up front; missing
        // sender or address is a configuration error and skips only
        // that channel.
        let mut targets: Vec<(Channel, String)> = Vec::new();
        for channel in resolved {
            let Some(sender) = self.registry.sender(channel) else {
                tracing::warn!(%channel, "No sender configured; skipping channel");
                continue;
            };
            match sender.address(&draft) {
                Some(address) => targets.push((channel, address)),
                None => {
                    tracing::warn!(
                        %channel,
                        recipient = %draft.recipient,
                        "No recipient address; skipping channel"
                    );
                }
            }
        }

        if targets.is_empty() {
            tracing::info!(id = %draft.id, "No eligible channels after preference filtering");
            draft.status = NotificationStatus::Failed;
            draft.failure_reason = Some("no eligible channels".to_string());
            draft.channels = Vec::new();
            self.store.insert(draft)?;
            return Ok(DispatchOutcome::NoEligibleChannels);
        }

        draft.channels = targets.iter().map(|(c, _)| *c).collect();
        let id = draft.id;
        self.store.insert(draft)?;

        let first_attempt_at =
            (delay_seconds > 0).then(|| now + ChronoDuration::seconds(delay_seconds as i64));
        for (channel, address) in targets {
            let mut delivery = Delivery::new(id, channel, address, self.policy.max_attempts);
            delivery.next_attempt_at = first_attempt_at;
            self.store.insert_delivery(delivery)?;
        }

        self.pump(id).await
    }

    /// Launch attempt loops for every open delivery of a notification,
    /// re-checking the quiet-hours gate first.
    ///
    /// Called on initial dispatch, on deferred wake, and from the tick
    /// loop to resume retries after a restart.
    pub async fn pump(self: &Arc<Self>, id: NotificationId) -> AppResult<DispatchOutcome> {
        let notification = self
            .store
            .get(id)
            .ok_or_else(|| AppError::not_found(format!("Notification {id} not found")))?;
        if notification.status.is_terminal() {
            return Ok(DispatchOutcome::Settled);
        }

        let preference = self.preferences.preferences(notification.recipient).await?;
        if self.gate.check(&preference, notification.priority, Utc::now()) == GateDecision::Defer {
            let until = self.defer(id, &preference);
            return Ok(DispatchOutcome::Deferred { until });
        }

        let now = Utc::now();
        let mut launched: Vec<Channel> = Vec::new();
        let mut earliest_future: Option<DateTime<Utc>> = None;
        let mut any_due = false;
        for delivery in self.store.deliveries_for(id) {
            if delivery.status.is_terminal() {
                continue;
            }
            match delivery.next_attempt_at {
                Some(next) if next > now => {
                    earliest_future = Some(earliest_future.map_or(next, |e| e.min(next)));
                }
                _ => any_due = true,
            }
            launched.push(delivery.channel);
            let me = Arc::clone(self);
            let delivery_id = delivery.id;
            tokio::spawn(async move {
                me.attempt_loop(delivery_id).await;
            });
        }

        if launched.is_empty() {
            return Ok(DispatchOutcome::Settled);
        }
        match earliest_future {
            Some(until) if !any_due => Ok(DispatchOutcome::Delayed { until }),
            _ => Ok(DispatchOutcome::Dispatched { channels: launched }),
        }
    }

    /// One dispatcher tick: re-evaluate quiet-hours deferrals against
    /// current preferences and resume due retries.
    pub async fn tick(self: &Arc<Self>) {
        let deferred: Vec<NotificationId> = self.deferred.iter().map(|e| *e.key()).collect();
        for id in deferred {
            self.deferred.remove(&id);
            if let Err(e) = self.pump(id).await {
                tracing::error!(%id, "Failed to re-evaluate deferred notification: {e}");
            }
        }

        for delivery in self.store.due_deliveries(Utc::now()) {
            if self.in_flight.contains(&delivery.id) {
                continue;
            }
            let me = Arc::clone(self);
            tokio::spawn(async move {
                me.attempt_loop(delivery.id).await;
            });
        }

        self.dedup.cleanup();
    }

    /// Record a quiet-hours deferral and schedule its wake.
    fn defer(self: &Arc<Self>, id: NotificationId, preference: &Preference) -> DateTime<Utc> {
        let wake = self.gate.window_end(&preference.quiet_hours, Utc::now());
        tracing::debug!(%id, %wake, "Quiet hours deferred notification");
        self.deferred.insert(id, wake);
        let me = Arc::clone(self);
        tokio::spawn(async move {
            let wait = (wake - Utc::now()).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;
            // Only fire if this exact deferral is still current; a tick
            // or preference change may have superseded it.
            if me.deferred.remove_if(&id, |_, w| *w == wake).is_some() {
                if let Err(e) = me.pump(id).await {
                    tracing::error!(%id, "Deferred wake failed: {e}");
                }
            }
        });
        wake
    }

    /// Sequential attempt loop for one delivery.
    ///
    /// The in-flight marker guarantees at most one loop per delivery,
    /// so attempts within a channel are never concurrent.
    async fn attempt_loop(self: &Arc<Self>, delivery_id: DeliveryId) {
        if !self.in_flight.insert(delivery_id) {
            return;
        }
        let result = self.run_attempts(delivery_id).await;
        self.in_flight.remove(&delivery_id);
        if let Err(e) = result {
            tracing::error!(%delivery_id, "Attempt loop failed: {e}");
        }
    }

    async fn run_attempts(self: &Arc<Self>, delivery_id: DeliveryId) -> AppResult<()> {
        loop {
            let Some(delivery) = self.store.delivery(delivery_id) else {
                return Ok(());
            };
            if delivery.status.is_terminal() {
                return Ok(());
            }

            // Wait out any scheduled backoff or delay.
            if let Some(next) = delivery.next_attempt_at {
                let now = Utc::now();
                if next > now {
                    tokio::time::sleep((next - now).to_std().unwrap_or_default()).await;
                }
            }

            let Some(notification) = self.store.get(delivery.notification_id) else {
                return Ok(());
            };
            if notification.status == NotificationStatus::Failed
                || notification.status == NotificationStatus::Archived
            {
                return Ok(());
            }

            // The gate is consulted before each attempt; a preference
            // change while we slept must not be ignored.
            let preference = self.preferences.preferences(notification.recipient).await?;
            if self.gate.check(&preference, notification.priority, Utc::now())
                == GateDecision::Defer
            {
                self.defer(notification.id, &preference);
                return Ok(());
            }

            if notification.status == NotificationStatus::Pending {
                // First channel to attempt moves the parent to sent;
                // a racing channel may have beaten us to it.
                if let Err(e) = self
                    .store
                    .update_status(notification.id, NotificationStatus::Sent)
                {
                    tracing::trace!(id = %notification.id, "Sent transition skipped: {e}");
                }
            }

            let Some(sender) = self.registry.sender(delivery.channel) else {
                tracing::warn!(channel = %delivery.channel, "Sender disappeared; failing delivery");
                let mut failed = delivery;
                failed.status = DeliveryStatus::Failed;
                failed.error = Some("no sender configured".to_string());
                failed.next_attempt_at = None;
                self.store.update_delivery(failed)?;
                self.store.recompute_aggregate(notification.id)?;
                return Ok(());
            };

            let permit = match Arc::clone(&self.semaphore).acquire_owned().await {
                Ok(p) => p,
                // Closed semaphore means shutdown.
                Err(_) => return Ok(()),
            };

            let mut attempt = delivery;
            attempt.attempts += 1;
            attempt.last_attempt_at = Some(Utc::now());
            attempt.next_attempt_at = None;

            let outcome = sender.send(&notification, &attempt.address).await;
            drop(permit);

            match outcome {
                Ok(()) => {
                    tracing::info!(
                        id = %attempt.id,
                        channel = %attempt.channel,
                        attempt = attempt.attempts,
                        "Delivery succeeded"
                    );
                    attempt.status = DeliveryStatus::Delivered;
                    attempt.delivered_at = Some(Utc::now());
                    attempt.error = None;
                    self.store.update_delivery(attempt)?;
                    self.store.recompute_aggregate(notification.id)?;
                    return Ok(());
                }
                Err(ChannelError::Permanent(msg)) => {
                    // A bounce consumes its attempt slot, then the
                    // record goes terminal regardless of remaining
                    // slots.
                    tracing::warn!(
                        id = %attempt.id,
                        channel = %attempt.channel,
                        "Delivery bounced: {msg}"
                    );
                    attempt.status = DeliveryStatus::Bounced;
                    attempt.error = Some(msg);
                    self.store.update_delivery(attempt)?;
                    self.store.recompute_aggregate(notification.id)?;
                    return Ok(());
                }
                Err(ChannelError::Transient(msg)) => {
                    tracing::warn!(
                        id = %attempt.id,
                        channel = %attempt.channel,
                        attempt = attempt.attempts,
                        max = attempt.max_attempts,
                        "Delivery attempt failed: {msg}"
                    );
                    attempt.error = Some(msg);
                    if attempt.attempts >= attempt.max_attempts {
                        attempt.status = DeliveryStatus::Failed;
                        self.store.update_delivery(attempt)?;
                        self.store.recompute_aggregate(notification.id)?;
                        return Ok(());
                    }
                    let delay = self.policy.delay_after(attempt.attempts);
                    attempt.status = DeliveryStatus::Sent;
                    attempt.next_attempt_at =
                        Some(Utc::now() + ChronoDuration::from_std(delay).unwrap_or_default());
                    self.store.update_delivery(attempt)?;
                    // Loop back around; the sleep at the top waits out
                    // the backoff.
                }
            }
        }
    }
}
