//! Delivery lifecycle: retries, bounces, quiet-hours deferral, and
//! deduplication observed through the store.

use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::{NaiveTime, Utc};
use serde_json::json;

use pulse_core::config::delivery::DeliveryConfig;
use pulse_engine::DispatchOutcome;
use pulse_entity::{
    Channel, ConditionOp, DeliveryStatus, NotificationStatus, Preference, QuietHours, Rule,
    RuleAction, RuleCondition,
};

use crate::helpers::{TestEngine, wait_until};

fn route_rule(engine: &TestEngine, channels: Vec<Channel>) -> Rule {
    Rule::new(engine.tenant, "route")
        .with_conditions(vec![RuleCondition::new(
            "source",
            ConditionOp::Eq,
            json!("monitoring"),
        )])
        .with_actions(vec![RuleAction::Route { channels }])
}

#[tokio::test(start_paused = true)]
async fn test_retry_until_delivered() {
    let engine = TestEngine::new();
    engine.rules.add(route_rule(&engine, vec![Channel::Email]));
    engine.email.transient_failures.store(2, Ordering::SeqCst);

    let draft = engine.draft("flaky gateway");
    let id = draft.id;
    engine.dispatcher.dispatch(draft).await.unwrap();

    let store = engine.store.clone();
    wait_until(move || {
        store
            .get(id)
            .is_some_and(|n| n.status == NotificationStatus::Delivered)
    })
    .await;

    let delivery = &engine.store.deliveries_for(id)[0];
    assert_eq!(delivery.status, DeliveryStatus::Delivered);
    assert_eq!(delivery.attempts, 3);
    assert!(delivery.delivered_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_fail_notification() {
    let engine = TestEngine::with_config(DeliveryConfig {
        max_attempts: 2,
        ..Default::default()
    });
    engine.rules.add(route_rule(&engine, vec![Channel::Email]));
    engine
        .email
        .transient_failures
        .store(u32::MAX, Ordering::SeqCst);

    let draft = engine.draft("gateway down");
    let id = draft.id;
    engine.dispatcher.dispatch(draft).await.unwrap();

    let store = engine.store.clone();
    wait_until(move || {
        store
            .get(id)
            .is_some_and(|n| n.status == NotificationStatus::Failed)
    })
    .await;

    let delivery = &engine.store.deliveries_for(id)[0];
    assert_eq!(delivery.status, DeliveryStatus::Failed);
    assert_eq!(delivery.attempts, 2);
    assert_eq!(
        engine.store.get(id).unwrap().failure_reason.as_deref(),
        Some("all channels failed")
    );
}

#[tokio::test(start_paused = true)]
async fn test_bounce_abandons_immediately() {
    let engine = TestEngine::new();
    engine.rules.add(route_rule(&engine, vec![Channel::Email]));
    engine.email.permanent_failures.store(1, Ordering::SeqCst);

    let draft = engine.draft("bad address");
    let id = draft.id;
    engine.dispatcher.dispatch(draft).await.unwrap();

    let store = engine.store.clone();
    wait_until(move || {
        store
            .get(id)
            .is_some_and(|n| n.status == NotificationStatus::Failed)
    })
    .await;

    let delivery = &engine.store.deliveries_for(id)[0];
    assert_eq!(delivery.status, DeliveryStatus::Bounced);
    assert_eq!(delivery.attempts, 1);
    assert!(engine.email.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_quiet_hours_released_by_tick_after_preference_change() {
    let engine = TestEngine::new();
    engine.rules.add(route_rule(&engine, vec![Channel::InApp]));

    let all_day = QuietHours {
        enabled: true,
        start: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
        end: NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
        weekdays: Vec::new(),
        allow_urgent: false,
        allow_critical: false,
    };
    let mut pref = Preference::new(engine.user);
    pref.quiet_hours = all_day;
    engine.preferences.set(pref);

    let draft = engine.draft("hold this");
    let id = draft.id;
    let outcome = engine.dispatcher.dispatch(draft).await.unwrap();
    assert!(matches!(outcome, DispatchOutcome::Deferred { .. }));
    assert_eq!(engine.store.get(id).unwrap().status, NotificationStatus::Pending);

    // The user turns quiet hours off; the next tick re-evaluates with
    // fresh preferences and releases the deferral.
    engine.preferences.set(Preference::new(engine.user));
    engine.dispatcher.tick().await;

    let store = engine.store.clone();
    wait_until(move || {
        store
            .get(id)
            .is_some_and(|n| n.status == NotificationStatus::Delivered)
    })
    .await;
    assert_eq!(engine.in_app.sent(), vec![id]);
}

#[tokio::test]
async fn test_rapid_duplicates_collapse() {
    let engine = TestEngine::with_config(DeliveryConfig::default());
    engine.rules.add(route_rule(&engine, vec![Channel::InApp]));

    let first = engine.draft("dup");
    engine.dispatcher.dispatch(first).await.unwrap();

    for _ in 0..3 {
        let dup = engine.draft("dup");
        let dup_id = dup.id;
        let outcome = engine.dispatcher.dispatch(dup).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Duplicate);
        assert!(engine.store.get(dup_id).is_none());
    }
}

#[tokio::test]
async fn test_expired_draft_never_dispatches() {
    let engine = TestEngine::new();
    engine.rules.add(route_rule(&engine, vec![Channel::InApp]));

    let draft = engine
        .draft("stale")
        .with_expiry(Utc::now() - chrono::Duration::minutes(5));
    let id = draft.id;
    let outcome = engine.dispatcher.dispatch(draft).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Settled);
    assert!(engine.store.get(id).is_none());
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(engine.in_app.sent().is_empty());
}
