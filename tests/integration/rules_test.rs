//! End-to-end rule effects: routing, escalation, transformation, and
//! suppression flowing through dispatch into the store.

use serde_json::json;

use pulse_engine::DispatchOutcome;
use pulse_entity::{
    Channel, ConditionOp, NotificationStatus, Preference, Priority, Rule, RuleAction,
    RuleCondition, TypePreference,
};

use crate::helpers::{TestEngine, wait_until};

fn cond(field: &str, op: ConditionOp, value: serde_json::Value) -> RuleCondition {
    RuleCondition::new(field, op, value)
}

#[tokio::test(start_paused = true)]
async fn test_rule_routes_to_multiple_channels() {
    let engine = TestEngine::new();
    engine.rules.add(
        Rule::new(engine.tenant, "route-monitoring")
            .with_conditions(vec![cond("source", ConditionOp::Eq, json!("monitoring"))])
            .with_actions(vec![RuleAction::Route {
                channels: vec![Channel::InApp, Channel::Email],
            }]),
    );

    let draft = engine.draft("disk full");
    let id = draft.id;
    let outcome = engine.dispatcher.dispatch(draft).await.unwrap();
    assert!(matches!(outcome, DispatchOutcome::Dispatched { .. }));

    let store = engine.store.clone();
    wait_until(move || {
        store
            .get(id)
            .is_some_and(|n| n.status == NotificationStatus::Delivered)
    })
    .await;

    assert_eq!(engine.in_app.sent(), vec![id]);
    assert_eq!(engine.email.sent(), vec![id]);
    assert_eq!(engine.store.deliveries_for(id).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_escalation_unlocks_priority_gated_type() {
    let engine = TestEngine::new();

    // The user only wants urgent-or-higher info notifications.
    let mut pref = Preference::new(engine.user);
    pref.types.insert(
        pulse_entity::NotificationType::Info,
        TypePreference {
            min_priority: Some(Priority::Urgent),
            ..Default::default()
        },
    );
    engine.preferences.set(pref);

    engine.rules.add(
        Rule::new(engine.tenant, "route")
            .with_conditions(vec![cond("source", ConditionOp::Eq, json!("monitoring"))])
            .with_actions(vec![RuleAction::Route {
                channels: vec![Channel::InApp],
            }]),
    );

    // Without escalation the medium-priority draft is filtered out.
    let plain = engine.draft("quiet one");
    let plain_id = plain.id;
    let outcome = engine.dispatcher.dispatch(plain).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::NoEligibleChannels);
    assert_eq!(
        engine.store.get(plain_id).unwrap().status,
        NotificationStatus::Failed
    );

    // An escalation rule raises it past the threshold.
    engine.rules.add(
        Rule::new(engine.tenant, "escalate-disk")
            .with_priority(10)
            .with_conditions(vec![cond("title", ConditionOp::Contains, json!("disk"))])
            .with_actions(vec![RuleAction::Escalate {
                priority: Some(Priority::Urgent),
                add_channels: Vec::new(),
            }]),
    );

    let hot = engine.draft("disk full");
    let hot_id = hot.id;
    let outcome = engine.dispatcher.dispatch(hot).await.unwrap();
    assert!(matches!(outcome, DispatchOutcome::Dispatched { .. }));

    let store = engine.store.clone();
    wait_until(move || {
        store
            .get(hot_id)
            .is_some_and(|n| n.status == NotificationStatus::Delivered)
    })
    .await;
    assert_eq!(engine.store.get(hot_id).unwrap().priority, Priority::Urgent);
}

#[tokio::test(start_paused = true)]
async fn test_transform_rewrites_content_from_event() {
    let engine = TestEngine::new();
    engine.rules.add(
        Rule::new(engine.tenant, "route")
            .with_conditions(vec![cond("source", ConditionOp::Eq, json!("monitoring"))])
            .with_actions(vec![RuleAction::Route {
                channels: vec![Channel::InApp],
            }]),
    );
    engine.rules.add(
        Rule::new(engine.tenant, "tag-source")
            .with_priority(5)
            .with_conditions(vec![cond("source", ConditionOp::Ne, json!(""))])
            .with_actions(vec![RuleAction::Transform {
                title: Some("[{{source}}] {{title}}".to_string()),
                message: Some("{{message}} (via {{missing}})".to_string()),
            }]),
    );

    let draft = engine.draft("cpu high");
    let id = draft.id;
    engine.dispatcher.dispatch(draft).await.unwrap();

    let stored = engine.store.get(id).unwrap();
    assert_eq!(stored.title, "[monitoring] cpu high");
    // Unresolved placeholders stay verbatim.
    assert_eq!(stored.message, "body (via {{missing}})");
}

#[tokio::test]
async fn test_suppression_shortcircuits_delivery() {
    let engine = TestEngine::new();
    engine.rules.add(
        Rule::new(engine.tenant, "route")
            .with_conditions(vec![cond("source", ConditionOp::Eq, json!("monitoring"))])
            .with_actions(vec![RuleAction::Route {
                channels: vec![Channel::InApp, Channel::Email],
            }]),
    );
    engine.rules.add(
        Rule::new(engine.tenant, "maintenance-mute")
            .with_priority(100)
            .with_conditions(vec![cond("source", ConditionOp::Eq, json!("monitoring"))])
            .with_actions(vec![RuleAction::Suppress {
                reason: Some("maintenance".to_string()),
            }]),
    );

    let draft = engine.draft("noise");
    let id = draft.id;
    let outcome = engine.dispatcher.dispatch(draft).await.unwrap();
    assert_eq!(
        outcome,
        DispatchOutcome::Suppressed {
            reason: Some("maintenance".to_string())
        }
    );

    let stored = engine.store.get(id).unwrap();
    assert_eq!(stored.status, NotificationStatus::Failed);
    assert_eq!(stored.failure_reason.as_deref(), Some("suppressed"));
    assert!(engine.store.deliveries_for(id).is_empty());
    assert!(engine.in_app.sent().is_empty());
    assert!(engine.email.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rules_of_other_tenants_do_not_apply() {
    let engine = TestEngine::new();
    engine.rules.add(
        Rule::new(engine.tenant, "route")
            .with_conditions(vec![cond("source", ConditionOp::Eq, json!("monitoring"))])
            .with_actions(vec![RuleAction::Route {
                channels: vec![Channel::InApp],
            }]),
    );
    // A foreign tenant's suppress rule must not fire.
    engine.rules.add(
        Rule::new(pulse_core::types::TenantId::new(), "foreign-mute")
            .with_priority(100)
            .with_conditions(vec![cond("source", ConditionOp::Eq, json!("monitoring"))])
            .with_actions(vec![RuleAction::Suppress { reason: None }]),
    );

    let draft = engine.draft("for us");
    let id = draft.id;
    let outcome = engine.dispatcher.dispatch(draft).await.unwrap();
    assert!(matches!(outcome, DispatchOutcome::Dispatched { .. }));

    let store = engine.store.clone();
    wait_until(move || {
        store
            .get(id)
            .is_some_and(|n| n.status == NotificationStatus::Delivered)
    })
    .await;
}
