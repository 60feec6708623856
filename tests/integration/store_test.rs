//! Store behaviors observed across the dispatch pipeline: statistics,
//! filtering, grouping, and inline actions.

use serde_json::json;

use pulse_entity::{
    ActionKind, Channel, ConditionOp, NotificationAction, NotificationStatus, Rule, RuleAction,
    RuleCondition,
};
use pulse_store::{GroupBy, NotificationFilter};

use crate::helpers::{TestEngine, wait_until};

fn route_rule(engine: &TestEngine) -> Rule {
    Rule::new(engine.tenant, "route")
        .with_conditions(vec![RuleCondition::new(
            "source",
            ConditionOp::Eq,
            json!("monitoring"),
        )])
        .with_actions(vec![RuleAction::Route {
            channels: vec![Channel::InApp],
        }])
}

async fn dispatch_delivered(engine: &TestEngine, title: &str) -> pulse_core::types::NotificationId {
    let draft = engine.draft(title);
    let id = draft.id;
    engine.dispatcher.dispatch(draft).await.unwrap();
    let store = engine.store.clone();
    wait_until(move || {
        store
            .get(id)
            .is_some_and(|n| n.status == NotificationStatus::Delivered)
    })
    .await;
    id
}

#[tokio::test(start_paused = true)]
async fn test_stats_follow_the_lifecycle() {
    let engine = TestEngine::new();
    engine.rules.add(route_rule(&engine));

    let a = dispatch_delivered(&engine, "one").await;
    let b = dispatch_delivered(&engine, "two").await;
    let _c = dispatch_delivered(&engine, "three").await;

    let stats = engine.store.stats();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.unread, 3);
    assert_eq!(stats.today, 3);
    assert_eq!(stats.by_channel[&Channel::InApp], 3);

    engine.store.mark_read(&[a]).unwrap();
    engine.store.archive(&[b]).unwrap();

    let stats = engine.store.stats();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.unread, 1);
    assert_eq!(stats.by_status[&NotificationStatus::Read], 1);
    assert_eq!(stats.by_status[&NotificationStatus::Archived], 1);
}

#[tokio::test(start_paused = true)]
async fn test_filtered_listing_and_grouping() {
    let engine = TestEngine::new();
    engine.rules.add(route_rule(&engine));

    let a = dispatch_delivered(&engine, "database backup failed").await;
    let _b = dispatch_delivered(&engine, "weekly digest ready").await;
    engine.store.mark_read(&[a]).unwrap();

    let unread = engine
        .store
        .list(&NotificationFilter::for_recipient(engine.user).unread());
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].title, "weekly digest ready");

    let matched = engine.store.list(
        &NotificationFilter::for_recipient(engine.user).with_search("backup"),
    );
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].id, a);

    let groups = engine.store.grouped(
        &NotificationFilter::for_recipient(engine.user),
        GroupBy::Source,
    );
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].items.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_inline_action_marks_read() {
    let engine = TestEngine::new();
    engine.rules.add(route_rule(&engine));

    let draft = engine.draft("approve this").with_actions(vec![
        NotificationAction::new("approve", "Approve", ActionKind::Callback),
        NotificationAction::new("dismiss", "Dismiss", ActionKind::Dismiss),
    ]);
    let id = draft.id;
    engine.dispatcher.dispatch(draft).await.unwrap();
    let store = engine.store.clone();
    wait_until(move || {
        store
            .get(id)
            .is_some_and(|n| n.status == NotificationStatus::Delivered)
    })
    .await;

    // A bad action id is rejected and the store stays untouched.
    let err = engine.store.execute_action(id, "reject").unwrap_err();
    assert!(err.to_string().contains("no action"));
    assert_eq!(
        engine.store.get(id).unwrap().status,
        NotificationStatus::Delivered
    );

    let action = engine.store.execute_action(id, "approve").unwrap();
    assert_eq!(action.id, "approve");
    assert_eq!(engine.store.get(id).unwrap().status, NotificationStatus::Read);
}

#[tokio::test(start_paused = true)]
async fn test_mark_all_read_scoped_to_recipient() {
    let engine = TestEngine::new();
    engine.rules.add(route_rule(&engine));

    let mine = dispatch_delivered(&engine, "mine").await;

    let other = pulse_core::types::UserId::new();
    let mut foreign = engine.draft("theirs");
    foreign.recipient = other;
    let foreign_id = foreign.id;
    engine.dispatcher.dispatch(foreign).await.unwrap();
    let store = engine.store.clone();
    wait_until(move || {
        store
            .get(foreign_id)
            .is_some_and(|n| n.status == NotificationStatus::Delivered)
    })
    .await;

    engine.store.mark_all_read(engine.user).unwrap();
    assert_eq!(
        engine.store.get(mine).unwrap().status,
        NotificationStatus::Read
    );
    assert_eq!(
        engine.store.get(foreign_id).unwrap().status,
        NotificationStatus::Delivered
    );
    assert_eq!(engine.store.stats_for(engine.user).unread, 0);
    assert_eq!(engine.store.stats_for(other).unread, 1);
}
