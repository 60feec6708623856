//! Full sync loop: store mutations flow over the push channel into a
//! client view, and client mutations flow back.

use std::sync::Arc;

use serde_json::json;

use pulse_core::config::sync::SyncConfig;
use pulse_entity::{
    Channel, ConditionOp, NotificationStatus, Rule, RuleAction, RuleCondition,
};
use pulse_store::NotificationFilter;
use pulse_sync::{ConnectionState, FetchTransport, PushTransport, StoreTransport, SyncClient};

use crate::helpers::{TestEngine, wait_until};

fn client_for(engine: &TestEngine) -> SyncClient {
    let transport = Arc::new(StoreTransport::new(engine.store.clone()));
    SyncClient::start(
        engine.user,
        SyncConfig::default(),
        Arc::clone(&transport) as Arc<dyn PushTransport>,
        transport as Arc<dyn FetchTransport>,
        NotificationFilter::default(),
    )
}

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

#[tokio::test(start_paused = true)]
async fn test_dispatch_reaches_client_view() {
    let engine = TestEngine::new();
    engine.rules.add(route_rule(&engine));
    let client = client_for(&engine);

    wait_until({
        let watch = client.state_watch();
        move || *watch.borrow() == ConnectionState::Connected
    })
    .await;

    let draft = engine.draft("hello");
    let id = draft.id;
    engine.dispatcher.dispatch(draft).await.unwrap();

    wait_until({
        let store = engine.store.clone();
        move || {
            store
                .get(id)
                .is_some_and(|n| n.status == NotificationStatus::Delivered)
        }
    })
    .await;

    wait_until(|| client.get(id).is_some()).await;
    assert_eq!(
        client.get(id).unwrap().status,
        NotificationStatus::Delivered
    );
    assert_eq!(client.unread_count(), 1);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_client_mutations_round_trip() {
    let engine = TestEngine::new();
    engine.rules.add(route_rule(&engine));
    let client = client_for(&engine);

    let draft = engine.draft("mark me");
    let id = draft.id;
    engine.dispatcher.dispatch(draft).await.unwrap();
    wait_until(|| client.get(id).is_some()).await;

    // Read state propagates to the store and back over push.
    client.mark_read(id).await.unwrap();
    assert_eq!(client.unread_count(), 0);
    wait_until({
        let store = engine.store.clone();
        move || {
            store
                .get(id)
                .is_some_and(|n| n.status == NotificationStatus::Read)
        }
    })
    .await;
    assert_eq!(engine.store.stats().unread, 0);

    client.mark_unread(id).await.unwrap();
    wait_until({
        let store = engine.store.clone();
        move || {
            store
                .get(id)
                .is_some_and(|n| n.status == NotificationStatus::Sent)
        }
    })
    .await;
    assert_eq!(engine.store.stats().unread, 1);

    // Delete removes on both sides and tombstones the id locally.
    client.delete(id).await.unwrap();
    assert!(client.get(id).is_none());
    wait_until({
        let store = engine.store.clone();
        move || store.get(id).is_none()
    })
    .await;

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_rejected_mutation_rolls_back_view() {
    let engine = TestEngine::new();
    engine.rules.add(route_rule(&engine));
    let client = client_for(&engine);

    let draft = engine.draft("a");
    let id = draft.id;
    engine.dispatcher.dispatch(draft).await.unwrap();
    wait_until(|| client.get(id).is_some()).await;

    // Deleting server-side first makes the client's delete invalid.
    engine.store.delete(&[id]).unwrap();
    let err = client.delete(id).await.unwrap_err();
    assert!(err.to_string().contains("not found"));

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_server_archive_removes_from_client() {
    let engine = TestEngine::new();
    engine.rules.add(route_rule(&engine));
    let client = client_for(&engine);

    let draft = engine.draft("to archive");
    let id = draft.id;
    engine.dispatcher.dispatch(draft).await.unwrap();
    wait_until(|| client.get(id).is_some()).await;

    engine.store.archive(&[id]).unwrap();
    wait_until(|| client.get(id).is_none()).await;
    assert_eq!(client.unread_count(), 0);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_other_users_notifications_invisible() {
    let engine = TestEngine::new();
    engine.rules.add(route_rule(&engine));
    let client = client_for(&engine);

    wait_until({
        let watch = client.state_watch();
        move || *watch.borrow() == ConnectionState::Connected
    })
    .await;

    // Someone else's notification on the same tenant.
    let mut foreign = engine.draft("not yours");
    foreign.recipient = pulse_core::types::UserId::new();
    let foreign_id = foreign.id;
    engine.dispatcher.dispatch(foreign).await.unwrap();

    let mine = engine.draft("yours");
    let mine_id = mine.id;
    engine.dispatcher.dispatch(mine).await.unwrap();

    wait_until(|| client.get(mine_id).is_some()).await;
    assert!(client.get(foreign_id).is_none());
    assert_eq!(client.notifications().len(), 1);

    client.shutdown().await;
}
