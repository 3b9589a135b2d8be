//! Connection lifecycle: registration, eviction and cleanup.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::extract::ws::Message;
use futures::channel::mpsc;
use futures::Sink;
use serde_json::json;

use chat_delivery::domain::UserId;

use crate::common::{wait_until, TestApp, ALICE, BOB};

/// Client transport whose writes always fail.
struct BrokenSink;

impl Sink<Message> for BrokenSink {
    type Error = String;

    fn poll_ready(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), String>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, _: Message) -> Result<(), String> {
        Err("connection reset by peer".into())
    }

    fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), String>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), String>> {
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn test_disconnect_cleans_up_registry_and_subscriptions() {
    let app = TestApp::new().await;
    let alice = app.connect(ALICE).await;
    let bridge = app.state.bridge.clone();
    wait_until(|| bridge.has_subscriptions(UserId::new(ALICE))).await;
    assert_eq!(app.state.gateway.connection_count(), 1);
    assert_eq!(app.broker.subscription_count(), 2);

    alice.close().await;

    assert!(!app.state.gateway.registry().is_online(UserId::new(ALICE)));
    assert!(!app.state.bridge.has_subscriptions(UserId::new(ALICE)));
    assert_eq!(app.broker.subscription_count(), 0);
    assert_eq!(app.state.gateway.connection_count(), 0);
}

#[tokio::test]
async fn test_new_session_evicts_previous_one() {
    let app = TestApp::new().await;
    let mut first = app.connect(ALICE).await;
    let mut second = app.connect(ALICE).await;

    // The evicted connection is closed by the server
    match first.recv().await {
        Some(Message::Close(_)) => {}
        other => panic!("expected close frame, got {:?}", other),
    }
    first.finished().await;

    assert_eq!(app.state.gateway.connection_count(), 1);
    let bridge = app.state.bridge.clone();
    wait_until(|| bridge.has_subscriptions(UserId::new(ALICE))).await;
    assert_eq!(app.broker.subscription_count(), 2);

    // Live delivery now targets the newest session
    let bob = app.connect(BOB).await;
    bob.send_json(json!({ "type": "chat", "data": { "receiver_id": ALICE, "content": "hey" } }));

    let delivered = second.recv_json().await;
    assert_eq!(delivered["type"], "chat");
    assert_eq!(delivered["data"]["content"], "hey");

    second.close().await;
    bob.close().await;
}

#[tokio::test]
async fn test_forced_disconnect_closes_connection() {
    let app = TestApp::new().await;
    let mut alice = app.connect(ALICE).await;

    app.state.gateway.disconnect(UserId::new(ALICE)).await;

    match alice.recv().await {
        Some(Message::Close(_)) => {}
        other => panic!("expected close frame, got {:?}", other),
    }
    alice.finished().await;
    assert!(!app.state.gateway.registry().is_online(UserId::new(ALICE)));
    assert!(!app.state.bridge.has_subscriptions(UserId::new(ALICE)));
}

#[tokio::test]
async fn test_write_failure_ends_session_and_cleans_up() {
    let app = TestApp::new().await;
    let alice = UserId::new(ALICE);
    // The inbound side stays open; only the failed write can end the session.
    let (to_server, inbound) = mpsc::unbounded::<Result<Message, String>>();

    let gateway = app.state.gateway.clone();
    let session = tokio::spawn(async move { gateway.serve(alice, BrokenSink, inbound).await });

    let registry = app.state.gateway.registry().clone();
    wait_until(|| registry.is_online(alice)).await;
    let bridge = app.state.bridge.clone();
    wait_until(|| bridge.has_subscriptions(alice)).await;

    // The confirmation is the write that fails.
    let frame = json!({ "type": "chat", "data": { "receiver_id": BOB, "content": "lost reply" } });
    to_server
        .unbounded_send(Ok(Message::Text(frame.to_string().into())))
        .unwrap();

    tokio::time::timeout(Duration::from_secs(2), session)
        .await
        .expect("session kept running after a failed write")
        .unwrap();

    assert!(!app.state.gateway.registry().is_online(alice));
    assert!(!app.state.bridge.has_subscriptions(alice));
    assert_eq!(app.broker.subscription_count(), 0);
    // The message itself was stored before the reply failed.
    assert_eq!(app.store.message_count(), 1);
}
