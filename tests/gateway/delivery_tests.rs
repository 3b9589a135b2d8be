//! Delivery scenarios between live connections.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;

use chat_delivery::domain::UserId;

use crate::common::{wait_until, TestApp, ALICE, BOB, CAROL};

async fn subscribed(app: &TestApp, user: i64) {
    let bridge = app.state.bridge.clone();
    wait_until(|| bridge.has_subscriptions(UserId::new(user))).await;
}

#[tokio::test]
async fn test_chat_is_confirmed_to_sender_and_delivered_to_receiver() {
    let app = TestApp::new().await;
    let mut alice = app.connect(ALICE).await;
    let mut bob = app.connect(BOB).await;
    subscribed(&app, ALICE).await;
    subscribed(&app, BOB).await;

    alice.send_json(json!({ "type": "chat", "data": { "receiver_id": BOB, "content": "hi bob" } }));

    let confirmed = alice.recv_json().await;
    assert_eq!(confirmed["type"], "chat_confirmed");
    assert_eq!(confirmed["data"]["content"], "hi bob");
    let message_id = confirmed["data"]["id"].as_i64().unwrap();

    let delivered = bob.recv_json().await;
    assert_eq!(delivered["type"], "chat");
    assert_eq!(delivered["data"]["message_id"], message_id);
    assert_eq!(delivered["data"]["sender_id"], ALICE);
    assert_eq!(delivered["data"]["receiver_id"], BOB);
    assert_eq!(delivered["data"]["content"], "hi bob");

    // The sender sees its own message once, as the confirmation
    alice.expect_silence(Duration::from_millis(100)).await;
    assert_eq!(app.store.message_count(), 1);

    alice.close().await;
    bob.close().await;
}

#[tokio::test]
async fn test_offline_receiver_still_gets_history() {
    let app = TestApp::new().await;
    let mut alice = app.connect(ALICE).await;

    alice.send_json(json!({ "type": "chat", "data": { "receiver_id": CAROL, "content": "later" } }));

    let confirmed = alice.recv_json().await;
    assert_eq!(confirmed["type"], "chat_confirmed");

    let history = app
        .state
        .chat
        .get_conversation_messages(UserId::new(CAROL), UserId::new(ALICE), None, None)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].content, "later");

    alice.close().await;
}

#[tokio::test]
async fn test_rejected_chat_returns_error_envelope() {
    let app = TestApp::new().await;
    let mut alice = app.connect(ALICE).await;

    alice.send_json(json!({ "type": "chat", "data": { "receiver_id": 999, "content": "hi" } }));
    let reply = alice.recv_json().await;
    assert_eq!(reply, json!({ "type": "error", "data": { "message": "User 999 not found" } }));

    alice.send_json(json!({ "type": "chat", "data": { "receiver_id": BOB, "content": "  " } }));
    let reply = alice.recv_json().await;
    assert_eq!(reply["type"], "error");

    alice.send_json(json!({
        "type": "chat",
        "data": { "receiver_id": BOB, "content": "x".repeat(4001) }
    }));
    let reply = alice.recv_json().await;
    assert_eq!(reply["type"], "error");

    assert_eq!(app.store.message_count(), 0);
    alice.close().await;
}

#[tokio::test]
async fn test_storage_failure_is_reported_without_details() {
    let app = TestApp::new().await;
    let mut alice = app.connect(ALICE).await;
    app.store.set_failing(true);

    alice.send_json(json!({ "type": "chat", "data": { "receiver_id": BOB, "content": "hi" } }));

    let reply = alice.recv_json().await;
    assert_eq!(
        reply,
        json!({ "type": "error", "data": { "message": "Failed to process message" } })
    );
    assert!(app.broker.published().is_empty());

    alice.close().await;
}

#[tokio::test]
async fn test_malformed_frames_are_skipped() {
    let app = TestApp::new().await;
    let mut alice = app.connect(ALICE).await;

    alice.send_text("not json at all");
    alice.send_json(json!({ "type": "chat", "data": { "receiver_id": "two" } }));
    alice.send_json(json!({ "type": "presence", "data": {} }));
    alice.send_json(json!({ "type": "chat", "data": { "receiver_id": BOB, "content": "still here" } }));

    // Only the valid frame produces a reply
    let reply = alice.recv_json().await;
    assert_eq!(reply["type"], "chat_confirmed");
    assert_eq!(reply["data"]["content"], "still here");
    assert!(app.state.gateway.registry().is_online(UserId::new(ALICE)));

    alice.close().await;
}

#[tokio::test]
async fn test_bus_outage_degrades_to_confirmation_only() {
    let app = TestApp::new().await;
    app.broker.set_connected(false);
    let mut alice = app.connect(ALICE).await;
    let mut bob = app.connect(BOB).await;

    alice.send_json(json!({ "type": "chat", "data": { "receiver_id": BOB, "content": "hello?" } }));

    let confirmed = alice.recv_json().await;
    assert_eq!(confirmed["type"], "chat_confirmed");
    bob.expect_silence(Duration::from_millis(100)).await;
    assert_eq!(app.store.message_count(), 1);

    alice.close().await;
    bob.close().await;
}

#[tokio::test]
async fn test_typing_notice_reaches_receiver() {
    let app = TestApp::new().await;
    let alice = app.connect(ALICE).await;
    let mut bob = app.connect(BOB).await;

    alice.send_json(json!({ "type": "typing", "data": { "receiver_id": BOB, "is_typing": true } }));

    let notice = bob.recv_json().await;
    assert_eq!(
        notice,
        json!({
            "type": "typing",
            "data": { "sender_id": ALICE, "receiver_id": BOB, "is_typing": true }
        })
    );

    // Typing towards an offline user is dropped silently
    alice.send_json(json!({ "type": "typing", "data": { "receiver_id": CAROL, "is_typing": true } }));

    alice.close().await;
    bob.close().await;
}

#[tokio::test]
async fn test_read_frame_sends_receipt_to_sender() {
    let app = TestApp::new().await;
    let mut alice = app.connect(ALICE).await;
    let mut bob = app.connect(BOB).await;
    subscribed(&app, BOB).await;

    alice.send_json(json!({ "type": "chat", "data": { "receiver_id": BOB, "content": "ping" } }));
    let message_id = alice.recv_json().await["data"]["id"].as_i64().unwrap();
    assert_eq!(bob.recv_json().await["type"], "chat");

    bob.send_json(json!({ "type": "read", "data": { "message_id": message_id } }));

    let receipt = alice.recv_json().await;
    assert_eq!(
        receipt,
        json!({ "type": "read", "data": { "message_id": message_id, "reader_id": BOB } })
    );

    // Only the receiver may mark it
    alice.send_json(json!({ "type": "read", "data": { "message_id": message_id } }));
    assert_eq!(alice.recv_json().await["type"], "error");

    alice.close().await;
    bob.close().await;
}
