//! Chat API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;

use chat_delivery::application::dto::MessageResponse;

use crate::common::{TestApp, ALICE, BOB, CAROL};

async fn send(app: &TestApp, from: i64, to: i64, content: &str) -> MessageResponse {
    let (status, body) = app
        .post_auth(
            "/api/v1/chat/messages",
            Some(json!({ "receiver_id": to, "content": content })),
            from,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    serde_json::from_value(body).unwrap()
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/v1/chat/conversations").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 10003);

    let (status, _) = app.get("/api/v1/chat/conversations?token=garbage").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_send_message_persists_and_publishes() {
    let app = TestApp::new().await;

    let message = send(&app, ALICE, BOB, "hello bob").await;

    assert_eq!(message.sender_id, ALICE);
    assert_eq!(message.receiver_id, BOB);
    assert_eq!(message.content, "hello bob");
    assert!(!message.is_read);
    assert_eq!(app.store.message_count(), 1);

    let published = app.broker.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].subject, "chat.private.1.2");
}

#[tokio::test]
async fn test_send_message_still_succeeds_when_bus_is_down() {
    let app = TestApp::new().await;
    app.broker.set_connected(false);

    send(&app, BOB, ALICE, "stored anyway").await;

    assert_eq!(app.store.message_count(), 1);
    assert!(app.broker.published().is_empty());
}

#[tokio::test]
async fn test_send_message_rejections() {
    let app = TestApp::new().await;
    let uri = "/api/v1/chat/messages";

    let (status, _) = app
        .post_auth(uri, Some(json!({ "receiver_id": BOB, "content": "" })), ALICE)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post_auth(uri, Some(json!({ "receiver_id": BOB, "content": "   " })), ALICE)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post_auth(
            uri,
            Some(json!({ "receiver_id": BOB, "content": "x".repeat(4001) })),
            ALICE,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post_auth(uri, Some(json!({ "receiver_id": ALICE, "content": "me" })), ALICE)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post_auth(uri, Some(json!({ "receiver_id": 999, "content": "hi" })), ALICE)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User 999 not found");

    assert_eq!(app.store.message_count(), 0);
    assert!(app.broker.published().is_empty());
}

#[tokio::test]
async fn test_history_is_shared_newest_first_and_paged() {
    let app = TestApp::new().await;
    let first = send(&app, ALICE, BOB, "one").await;
    let second = send(&app, BOB, ALICE, "two").await;
    let third = send(&app, ALICE, BOB, "three").await;
    send(&app, ALICE, CAROL, "elsewhere").await;

    let (status, body) = app.get_auth("/api/v1/chat/messages/2", ALICE).await;
    assert_eq!(status, StatusCode::OK);
    let from_alice: Vec<MessageResponse> = serde_json::from_value(body).unwrap();
    let ids: Vec<i64> = from_alice.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![third.id, second.id, first.id]);

    let (_, body) = app.get_auth("/api/v1/chat/messages/1", BOB).await;
    let from_bob: Vec<MessageResponse> = serde_json::from_value(body).unwrap();
    assert_eq!(from_bob, from_alice);

    let (_, body) = app
        .get_auth("/api/v1/chat/messages/2?limit=1&offset=1", ALICE)
        .await;
    let page: Vec<MessageResponse> = serde_json::from_value(body).unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, second.id);
}

#[tokio::test]
async fn test_history_with_unknown_user_is_not_found() {
    let app = TestApp::new().await;

    let (status, _) = app.get_auth("/api/v1/chat/messages/999", ALICE).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get_auth("/api/v1/chat/messages/3", ALICE).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_conversations_show_latest_snapshot() {
    let app = TestApp::new().await;
    send(&app, ALICE, BOB, "first").await;
    send(&app, BOB, ALICE, "latest").await;

    let (status, body) = app.get_auth("/api/v1/chat/conversations", ALICE).await;

    assert_eq!(status, StatusCode::OK);
    let conversations = body.as_array().unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0]["user1_id"], ALICE);
    assert_eq!(conversations[0]["user2_id"], BOB);
    assert_eq!(conversations[0]["other_user_id"], BOB);
    assert_eq!(conversations[0]["last_message"], "latest");

    let (_, body) = app.get_auth("/api/v1/chat/conversations", CAROL).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_mark_message_as_read() {
    let app = TestApp::new().await;
    let message = send(&app, ALICE, BOB, "read me").await;
    let uri = format!("/api/v1/chat/messages/{}/read", message.id);

    let (status, _) = app.post_auth(&uri, None, ALICE).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.post_auth(&uri, None, BOB).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_read"], true);

    // Idempotent
    let (status, body) = app.post_auth(&uri, None, BOB).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_read"], true);

    let (status, _) = app
        .post_auth("/api/v1/chat/messages/424242/read", None, BOB)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
