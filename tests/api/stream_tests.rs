//! Chat Stream Tests
//!
//! The WebSocket stream end to end: Hello on connect, MESSAGE_CREATE
//! dispatch with per-connection sequence numbers, heartbeat ACKs, and
//! listener cleanup once the socket closes.

use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestWebSocket;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::common::{TestApp, TestUser};

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Connect to a chat stream and consume the Hello frame
async fn open_stream(app: &TestApp, user: &TestUser, chat_id: &str) -> TestWebSocket {
    let mut socket = app
        .server
        .get_websocket(&format!("/api/v1/chats/{chat_id}/stream"))
        .authorization_bearer(&user.token)
        .await
        .into_websocket()
        .await;

    let hello = next_frame(&mut socket).await;
    assert_eq!(hello["op"], 10);
    assert_eq!(hello["d"]["chat_id"], chat_id);
    assert_eq!(hello["d"]["heartbeat_interval"], 45000);
    socket
}

async fn next_frame(socket: &mut TestWebSocket) -> Value {
    tokio::time::timeout(FRAME_TIMEOUT, socket.receive_json::<Value>())
        .await
        .expect("frame within timeout")
}

async fn post(app: &TestApp, user: &TestUser, chat_id: &str, text: &str) -> Value {
    let response = app
        .server
        .post(&format!("/api/v1/chats/{chat_id}/messages"))
        .authorization_bearer(&user.token)
        .json(&json!({ "text": text }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

async fn wait_for_listeners(app: &TestApp, chat: Uuid, expected: usize) {
    for _ in 0..100 {
        if app.state.registry.listener_count(chat) == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(app.state.registry.listener_count(chat), expected);
}

#[tokio::test]
async fn test_posted_message_reaches_every_open_stream() {
    let app = TestApp::with_http_transport();
    let alice = app.user();
    let bob = app.user();
    let chat_id = app
        .create_chat(&alice, json!({ "type": "group", "name": "g", "member_ids": [bob.id] }))
        .await;
    let chat: Uuid = chat_id.parse().unwrap();

    let mut alice_ws = open_stream(&app, &alice, &chat_id).await;
    let mut bob_ws = open_stream(&app, &bob, &chat_id).await;
    assert_eq!(app.state.registry.listener_count(chat), 2);

    let posted = post(&app, &alice, &chat_id, "hi both").await;

    for socket in [&mut alice_ws, &mut bob_ws] {
        let frame = next_frame(socket).await;
        assert_eq!(frame["op"], 0);
        assert_eq!(frame["t"], "MESSAGE_CREATE");
        assert_eq!(frame["s"], 1);
        assert_eq!(frame["d"]["id"], posted["id"]);
        assert_eq!(frame["d"]["text"], "hi both");
        assert_eq!(frame["d"]["author_id"], alice.id.to_string());
    }

    alice_ws.close().await;
    bob_ws.close().await;
    wait_for_listeners(&app, chat, 0).await;
    assert_eq!(app.state.registry.total_listeners(), 0);
}

#[tokio::test]
async fn test_sequence_numbers_count_per_connection() {
    let app = TestApp::with_http_transport();
    let alice = app.user();
    let chat_id = app.create_chat(&alice, json!({ "type": "group", "name": "g" })).await;

    let mut early = open_stream(&app, &alice, &chat_id).await;
    post(&app, &alice, &chat_id, "first").await;
    assert_eq!(next_frame(&mut early).await["s"], 1);

    let mut late = open_stream(&app, &alice, &chat_id).await;
    post(&app, &alice, &chat_id, "second").await;

    let on_early = next_frame(&mut early).await;
    let on_late = next_frame(&mut late).await;
    assert_eq!(on_early["s"], 2);
    assert_eq!(on_early["d"]["text"], "second");
    assert_eq!(on_late["s"], 1);
    assert_eq!(on_late["d"]["text"], "second");
}

#[tokio::test]
async fn test_heartbeat_is_acknowledged() {
    let app = TestApp::with_http_transport();
    let alice = app.user();
    let chat_id = app.create_chat(&alice, json!({ "type": "group", "name": "g" })).await;
    let mut socket = open_stream(&app, &alice, &chat_id).await;

    socket.send_json(&json!({ "op": 1 })).await;
    assert_eq!(next_frame(&mut socket).await, json!({ "op": 11 }));

    // Malformed frames are ignored and the stream stays usable
    socket.send_text("not json").await;
    socket.send_json(&json!({ "op": 1, "d": 7 })).await;
    assert_eq!(next_frame(&mut socket).await, json!({ "op": 11 }));
}
