//! Message API Tests
//!
//! History paging, posting rules and live fan-out through the listener
//! registry behind the stream endpoint.

use std::time::Duration;

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::common::TestApp;

fn texts(history: &Value) -> Vec<String> {
    history
        .as_array()
        .unwrap()
        .iter()
        .filter(|m| m["kind"] == "user_message")
        .map(|m| m["text"].as_str().unwrap().to_owned())
        .collect()
}

#[tokio::test]
async fn test_post_and_page_history() {
    let app = TestApp::new();
    let alice = app.user();
    let chat_id = app.create_chat(&alice, json!({ "type": "group", "name": "g" })).await;
    let url = format!("/api/v1/chats/{chat_id}/messages");

    for text in ["one", "two", "three"] {
        let response = app
            .server
            .post(&url)
            .authorization_bearer(&alice.token)
            .json(&json!({ "text": text }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["text"], text);
        assert_eq!(body["author_id"], alice.id.to_string());
        assert_eq!(body["kind"], "user_message");
    }

    let newest: Value = app
        .server
        .get(&url)
        .add_query_param("limit", 2)
        .authorization_bearer(&alice.token)
        .await
        .json();
    assert_eq!(texts(&newest), vec!["three", "two"]);

    let older: Value = app
        .server
        .get(&url)
        .add_query_param("limit", 2)
        .add_query_param("offset", 2)
        .authorization_bearer(&alice.token)
        .await
        .json();
    // The second page holds "one" and the creator's join notice
    assert_eq!(texts(&older), vec!["one"]);
    assert_eq!(older.as_array().unwrap().len(), 2);

    let beyond: Value = app
        .server
        .get(&url)
        .add_query_param("offset", 10)
        .authorization_bearer(&alice.token)
        .await
        .json();
    assert!(beyond.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_and_oversized_text_rejected() {
    let app = TestApp::new();
    let alice = app.user();
    let chat_id = app.create_chat(&alice, json!({ "type": "group", "name": "g" })).await;
    let url = format!("/api/v1/chats/{chat_id}/messages");

    for text in [String::new(), "   ".to_owned(), "x".repeat(4001)] {
        app.server
            .post(&url)
            .authorization_bearer(&alice.token)
            .json(&json!({ "text": text }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_channel_viewers_cannot_post() {
    let app = TestApp::new();
    let owner = app.user();
    let reader = app.user();
    let outsider = app.user();
    let chat_id = app
        .create_chat(&owner, json!({ "type": "channel", "name": "news", "member_ids": [reader.id] }))
        .await;
    let url = format!("/api/v1/chats/{chat_id}/messages");

    app.server
        .post(&url)
        .authorization_bearer(&reader.token)
        .json(&json!({ "text": "hello?" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .post(&url)
        .authorization_bearer(&outsider.token)
        .json(&json!({ "text": "hello?" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    // Viewers can still read
    app.server
        .get(&url)
        .authorization_bearer(&reader.token)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_end_to_end_fan_out() {
    let app = TestApp::new();
    let alice = app.user();
    let bob = app.user();
    let chat_id = app
        .create_chat(&alice, json!({ "type": "group", "name": "g", "member_ids": [bob.id] }))
        .await;
    let other_id = app.create_chat(&alice, json!({ "type": "group", "name": "other" })).await;

    let chat: Uuid = chat_id.parse().unwrap();
    let other: Uuid = other_id.parse().unwrap();
    let mut bob_listener = app.state.registry.register(chat, bob.id);
    let mut alice_listener = app.state.registry.register(chat, alice.id);
    let mut bystander = app.state.registry.register(other, alice.id);

    let posted: Value = app
        .server
        .post(&format!("/api/v1/chats/{chat_id}/messages"))
        .authorization_bearer(&bob.token)
        .json(&json!({ "text": "hi all" }))
        .await
        .json();

    let received = bob_listener.try_recv().expect("listener got the message");
    assert_eq!(received.id.to_string(), posted["id"].as_str().unwrap());
    assert_eq!(received.text, "hi all");
    assert_eq!(alice_listener.try_recv().unwrap().id, received.id);
    assert!(bystander.try_recv().is_none());
    assert_eq!(app.state.registry.listener_count(chat), 2);

    drop(bob_listener);
    assert_eq!(app.state.registry.listener_count(chat), 1);
}

#[tokio::test]
async fn test_echo_to_sender_disabled() {
    let app = TestApp::with_overrides(&[("delivery.echo_to_sender", "false")]);
    let alice = app.user();
    let bob = app.user();
    let chat_id = app
        .create_chat(&alice, json!({ "type": "group", "name": "g", "member_ids": [bob.id] }))
        .await;
    let chat: Uuid = chat_id.parse().unwrap();
    let mut own = app.state.registry.register(chat, alice.id);
    let mut peer = app.state.registry.register(chat, bob.id);

    app.server
        .post(&format!("/api/v1/chats/{chat_id}/messages"))
        .authorization_bearer(&alice.token)
        .json(&json!({ "text": "quiet" }))
        .await
        .assert_status(StatusCode::CREATED);

    assert!(own.try_recv().is_none());
    assert_eq!(peer.try_recv().unwrap().text, "quiet");
}

#[tokio::test]
async fn test_store_outage_is_retryable_and_not_broadcast() {
    let app = TestApp::new();
    let alice = app.user();
    let chat_id = app.create_chat(&alice, json!({ "type": "group", "name": "g" })).await;
    let mut listener = app.state.registry.register(chat_id.parse().unwrap(), alice.id);

    app.store.set_down(true);
    let response = app
        .server
        .post(&format!("/api/v1/chats/{chat_id}/messages"))
        .authorization_bearer(&alice.token)
        .json(&json!({ "text": "lost" }))
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.header("retry-after"), "1");
    assert_eq!(response.json::<Value>()["code"], 10008);
    assert!(listener.try_recv().is_none());

    app.store.set_down(false);
    app.server
        .post(&format!("/api/v1/chats/{chat_id}/messages"))
        .authorization_bearer(&alice.token)
        .json(&json!({ "text": "back" }))
        .await
        .assert_status(StatusCode::CREATED);
    assert_eq!(listener.try_recv().unwrap().text, "back");
}

#[tokio::test]
async fn test_post_abandoned_during_slow_commit_is_still_broadcast() {
    let app = TestApp::new();
    let alice = app.user();
    let chat_id = app.create_chat(&alice, json!({ "type": "group", "name": "g" })).await;
    let chat: Uuid = chat_id.parse().unwrap();
    let mut listener = app.state.registry.register(chat, alice.id);

    app.store.set_append_delay(Duration::from_millis(200));
    let abandoned = tokio::time::timeout(
        Duration::from_millis(20),
        app.state.dispatcher.post_message(alice.id, chat, "slow"),
    )
    .await;
    assert!(abandoned.is_err());

    let delivered = tokio::time::timeout(Duration::from_secs(2), listener.recv())
        .await
        .expect("broadcast after the commit")
        .unwrap();
    assert_eq!(delivered.text, "slow");

    for _ in 0..50 {
        if app.state.dispatcher.writes_in_flight() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(app.state.dispatcher.writes_in_flight(), 0);

    app.store.set_append_delay(Duration::ZERO);
    let history: Value = app
        .server
        .get(&format!("/api/v1/chats/{chat_id}/messages"))
        .authorization_bearer(&alice.token)
        .await
        .json();
    assert_eq!(texts(&history), vec!["slow"]);
}

#[tokio::test]
async fn test_stream_requires_membership() {
    let app = TestApp::new();
    let alice = app.user();
    let mallory = app.user();
    let chat_id = app.create_chat(&alice, json!({ "type": "group", "name": "g" })).await;

    // Membership is checked before the upgrade is attempted
    app.server
        .get(&format!("/api/v1/chats/{chat_id}/stream"))
        .authorization_bearer(&mallory.token)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    // A member passes the check and only then fails on the missing upgrade headers
    let response = app
        .server
        .get(&format!("/api/v1/chats/{chat_id}/stream"))
        .authorization_bearer(&alice.token)
        .await;
    assert!(response.status_code().is_client_error());
    assert_ne!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(app.state.registry.total_listeners(), 0);
}
