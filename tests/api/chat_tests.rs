//! Chat API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::TestApp;

#[tokio::test]
async fn test_create_group_seeds_members_and_notices() {
    let app = TestApp::new();
    let alice = app.user();
    let bob = app.user();

    let response = app
        .server
        .post("/api/v1/chats")
        .authorization_bearer(&alice.token)
        .json(&json!({ "type": "group", "name": "  Team  ", "member_ids": [bob.id] }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    assert_eq!(body["chat"]["name"], "Team");
    assert_eq!(body["chat"]["type"], "group");
    let roles: Vec<(String, String)> = body["members"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| (m["user_id"].as_str().unwrap().to_owned(), m["role"].as_str().unwrap().to_owned()))
        .collect();
    assert_eq!(
        roles,
        vec![
            (alice.id.to_string(), "admin".to_owned()),
            (bob.id.to_string(), "member".to_owned()),
        ]
    );

    let chat_id = body["chat"]["id"].as_str().unwrap();
    let history: Value = app
        .server
        .get(&format!("/api/v1/chats/{chat_id}/messages"))
        .authorization_bearer(&bob.token)
        .await
        .json();
    let texts: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts.len(), 2);
    assert!(texts.contains(&format!("{} joined the chat", alice.name).as_str()));
    assert!(texts.contains(&format!("{} joined the chat", bob.name).as_str()));
    assert!(history
        .as_array()
        .unwrap()
        .iter()
        .all(|m| m["kind"] == "system_message"));
}

#[tokio::test]
async fn test_list_chats_orders_by_activity() {
    let app = TestApp::new();
    let alice = app.user();
    let first = app.create_chat(&alice, json!({ "type": "group", "name": "first" })).await;
    let second = app.create_chat(&alice, json!({ "type": "group", "name": "second" })).await;

    app.server
        .post(&format!("/api/v1/chats/{first}/messages"))
        .authorization_bearer(&alice.token)
        .json(&json!({ "text": "bump" }))
        .await
        .assert_status(StatusCode::CREATED);

    let list: Value = app
        .server
        .get("/api/v1/chats")
        .authorization_bearer(&alice.token)
        .await
        .json();
    let ids: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();

    assert_eq!(ids, vec![first.as_str(), second.as_str()]);
    assert_eq!(list[0]["last_message"]["text"], "bump");
    assert_eq!(list[0]["role"], "admin");
}

#[tokio::test]
async fn test_chat_detail_hidden_from_non_members() {
    let app = TestApp::new();
    let alice = app.user();
    let mallory = app.user();
    let chat_id = app.create_chat(&alice, json!({ "type": "group", "name": "secret" })).await;

    app.server
        .get(&format!("/api/v1/chats/{chat_id}"))
        .authorization_bearer(&mallory.token)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    app.server
        .get(&format!("/api/v1/chats/{chat_id}/messages"))
        .authorization_bearer(&mallory.token)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    app.server
        .get("/api/v1/chats/not-a-uuid")
        .authorization_bearer(&alice.token)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_detail_flags_and_paging() {
    let app = TestApp::new();
    let alice = app.user();
    let chat_id = app.create_chat(&alice, json!({ "type": "channel", "name": "news" })).await;

    let detail: Value = app
        .server
        .get(&format!("/api/v1/chats/{chat_id}"))
        .add_query_param("limit", 500)
        .authorization_bearer(&alice.token)
        .await
        .json();

    assert_eq!(detail["chat"]["type"], "channel");
    assert_eq!(detail["is_admin"], true);
    assert_eq!(detail["can_write"], true);
    assert_eq!(detail["is_member"], true);
    assert_eq!(detail["is_private"], false);
    assert_eq!(detail["limit"], 100);
    assert_eq!(detail["members"][0]["display_name"], alice.name.as_str());
}

#[tokio::test]
async fn test_dialog_without_name() {
    let app = TestApp::new();
    let alice = app.user();
    let bob = app.user();

    let response = app
        .server
        .post("/api/v1/chats")
        .authorization_bearer(&alice.token)
        .json(&json!({ "type": "dialog", "member_ids": [bob.id] }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    assert_eq!(body["members"][0]["role"], "member");
    assert_eq!(body["members"][1]["role"], "member");

    app.server
        .post("/api/v1/chats")
        .authorization_bearer(&alice.token)
        .json(&json!({ "type": "dialog", "member_ids": [] }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_group_requires_name() {
    let app = TestApp::new();
    let alice = app.user();

    app.server
        .post("/api/v1/chats")
        .authorization_bearer(&alice.token)
        .json(&json!({ "type": "group", "name": "   " }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_add_member_permissions_and_duplicates() {
    let app = TestApp::new();
    let alice = app.user();
    let bob = app.user();
    let carol = app.user();
    let chat_id = app.create_chat(&alice, json!({ "type": "group", "name": "team" })).await;
    let members_url = format!("/api/v1/chats/{chat_id}/members");

    let response = app
        .server
        .post(&members_url)
        .authorization_bearer(&alice.token)
        .json(&json!({ "user_id": bob.id }))
        .await;
    response.assert_status(StatusCode::CREATED);
    assert_eq!(response.json::<Value>()["role"], "member");

    app.server
        .post(&members_url)
        .authorization_bearer(&alice.token)
        .json(&json!({ "user_id": bob.id }))
        .await
        .assert_status(StatusCode::CONFLICT);

    // Members are not admins
    app.server
        .post(&members_url)
        .authorization_bearer(&bob.token)
        .json(&json!({ "user_id": carol.id }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_last_admin_cannot_be_demoted() {
    let app = TestApp::new();
    let alice = app.user();
    let bob = app.user();
    let chat_id = app
        .create_chat(&alice, json!({ "type": "group", "name": "team", "member_ids": [bob.id] }))
        .await;

    app.server
        .patch(&format!("/api/v1/chats/{chat_id}/members/{}", alice.id))
        .authorization_bearer(&alice.token)
        .json(&json!({ "role": "member" }))
        .await
        .assert_status(StatusCode::CONFLICT);

    let promoted = app
        .server
        .patch(&format!("/api/v1/chats/{chat_id}/members/{}", bob.id))
        .authorization_bearer(&alice.token)
        .json(&json!({ "role": "admin" }))
        .await;
    promoted.assert_status_ok();
    assert_eq!(promoted.json::<Value>()["role"], "admin");

    app.server
        .patch(&format!("/api/v1/chats/{chat_id}/members/{}", alice.id))
        .authorization_bearer(&alice.token)
        .json(&json!({ "role": "member" }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_update_chat_by_admin_only() {
    let app = TestApp::new();
    let alice = app.user();
    let bob = app.user();
    let chat_id = app
        .create_chat(&alice, json!({ "type": "group", "name": "old", "member_ids": [bob.id] }))
        .await;

    let response = app
        .server
        .patch(&format!("/api/v1/chats/{chat_id}"))
        .authorization_bearer(&alice.token)
        .json(&json!({ "name": "new", "description": "about" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["name"], "new");
    assert_eq!(body["description"], "about");

    app.server
        .patch(&format!("/api/v1/chats/{chat_id}"))
        .authorization_bearer(&bob.token)
        .json(&json!({ "name": "hijack" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_requests_without_credentials_rejected() {
    let app = TestApp::new();
    let alice = app.user();

    app.server
        .get("/api/v1/chats")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    app.server
        .get("/api/v1/chats")
        .authorization_bearer("garbage")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    // Query tokens are only honored on WebSocket upgrades
    app.server
        .get("/api/v1/chats")
        .add_query_param("token", &alice.token)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}
