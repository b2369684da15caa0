//! Common Test Utilities
//!
//! A fully wired application on the in-memory store, with JWT identities
//! and switches to simulate a storage outage or a slow commit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum_test::TestServer;
use fake::{faker::internet::en::Username, Fake};
use uuid::Uuid;

use chat_delivery::config::Settings;
use chat_delivery::domain::{
    Chat, ChatId, ChatRepository, ChatStore, MemberRole, Membership, MembershipRepository, Message,
    MessageRepository, UserDirectory, UserId,
};
use chat_delivery::infrastructure::identity::JwtIdentityProvider;
use chat_delivery::infrastructure::memory::InMemoryChatStore;
use chat_delivery::shared::error::AppError;
use chat_delivery::startup::{build_router, AppState};

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";

/// In-memory store that fails every call while `down` is set
#[derive(Default)]
pub struct OutageStore {
    inner: InMemoryChatStore,
    down: AtomicBool,
    append_delay_ms: AtomicU64,
}

impl OutageStore {
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Hold every message append for `delay` after it has been committed
    pub fn set_append_delay(&self, delay: Duration) {
        self.append_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn register_user(&self, user_id: UserId, name: &str) {
        self.inner.register_user(user_id, name);
    }

    fn check(&self) -> Result<(), AppError> {
        if self.down.load(Ordering::SeqCst) {
            Err(AppError::Unavailable("simulated outage".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ChatRepository for OutageStore {
    async fn get_chat(&self, user_id: Uuid, chat_id: ChatId) -> Result<Option<Chat>, AppError> {
        self.check()?;
        self.inner.get_chat(user_id, chat_id).await
    }

    async fn get_chats(&self, user_id: Uuid) -> Result<Vec<Chat>, AppError> {
        self.check()?;
        self.inner.get_chats(user_id).await
    }

    async fn create_chat(
        &self,
        chat: &Chat,
        members: &[Membership],
        notices: &[Message],
    ) -> Result<(), AppError> {
        self.check()?;
        self.inner.create_chat(chat, members, notices).await
    }

    async fn update_chat(&self, chat: &Chat) -> Result<(), AppError> {
        self.check()?;
        self.inner.update_chat(chat).await
    }
}

#[async_trait]
impl MembershipRepository for OutageStore {
    async fn get_users_of_chat(&self, chat_id: ChatId) -> Result<Vec<Membership>, AppError> {
        self.check()?;
        self.inner.get_users_of_chat(chat_id).await
    }

    async fn get_user_membership(
        &self,
        user_id: Uuid,
        chat_id: ChatId,
    ) -> Result<Option<Membership>, AppError> {
        self.check()?;
        self.inner.get_user_membership(user_id, chat_id).await
    }

    async fn get_memberships_of_user(&self, user_id: Uuid) -> Result<Vec<Membership>, AppError> {
        self.check()?;
        self.inner.get_memberships_of_user(user_id).await
    }

    async fn add_member(&self, membership: &Membership, notice: &Message) -> Result<bool, AppError> {
        self.check()?;
        self.inner.add_member(membership, notice).await
    }

    async fn set_member_role(
        &self,
        chat_id: ChatId,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<bool, AppError> {
        self.check()?;
        self.inner.set_member_role(chat_id, user_id, role).await
    }

    async fn count_admins(&self, chat_id: ChatId) -> Result<i64, AppError> {
        self.check()?;
        self.inner.count_admins(chat_id).await
    }
}

#[async_trait]
impl MessageRepository for OutageStore {
    async fn get_messages(
        &self,
        chat_id: ChatId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>, AppError> {
        self.check()?;
        self.inner.get_messages(chat_id, limit, offset).await
    }

    async fn get_last_message_per_chat(
        &self,
        user_id: Uuid,
    ) -> Result<HashMap<ChatId, Message>, AppError> {
        self.check()?;
        self.inner.get_last_message_per_chat(user_id).await
    }

    async fn append_message(&self, message: &Message) -> Result<(), AppError> {
        self.check()?;
        self.inner.append_message(message).await?;

        let delay = self.append_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for OutageStore {
    async fn display_names(&self, user_ids: &[UserId]) -> Result<HashMap<UserId, String>, AppError> {
        self.check()?;
        self.inner.display_names(user_ids).await
    }
}

#[async_trait]
impl ChatStore for OutageStore {
    async fn ping(&self) -> Result<(), AppError> {
        self.check()?;
        self.inner.ping().await
    }
}

/// A registered user with a valid bearer token
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: UserId,
    pub name: String,
    pub token: String,
}

/// Test application
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub store: Arc<OutageStore>,
    identity: Arc<JwtIdentityProvider>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_overrides(&[])
    }

    /// Build with extra config overrides on top of the test defaults
    pub fn with_overrides(overrides: &[(&str, &str)]) -> Self {
        Self::build(overrides, false)
    }

    /// Serve over a real local socket, needed for WebSocket streams
    pub fn with_http_transport() -> Self {
        Self::build(&[], true)
    }

    fn build(overrides: &[(&str, &str)], http_transport: bool) -> Self {
        let mut all = vec![("storage.backend", "memory"), ("jwt.secret", TEST_SECRET)];
        all.extend_from_slice(overrides);
        let settings = Settings::from_overrides(&all).expect("test settings");

        let store = Arc::new(OutageStore::default());
        let identity = Arc::new(JwtIdentityProvider::new(TEST_SECRET));
        let state = AppState::new(store.clone(), identity.clone(), None, settings);
        let router = build_router(state.clone());
        let server = if http_transport {
            TestServer::builder().http_transport().build(router)
        } else {
            TestServer::new(router)
        }
        .expect("test server");

        Self {
            server,
            state,
            store,
            identity,
        }
    }

    /// Register a user with a random name and issue them a token
    pub fn user(&self) -> TestUser {
        let id = Uuid::new_v4();
        let name: String = Username().fake();
        self.store.register_user(id, &name);
        TestUser {
            id,
            name,
            token: self.token_for(id),
        }
    }

    pub fn token_for(&self, user_id: UserId) -> String {
        self.identity
            .issue(user_id, chrono::Duration::hours(1))
            .expect("issue token")
    }

    /// Create a chat over HTTP and return its id
    pub async fn create_chat(&self, creator: &TestUser, body: serde_json::Value) -> String {
        let response = self
            .server
            .post("/api/v1/chats")
            .authorization_bearer(&creator.token)
            .json(&body)
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<serde_json::Value>()["chat"]["id"]
            .as_str()
            .expect("chat id")
            .to_owned()
    }
}
