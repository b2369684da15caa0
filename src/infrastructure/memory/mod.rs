//! In-process chat store.
//!
//! Keeps everything in one `RwLock`-guarded state so multi-record writes
//! (chat creation, member addition) are atomic. Contents are lost when the
//! process exits; used by the `memory` storage backend and by tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::domain::{
    Chat, ChatId, ChatRepository, ChatStore, MemberRole, Membership, MembershipRepository, Message,
    MessageRepository, UserDirectory, UserId,
};
use crate::shared::error::AppError;

#[derive(Default)]
struct State {
    chats: HashMap<ChatId, Chat>,
    /// Per chat, in join order
    members: HashMap<ChatId, Vec<Membership>>,
    /// Per chat, oldest first by `(created_at, id)`
    messages: HashMap<ChatId, Vec<Message>>,
    users: HashMap<UserId, String>,
}

impl State {
    fn membership(&self, user_id: Uuid, chat_id: ChatId) -> Option<&Membership> {
        self.members
            .get(&chat_id)?
            .iter()
            .find(|m| m.user_id == user_id)
    }

    fn is_member(&self, user_id: Uuid, chat_id: ChatId) -> bool {
        self.membership(user_id, chat_id).is_some()
    }

    fn push_message(&mut self, message: Message) {
        let history = self.messages.entry(message.chat_id).or_default();
        let key = (message.created_at, message.id);
        let at = history.partition_point(|m| (m.created_at, m.id) <= key);
        history.insert(at, message);
    }
}

/// Chat store held entirely in memory.
#[derive(Default)]
pub struct InMemoryChatStore {
    state: RwLock<State>,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a display name for a user.
    pub fn register_user(&self, user_id: UserId, name: impl Into<String>) {
        self.state.write().users.insert(user_id, name.into());
    }
}

#[async_trait]
impl ChatRepository for InMemoryChatStore {
    async fn get_chat(&self, user_id: Uuid, chat_id: ChatId) -> Result<Option<Chat>, AppError> {
        let state = self.state.read();
        if !state.is_member(user_id, chat_id) {
            return Ok(None);
        }
        Ok(state.chats.get(&chat_id).cloned())
    }

    async fn get_chats(&self, user_id: Uuid) -> Result<Vec<Chat>, AppError> {
        let state = self.state.read();
        let mut chats: Vec<Chat> = state
            .chats
            .values()
            .filter(|chat| state.is_member(user_id, chat.id))
            .cloned()
            .collect();
        chats.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(chats)
    }

    async fn create_chat(
        &self,
        chat: &Chat,
        members: &[Membership],
        notices: &[Message],
    ) -> Result<(), AppError> {
        let mut state = self.state.write();

        if state.chats.contains_key(&chat.id) {
            return Err(AppError::Conflict("Chat already exists".to_string()));
        }
        for (i, member) in members.iter().enumerate() {
            if members[..i].iter().any(|m| m.user_id == member.user_id) {
                return Err(AppError::Conflict("Duplicate member in new chat".to_string()));
            }
        }

        state.chats.insert(chat.id, chat.clone());
        state.members.insert(chat.id, members.to_vec());
        for notice in notices {
            state.push_message(notice.clone());
        }
        Ok(())
    }

    async fn update_chat(&self, chat: &Chat) -> Result<(), AppError> {
        let mut state = self.state.write();
        let stored = state
            .chats
            .get_mut(&chat.id)
            .ok_or_else(|| AppError::NotFound("Chat not found".to_string()))?;
        stored.name = chat.name.clone();
        stored.description = chat.description.clone();
        Ok(())
    }
}

#[async_trait]
impl MembershipRepository for InMemoryChatStore {
    async fn get_users_of_chat(&self, chat_id: ChatId) -> Result<Vec<Membership>, AppError> {
        Ok(self
            .state
            .read()
            .members
            .get(&chat_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_user_membership(
        &self,
        user_id: Uuid,
        chat_id: ChatId,
    ) -> Result<Option<Membership>, AppError> {
        Ok(self.state.read().membership(user_id, chat_id).cloned())
    }

    async fn get_memberships_of_user(&self, user_id: Uuid) -> Result<Vec<Membership>, AppError> {
        Ok(self
            .state
            .read()
            .members
            .values()
            .flatten()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn add_member(&self, membership: &Membership, notice: &Message) -> Result<bool, AppError> {
        let mut state = self.state.write();

        if !state.chats.contains_key(&membership.chat_id) {
            return Err(AppError::NotFound("Chat not found".to_string()));
        }
        if state.is_member(membership.user_id, membership.chat_id) {
            return Ok(false);
        }

        state
            .members
            .entry(membership.chat_id)
            .or_default()
            .push(membership.clone());
        state.push_message(notice.clone());
        Ok(true)
    }

    async fn set_member_role(
        &self,
        chat_id: ChatId,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<bool, AppError> {
        let mut state = self.state.write();
        let member = state
            .members
            .get_mut(&chat_id)
            .and_then(|members| members.iter_mut().find(|m| m.user_id == user_id));

        match member {
            Some(member) => {
                member.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_admins(&self, chat_id: ChatId) -> Result<i64, AppError> {
        let state = self.state.read();
        let admins = state
            .members
            .get(&chat_id)
            .map(|members| members.iter().filter(|m| m.is_admin()).count())
            .unwrap_or(0);
        Ok(admins as i64)
    }
}

#[async_trait]
impl MessageRepository for InMemoryChatStore {
    async fn get_messages(
        &self,
        chat_id: ChatId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>, AppError> {
        let state = self.state.read();
        let Some(history) = state.messages.get(&chat_id) else {
            return Ok(Vec::new());
        };

        Ok(history
            .iter()
            .rev()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn get_last_message_per_chat(
        &self,
        user_id: Uuid,
    ) -> Result<HashMap<ChatId, Message>, AppError> {
        let state = self.state.read();
        Ok(state
            .messages
            .iter()
            .filter(|(chat_id, _)| state.is_member(user_id, **chat_id))
            .filter_map(|(chat_id, history)| history.last().map(|m| (*chat_id, m.clone())))
            .collect())
    }

    async fn append_message(&self, message: &Message) -> Result<(), AppError> {
        let mut state = self.state.write();
        if !state.chats.contains_key(&message.chat_id) {
            return Err(AppError::NotFound("Chat not found".to_string()));
        }
        state.push_message(message.clone());
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for InMemoryChatStore {
    async fn display_names(&self, user_ids: &[UserId]) -> Result<HashMap<UserId, String>, AppError> {
        let state = self.state.read();
        Ok(user_ids
            .iter()
            .filter_map(|id| state.users.get(id).map(|name| (*id, name.clone())))
            .collect())
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
