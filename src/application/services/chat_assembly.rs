//! Chat Assembly Service
//!
//! Read-side composition of the chat list and chat detail views. Every read
//! is gated on the requester's current membership; a chat the requester
//! cannot see is reported as not found, whether or not it exists.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use super::error::ChatError;
use crate::config::HistorySettings;
use crate::domain::{
    display_name_or_id, Chat, ChatAuthorization, ChatId, ChatStore, MemberRole, Membership,
    Message, UserId,
};

/// A resolved history page: newest first, skipping `offset` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    /// Apply the configured default and clamp the limit to `[1, max_page_size]`.
    pub fn resolve(limit: Option<u32>, offset: Option<u32>, settings: &HistorySettings) -> Self {
        let max = settings.max_page_size.max(1);
        Self {
            limit: limit.unwrap_or(settings.default_page_size).clamp(1, max),
            offset: offset.unwrap_or(0),
        }
    }
}

/// One entry of a user's chat list.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSummary {
    pub chat: Chat,
    pub role: MemberRole,
    pub last_message: Option<Message>,
}

impl ChatSummary {
    /// Time of the latest message, or of creation for an empty chat.
    pub fn last_activity(&self) -> chrono::DateTime<chrono::Utc> {
        self.last_message
            .as_ref()
            .map_or(self.chat.created_at, |m| m.created_at)
    }
}

/// A chat member with their resolved display name.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberView {
    pub membership: Membership,
    pub display_name: String,
}

/// Everything a client needs to render one chat.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatDetail {
    pub chat: Chat,
    pub members: Vec<MemberView>,
    /// Newest first
    pub messages: Vec<Message>,
    pub page: Page,
    pub is_admin: bool,
    pub can_write: bool,
    pub is_member: bool,
    pub is_private: bool,
}

pub struct ChatAssemblyService {
    store: Arc<dyn ChatStore>,
    authorization: ChatAuthorization<dyn ChatStore>,
    history: HistorySettings,
}

impl ChatAssemblyService {
    pub fn new(store: Arc<dyn ChatStore>, history: HistorySettings) -> Self {
        Self {
            authorization: ChatAuthorization::new(Arc::clone(&store)),
            store,
            history,
        }
    }

    pub fn page(&self, limit: Option<u32>, offset: Option<u32>) -> Page {
        Page::resolve(limit, offset, &self.history)
    }

    /// Every chat the user belongs to, most recently active first.
    #[instrument(skip(self))]
    pub async fn list_chats_for_user(&self, user_id: UserId) -> Result<Vec<ChatSummary>, ChatError> {
        let chats = self.store.get_chats(user_id).await?;
        let mut last_messages = self.store.get_last_message_per_chat(user_id).await?;

        let roles: HashMap<ChatId, MemberRole> = self
            .store
            .get_memberships_of_user(user_id)
            .await?
            .into_iter()
            .map(|m| (m.chat_id, m.role))
            .collect();

        let mut summaries: Vec<ChatSummary> = chats
            .into_iter()
            // A membership removed between the two reads drops the chat
            .filter_map(|chat| {
                let role = *roles.get(&chat.id)?;
                Some(ChatSummary {
                    last_message: last_messages.remove(&chat.id),
                    role,
                    chat,
                })
            })
            .collect();

        summaries.sort_by(|a, b| {
            b.last_activity()
                .cmp(&a.last_activity())
                .then_with(|| b.chat.id.cmp(&a.chat.id))
        });
        Ok(summaries)
    }

    /// Chat metadata, members and one page of history.
    #[instrument(skip(self))]
    pub async fn get_chat_detail(
        &self,
        user_id: UserId,
        chat_id: ChatId,
        page: Page,
    ) -> Result<ChatDetail, ChatError> {
        let permissions = self.authorization.permissions(user_id, chat_id).await?;
        if !permissions.can_read() {
            return Err(ChatError::chat_not_found());
        }

        let chat = self
            .store
            .get_chat(user_id, chat_id)
            .await?
            .ok_or_else(ChatError::chat_not_found)?;

        let memberships = self.store.get_users_of_chat(chat_id).await?;
        let user_ids: Vec<UserId> = memberships.iter().map(|m| m.user_id).collect();
        let names = self.store.display_names(&user_ids).await?;
        let members = memberships
            .into_iter()
            .map(|membership| MemberView {
                display_name: display_name_or_id(&names, membership.user_id),
                membership,
            })
            .collect();

        let messages = self
            .store
            .get_messages(chat_id, page.limit, page.offset)
            .await?;

        Ok(ChatDetail {
            is_private: chat.is_private(),
            is_admin: permissions.can_manage_members(),
            can_write: permissions.can_write(),
            is_member: permissions.is_member(),
            chat,
            members,
            messages,
            page,
        })
    }

    /// One page of a chat's history, newest first.
    #[instrument(skip(self))]
    pub async fn get_messages(
        &self,
        user_id: UserId,
        chat_id: ChatId,
        page: Page,
    ) -> Result<Vec<Message>, ChatError> {
        self.ensure_readable(user_id, chat_id).await?;

        Ok(self
            .store
            .get_messages(chat_id, page.limit, page.offset)
            .await?)
    }

    /// `NotFound` unless the user may read the chat.
    pub async fn ensure_readable(&self, user_id: UserId, chat_id: ChatId) -> Result<(), ChatError> {
        if self.authorization.can_read(user_id, chat_id).await? {
            Ok(())
        } else {
            Err(ChatError::chat_not_found())
        }
    }
}
