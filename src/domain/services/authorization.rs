//! Chat authorization domain service.
//!
//! Decisions are a pure function of the requesting user's role in the chat.
//! The store-backed [`ChatAuthorization`] re-reads the membership on every
//! call, so a role change is visible to the next check.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::entities::{ChatId, MemberRole, MembershipRepository};
use crate::shared::error::AppError;

/// Actions gated by chat membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatAction {
    /// View metadata, members and history; subscribe to the live stream
    Read,
    /// Post messages
    Write,
    /// Add members, change roles, edit chat metadata
    ManageMembers,
}

impl MemberRole {
    /// Whether this role may perform `action`.
    pub fn allows(self, action: ChatAction) -> bool {
        match self {
            MemberRole::Admin => true,
            MemberRole::Member => !matches!(action, ChatAction::ManageMembers),
            MemberRole::Viewer => matches!(action, ChatAction::Read),
        }
    }
}

/// Decide an action for a user with `role` (`None` = not a member).
pub fn is_allowed(role: Option<MemberRole>, action: ChatAction) -> bool {
    role.is_some_and(|role| role.allows(action))
}

/// Capabilities of one user in one chat, derived from a single membership read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatPermissions {
    pub role: Option<MemberRole>,
}

impl ChatPermissions {
    pub fn is_member(&self) -> bool {
        self.role.is_some()
    }

    pub fn can_read(&self) -> bool {
        is_allowed(self.role, ChatAction::Read)
    }

    pub fn can_write(&self) -> bool {
        is_allowed(self.role, ChatAction::Write)
    }

    pub fn can_manage_members(&self) -> bool {
        is_allowed(self.role, ChatAction::ManageMembers)
    }
}

/// Store-backed authorization engine.
pub struct ChatAuthorization<S: ?Sized> {
    store: Arc<S>,
}

impl<S> ChatAuthorization<S>
where
    S: MembershipRepository + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Load the user's current permissions in a chat.
    pub async fn permissions(&self, user_id: Uuid, chat_id: ChatId) -> Result<ChatPermissions, AppError> {
        let role = self
            .store
            .get_user_membership(user_id, chat_id)
            .await?
            .map(|membership| membership.role);

        Ok(ChatPermissions { role })
    }

    pub async fn can_read(&self, user_id: Uuid, chat_id: ChatId) -> Result<bool, AppError> {
        Ok(self.permissions(user_id, chat_id).await?.can_read())
    }

    pub async fn can_write(&self, user_id: Uuid, chat_id: ChatId) -> Result<bool, AppError> {
        Ok(self.permissions(user_id, chat_id).await?.can_write())
    }

    pub async fn can_manage_members(&self, user_id: Uuid, chat_id: ChatId) -> Result<bool, AppError> {
        Ok(self.permissions(user_id, chat_id).await?.can_manage_members())
    }
}

impl<S: ?Sized> Clone for ChatAuthorization<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}
