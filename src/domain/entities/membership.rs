//! Chat membership entity and repository trait.
//!
//! Maps to the `chat_members` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chat::ChatId;
use super::message::Message;
use crate::shared::error::AppError;

/// Role of a user within a chat. Stored as `SMALLINT` by discriminant; JSON uses the
/// snake_case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum MemberRole {
    /// Can write and manage members
    Admin = 0,
    /// Can write
    Member = 1,
    /// Read-only
    Viewer = 2,
}

impl MemberRole {
    /// Convert from the stored integer representation.
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(Self::Admin),
            1 => Some(Self::Member),
            2 => Some(Self::Viewer),
            _ => None,
        }
    }

    pub fn as_i16(self) -> i16 {
        self as i16
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Viewer => "viewer",
        }
    }
}

impl std::fmt::Display for MemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user's membership in a chat.
///
/// Maps to the `chat_members` table:
/// - chat_id: UUID NOT NULL REFERENCES chats(id) (composite PK)
/// - user_id: UUID NOT NULL (composite PK)
/// - role: SMALLINT NOT NULL
/// - joined_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: Uuid,
    pub chat_id: ChatId,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(user_id: Uuid, chat_id: ChatId, role: MemberRole) -> Self {
        Self {
            user_id,
            chat_id,
            role,
            joined_at: Utc::now(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == MemberRole::Admin
    }
}

/// Repository trait for membership data access operations.
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// List all memberships of a chat, oldest first.
    async fn get_users_of_chat(&self, chat_id: ChatId) -> Result<Vec<Membership>, AppError>;

    /// Find the membership of a user in a chat.
    async fn get_user_membership(
        &self,
        user_id: Uuid,
        chat_id: ChatId,
    ) -> Result<Option<Membership>, AppError>;

    /// List every membership a user holds, across all chats.
    async fn get_memberships_of_user(&self, user_id: Uuid) -> Result<Vec<Membership>, AppError>;

    /// Add a member and record their join notice in one transaction.
    ///
    /// Returns `false` without changing anything when the user is already
    /// a member of the chat.
    async fn add_member(&self, membership: &Membership, notice: &Message) -> Result<bool, AppError>;

    /// Change the role of an existing member.
    ///
    /// Returns `false` when no such membership exists.
    async fn set_member_role(
        &self,
        chat_id: ChatId,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<bool, AppError>;

    /// Count the admins of a chat.
    async fn count_admins(&self, chat_id: ChatId) -> Result<i64, AppError>;
}
