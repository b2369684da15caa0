//! Chat entity and repository trait.
//!
//! Maps to the `chats` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::membership::Membership;
use super::message::Message;
use crate::shared::error::AppError;

/// Chat identifier.
pub type ChatId = Uuid;

/// Chat types. Stored as `SMALLINT` by discriminant; JSON uses the snake_case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum ChatType {
    /// One-to-many broadcast chat; only admins post by default
    Channel = 0,
    /// Private one-to-one conversation
    Dialog = 1,
    /// Multi-user conversation
    Group = 2,
}

impl ChatType {
    /// Convert from the stored integer representation.
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(Self::Channel),
            1 => Some(Self::Dialog),
            2 => Some(Self::Group),
            _ => None,
        }
    }

    /// Stored integer representation.
    pub fn as_i16(self) -> i16 {
        self as i16
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::Dialog => "dialog",
            Self::Group => "group",
        }
    }

    /// Dialogs are private between their two participants.
    pub fn is_private(&self) -> bool {
        matches!(self, Self::Dialog)
    }
}

impl std::fmt::Display for ChatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents a chat.
///
/// Maps to the `chats` table:
/// - id: UUID PRIMARY KEY
/// - chat_type: SMALLINT NOT NULL (0 channel, 1 dialog, 2 group)
/// - name: VARCHAR(128) NOT NULL
/// - description: VARCHAR(512) NOT NULL DEFAULT ''
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,

    #[serde(rename = "type")]
    pub chat_type: ChatType,

    /// Display name
    pub name: String,

    pub description: String,

    pub created_at: DateTime<Utc>,
}

impl Chat {
    /// Create a new chat with a fresh identifier.
    pub fn new(chat_type: ChatType, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            chat_type,
            name: name.into(),
            description: description.into(),
            created_at: Utc::now(),
        }
    }

    pub fn is_private(&self) -> bool {
        self.chat_type.is_private()
    }
}

/// Repository trait for Chat data access operations.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Find a chat the given user is a member of.
    ///
    /// Returns `None` both when the chat does not exist and when the user
    /// has no membership in it.
    async fn get_chat(&self, user_id: Uuid, chat_id: ChatId) -> Result<Option<Chat>, AppError>;

    /// Find every chat the user is a member of.
    async fn get_chats(&self, user_id: Uuid) -> Result<Vec<Chat>, AppError>;

    /// Create a chat together with its initial members and their join notices.
    ///
    /// Either everything is stored or nothing is.
    async fn create_chat(
        &self,
        chat: &Chat,
        members: &[Membership],
        notices: &[Message],
    ) -> Result<(), AppError>;

    /// Update a chat's name and description.
    async fn update_chat(&self, chat: &Chat) -> Result<(), AppError>;
}
