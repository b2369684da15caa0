//! Message entity and repository trait.
//!
//! Maps to the `messages` table in the database schema.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chat::ChatId;
use crate::shared::error::AppError;

/// Maximum message length in characters.
pub const MAX_MESSAGE_LENGTH: usize = 4000;

/// Message kinds. Stored as `SMALLINT` by discriminant; JSON uses the snake_case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum MessageKind {
    /// Text written by a user
    #[default]
    UserMessage = 0,
    /// Synthesized by the server, e.g. a join notice
    SystemMessage = 1,
}

impl MessageKind {
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(Self::UserMessage),
            1 => Some(Self::SystemMessage),
            _ => None,
        }
    }

    pub fn as_i16(self) -> i16 {
        self as i16
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserMessage => "user",
            Self::SystemMessage => "system",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents a message in a chat.
///
/// Maps to the `messages` table:
/// - id: UUID PRIMARY KEY (v7, time ordered)
/// - chat_id: UUID NOT NULL REFERENCES chats(id)
/// - author_id: UUID NOT NULL
/// - body: TEXT NOT NULL
/// - kind: SMALLINT NOT NULL DEFAULT 0
/// - created_at: TIMESTAMPTZ NOT NULL
///
/// Messages are immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,

    pub chat_id: ChatId,

    /// Author, or for system messages the user that triggered it
    pub author_id: Uuid,

    pub text: String,

    pub kind: MessageKind,

    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Build a user-authored message stamped with the current time.
    pub fn user(chat_id: ChatId, author_id: Uuid, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            chat_id,
            author_id,
            text: text.into(),
            kind: MessageKind::UserMessage,
            created_at: Utc::now(),
        }
    }

    /// Build a system message triggered by `user_id`.
    pub fn system(chat_id: ChatId, user_id: Uuid, text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::SystemMessage,
            ..Self::user(chat_id, user_id, text)
        }
    }

    pub fn is_system(&self) -> bool {
        self.kind == MessageKind::SystemMessage
    }
}

/// Repository trait for Message data access operations.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Page through a chat's history, newest first.
    ///
    /// Skips the `offset` most recent messages and returns up to `limit`
    /// of the ones after them. Running past the end yields fewer (or zero)
    /// messages.
    async fn get_messages(
        &self,
        chat_id: ChatId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>, AppError>;

    /// Latest message of every chat the user belongs to.
    ///
    /// Chats without messages are absent from the map.
    async fn get_last_message_per_chat(
        &self,
        user_id: Uuid,
    ) -> Result<HashMap<ChatId, Message>, AppError>;

    /// Persist a new message.
    async fn append_message(&self, message: &Message) -> Result<(), AppError>;
}
