//! # Domain Entities
//!
//! Core domain entities of the chat delivery service.
//! All persistent entities map directly to their corresponding database tables.
//!
//! - **Chat**: a conversation (channel, dialog or group)
//! - **Membership**: a user's role within a chat
//! - **Message**: an immutable message in a chat
//! - **User**: identity lookups consumed from the account subsystem
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access operations.
//! These traits are implemented in the infrastructure layer. `ChatStore` bundles
//! them into the single store the services depend on.

mod chat;
mod membership;
mod message;
mod user;

use async_trait::async_trait;

use crate::shared::error::AppError;

pub use chat::{Chat, ChatId, ChatRepository, ChatType};
pub use membership::{MemberRole, Membership, MembershipRepository};
pub use message::{Message, MessageKind, MessageRepository, MAX_MESSAGE_LENGTH};
pub use user::{display_name_or_id, IdentityProvider, UserDirectory, UserId};

/// Durable store for chats, memberships and message history.
#[async_trait]
pub trait ChatStore: ChatRepository + MembershipRepository + MessageRepository + UserDirectory {
    /// Check that the backing storage is reachable.
    async fn ping(&self) -> Result<(), AppError>;
}
