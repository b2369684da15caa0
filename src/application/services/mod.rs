//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **MessageDispatcher**: validate, authorize, persist and broadcast messages
//! - **ChatAssemblyService**: chat list and chat detail read models
//! - **ChatService**: chat creation, membership and metadata management

mod chat_assembly;
mod chat_service;
mod error;
mod message_dispatcher;

pub use chat_assembly::{ChatAssemblyService, ChatDetail, ChatSummary, MemberView, Page};
pub use chat_service::{
    ChatService, CreateChatDto, UpdateChatDto, MAX_CHAT_DESCRIPTION_LENGTH, MAX_CHAT_NAME_LENGTH,
};
pub use error::ChatError;
pub use message_dispatcher::MessageDispatcher;
