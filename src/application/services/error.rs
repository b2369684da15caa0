//! Chat service errors.

use crate::shared::error::AppError;

/// Errors returned by the chat services.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] AppError),
}

impl ChatError {
    pub(crate) fn chat_not_found() -> Self {
        ChatError::NotFound("Chat not found".into())
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Validation(msg) => AppError::Validation(msg),
            ChatError::NotFound(msg) => AppError::NotFound(msg),
            ChatError::Forbidden(msg) => AppError::Forbidden(msg),
            ChatError::Conflict(msg) => AppError::Conflict(msg),
            ChatError::Store(err) => err,
        }
    }
}
