//! Repository Implementations
//!
//! PostgreSQL implementation of the domain store traits.
//!
//! A single [`PgChatStore`] implements every repository trait the chat core
//! consumes. The implementations are split per entity:
//!
//! - **chat_repository** - chats, created together with their first members
//! - **membership_repository** - roles and member addition
//! - **message_repository** - history paging and appends
//! - **user_repository** - display-name lookups against `users`
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chat_delivery::domain::ChatStore;
//! use chat_delivery::infrastructure::repositories::PgChatStore;
//!
//! let store: Arc<dyn ChatStore> = Arc::new(PgChatStore::new(pool));
//! ```

mod chat_repository;
mod membership_repository;
mod message_repository;
mod user_repository;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::ChatStore;
use crate::shared::error::AppError;

/// PostgreSQL-backed chat store.
#[derive(Clone)]
pub struct PgChatStore {
    pool: PgPool,
}

impl PgChatStore {
    /// Create a new store over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ChatStore for PgChatStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Error for a stored discriminant that no enum variant matches.
fn corrupt_column(column: &str, value: i16) -> AppError {
    AppError::Internal(format!("Unexpected value {} in column {}", value, column))
}
