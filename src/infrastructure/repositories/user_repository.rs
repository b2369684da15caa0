//! User Directory Implementation
//!
//! Read-only display-name lookups against the `users` table, which is owned
//! by the account subsystem.

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use super::PgChatStore;
use crate::domain::{UserDirectory, UserId};
use crate::shared::error::AppError;

#[async_trait]
impl UserDirectory for PgChatStore {
    async fn display_names(&self, user_ids: &[UserId]) -> Result<HashMap<UserId, String>, AppError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, (Uuid, String)>(
            r#"
            SELECT id, username FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(user_ids)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().collect())
    }
}
