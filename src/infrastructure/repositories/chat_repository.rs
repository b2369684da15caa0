//! Chat Repository Implementation
//!
//! PostgreSQL implementation of the ChatRepository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::message_repository::insert_message;
use super::{corrupt_column, PgChatStore};
use crate::domain::{Chat, ChatId, ChatRepository, ChatType, Membership, Message};
use crate::shared::error::AppError;

/// Database row representation of the chats table.
#[derive(Debug, sqlx::FromRow)]
struct ChatRow {
    id: Uuid,
    chat_type: i16,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
}

impl ChatRow {
    fn into_chat(self) -> Result<Chat, AppError> {
        let chat_type =
            ChatType::from_i16(self.chat_type).ok_or_else(|| corrupt_column("chat_type", self.chat_type))?;

        Ok(Chat {
            id: self.id,
            chat_type,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl ChatRepository for PgChatStore {
    async fn get_chat(&self, user_id: Uuid, chat_id: ChatId) -> Result<Option<Chat>, AppError> {
        let row = sqlx::query_as::<_, ChatRow>(
            r#"
            SELECT c.id, c.chat_type, c.name, c.description, c.created_at
            FROM chats c
            INNER JOIN chat_members m ON m.chat_id = c.id
            WHERE c.id = $1 AND m.user_id = $2
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        row.map(ChatRow::into_chat).transpose()
    }

    async fn get_chats(&self, user_id: Uuid) -> Result<Vec<Chat>, AppError> {
        let rows = sqlx::query_as::<_, ChatRow>(
            r#"
            SELECT c.id, c.chat_type, c.name, c.description, c.created_at
            FROM chats c
            INNER JOIN chat_members m ON m.chat_id = c.id
            WHERE m.user_id = $1
            ORDER BY c.created_at DESC, c.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(ChatRow::into_chat).collect()
    }

    async fn create_chat(
        &self,
        chat: &Chat,
        members: &[Membership],
        notices: &[Message],
    ) -> Result<(), AppError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            r#"
            INSERT INTO chats (id, chat_type, name, description, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(chat.id)
        .bind(chat.chat_type.as_i16())
        .bind(&chat.name)
        .bind(&chat.description)
        .bind(chat.created_at)
        .execute(&mut *tx)
        .await?;

        for member in members {
            sqlx::query(
                r#"
                INSERT INTO chat_members (chat_id, user_id, role, joined_at)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(member.chat_id)
            .bind(member.user_id)
            .bind(member.role.as_i16())
            .bind(member.joined_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                    AppError::Conflict("Duplicate member in new chat".to_string())
                }
                _ => AppError::Database(e),
            })?;
        }

        for notice in notices {
            insert_message(&mut tx, notice).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update_chat(&self, chat: &Chat) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE chats
            SET name = $2, description = $3
            WHERE id = $1
            "#,
        )
        .bind(chat.id)
        .bind(&chat.name)
        .bind(&chat.description)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Chat not found".to_string()));
        }

        Ok(())
    }
}
