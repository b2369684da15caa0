//! Message Repository Implementation
//!
//! PostgreSQL implementation of message history. Messages within a chat are
//! ordered by `(created_at, id)`; pages are read newest first using
//! `LIMIT`/`OFFSET` over the `idx_messages_chat_recent` index.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use super::{corrupt_column, PgChatStore};
use crate::domain::{ChatId, Message, MessageKind, MessageRepository};
use crate::shared::error::AppError;

/// Internal row type for message queries.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    chat_id: Uuid,
    author_id: Uuid,
    body: String,
    kind: i16,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    fn into_message(self) -> Result<Message, AppError> {
        let kind = MessageKind::from_i16(self.kind).ok_or_else(|| corrupt_column("kind", self.kind))?;

        Ok(Message {
            id: self.id,
            chat_id: self.chat_id,
            author_id: self.author_id,
            text: self.body,
            kind,
            created_at: self.created_at,
        })
    }
}

/// Insert a message on an existing connection or transaction.
pub(super) async fn insert_message(conn: &mut PgConnection, message: &Message) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO messages (id, chat_id, author_id, body, kind, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(message.id)
    .bind(message.chat_id)
    .bind(message.author_id)
    .bind(&message.text)
    .bind(message.kind.as_i16())
    .bind(message.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

#[async_trait]
impl MessageRepository for PgChatStore {
    async fn get_messages(
        &self,
        chat_id: ChatId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>, AppError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, chat_id, author_id, body, kind, created_at
            FROM messages
            WHERE chat_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(chat_id)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(MessageRow::into_message).collect()
    }

    async fn get_last_message_per_chat(
        &self,
        user_id: Uuid,
    ) -> Result<HashMap<ChatId, Message>, AppError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT DISTINCT ON (msg.chat_id)
                   msg.id, msg.chat_id, msg.author_id, msg.body, msg.kind, msg.created_at
            FROM messages msg
            INNER JOIN chat_members m ON m.chat_id = msg.chat_id
            WHERE m.user_id = $1
            ORDER BY msg.chat_id, msg.created_at DESC, msg.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter()
            .map(|row| row.into_message().map(|message| (message.chat_id, message)))
            .collect()
    }

    async fn append_message(&self, message: &Message) -> Result<(), AppError> {
        let mut conn = self.pool().acquire().await?;
        insert_message(&mut conn, message).await
    }
}
