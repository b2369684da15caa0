//! Membership Repository Implementation
//!
//! PostgreSQL implementation of the MembershipRepository trait over the
//! `chat_members` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::message_repository::insert_message;
use super::{corrupt_column, PgChatStore};
use crate::domain::{ChatId, MemberRole, Membership, MembershipRepository, Message};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct MembershipRow {
    chat_id: Uuid,
    user_id: Uuid,
    role: i16,
    joined_at: DateTime<Utc>,
}

impl MembershipRow {
    fn into_membership(self) -> Result<Membership, AppError> {
        let role = MemberRole::from_i16(self.role).ok_or_else(|| corrupt_column("role", self.role))?;

        Ok(Membership {
            user_id: self.user_id,
            chat_id: self.chat_id,
            role,
            joined_at: self.joined_at,
        })
    }
}

#[async_trait]
impl MembershipRepository for PgChatStore {
    async fn get_users_of_chat(&self, chat_id: ChatId) -> Result<Vec<Membership>, AppError> {
        let rows = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT chat_id, user_id, role, joined_at
            FROM chat_members
            WHERE chat_id = $1
            ORDER BY joined_at ASC, user_id ASC
            "#,
        )
        .bind(chat_id)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(MembershipRow::into_membership).collect()
    }

    async fn get_user_membership(
        &self,
        user_id: Uuid,
        chat_id: ChatId,
    ) -> Result<Option<Membership>, AppError> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT chat_id, user_id, role, joined_at
            FROM chat_members
            WHERE chat_id = $1 AND user_id = $2
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        row.map(MembershipRow::into_membership).transpose()
    }

    async fn get_memberships_of_user(&self, user_id: Uuid) -> Result<Vec<Membership>, AppError> {
        let rows = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT chat_id, user_id, role, joined_at
            FROM chat_members
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(MembershipRow::into_membership).collect()
    }

    async fn add_member(&self, membership: &Membership, notice: &Message) -> Result<bool, AppError> {
        let mut tx = self.pool().begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO chat_members (chat_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (chat_id, user_id) DO NOTHING
            "#,
        )
        .bind(membership.chat_id)
        .bind(membership.user_id)
        .bind(membership.role.as_i16())
        .bind(membership.joined_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        insert_message(&mut tx, notice).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn set_member_role(
        &self,
        chat_id: ChatId,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE chat_members
            SET role = $3
            WHERE chat_id = $1 AND user_id = $2
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(role.as_i16())
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_admins(&self, chat_id: ChatId) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM chat_members
            WHERE chat_id = $1 AND role = $2
            "#,
        )
        .bind(chat_id)
        .bind(MemberRole::Admin.as_i16())
        .fetch_one(self.pool())
        .await?;

        Ok(count)
    }
}
