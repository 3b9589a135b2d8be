//! Conversation Repository Implementation
//!
//! PostgreSQL implementation of the pairwise conversation record.
//! Rows are keyed by the canonical `(user1_id, user2_id)` pair with
//! `user1_id < user2_id`, enforced by a unique constraint.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Conversation, ConversationKey, ConversationRepository, UserId};
use crate::shared::error::AppError;

/// PostgreSQL conversation repository implementation.
#[derive(Clone)]
pub struct PgConversationRepository {
    pool: PgPool,
}

impl PgConversationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_by_key(&self, key: ConversationKey) -> Result<Option<Conversation>, AppError> {
        let row = sqlx::query_as::<_, ConversationRow>(
            r#"
            SELECT id, user1_id, user2_id, last_message, updated_at
            FROM conversations
            WHERE user1_id = $1 AND user2_id = $2
            "#,
        )
        .bind(key.low().as_i64())
        .bind(key.high().as_i64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_conversation()))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ConversationRow {
    id: i64,
    user1_id: i64,
    user2_id: i64,
    last_message: String,
    updated_at: DateTime<Utc>,
}

impl ConversationRow {
    fn into_conversation(self) -> Conversation {
        Conversation {
            id: self.id,
            user1_id: UserId::new(self.user1_id),
            user2_id: UserId::new(self.user2_id),
            last_message: self.last_message,
            updated_at: self.updated_at,
        }
    }
}

#[async_trait]
impl ConversationRepository for PgConversationRepository {
    /// Insert-if-absent, then read back.
    ///
    /// Two first messages racing on the same pair both reach the unique
    /// constraint; the loser's insert returns no row and it reads the
    /// winner's.
    async fn get_or_create(&self, key: ConversationKey) -> Result<Conversation, AppError> {
        let inserted = sqlx::query_as::<_, ConversationRow>(
            r#"
            INSERT INTO conversations (user1_id, user2_id, last_message, updated_at)
            VALUES ($1, $2, '', NOW())
            ON CONFLICT (user1_id, user2_id) DO NOTHING
            RETURNING id, user1_id, user2_id, last_message, updated_at
            "#,
        )
        .bind(key.low().as_i64())
        .bind(key.high().as_i64())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            tracing::debug!(conversation = %key, "Created conversation");
            return Ok(row.into_conversation());
        }

        self.find_by_key(key)
            .await?
            .ok_or_else(|| AppError::Internal(format!("conversation {} vanished after insert", key)))
    }

    async fn update_snapshot(
        &self,
        id: i64,
        last_message: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE conversations
            SET last_message = $2, updated_at = $3
            WHERE id = $1 AND (last_message = '' OR updated_at <= $3)
            "#,
        )
        .bind(id)
        .bind(last_message)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_for_user(&self, user: UserId) -> Result<Vec<Conversation>, AppError> {
        let rows = sqlx::query_as::<_, ConversationRow>(
            r#"
            SELECT id, user1_id, user2_id, last_message, updated_at
            FROM conversations
            WHERE user1_id = $1 OR user2_id = $1
            ORDER BY updated_at DESC, id DESC
            "#,
        )
        .bind(user.as_i64())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_conversation()).collect())
    }
}
