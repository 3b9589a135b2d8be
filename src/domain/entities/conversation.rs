//! Conversation entity and repository trait.
//!
//! Maps to the `conversations` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{ConversationKey, UserId};
use crate::shared::error::AppError;

/// The pairwise relationship between two users.
///
/// Maps to the `conversations` table:
/// - id: BIGSERIAL PRIMARY KEY
/// - user1_id: BIGINT NOT NULL (always the smaller identity)
/// - user2_id: BIGINT NOT NULL (always the larger identity)
/// - last_message: TEXT NOT NULL DEFAULT ''
/// - updated_at: TIMESTAMPTZ NOT NULL
/// - UNIQUE (user1_id, user2_id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub user1_id: UserId,
    pub user2_id: UserId,
    /// Snapshot of the most recent message body
    pub last_message: String,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Canonical key of this conversation.
    pub fn key(&self) -> ConversationKey {
        ConversationKey::new(self.user1_id, self.user2_id)
    }

    /// The participant that is not `user`.
    pub fn counterpart(&self, user: UserId) -> UserId {
        if self.user1_id == user {
            self.user2_id
        } else {
            self.user1_id
        }
    }
}

/// Repository trait for Conversation data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Return the conversation for `key`, creating it on first use.
    ///
    /// Concurrent first calls for the same pair must converge on one row.
    async fn get_or_create(&self, key: ConversationKey) -> Result<Conversation, AppError>;

    /// Replace the last-message snapshot and bump `updated_at`.
    ///
    /// Once a conversation holds a snapshot, an older one is ignored, so
    /// out-of-order commits never move it backwards.
    async fn update_snapshot(
        &self,
        id: i64,
        last_message: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// All conversations involving `user`, most recently updated first.
    async fn find_for_user(&self, user: UserId) -> Result<Vec<Conversation>, AppError>;
}
