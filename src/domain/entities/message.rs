//! Message entity and repository trait.
//!
//! Maps to the `messages` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{ConversationKey, UserId};
use crate::shared::error::AppError;

/// Represents a private message between two users.
///
/// Maps to the `messages` table:
/// - id: BIGSERIAL PRIMARY KEY (assigned by storage)
/// - sender_id: BIGINT NOT NULL REFERENCES users(id)
/// - receiver_id: BIGINT NOT NULL REFERENCES users(id)
/// - content: TEXT NOT NULL
/// - is_read: BOOLEAN NOT NULL DEFAULT FALSE
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Storage-assigned identifier, increasing with insertion order
    pub id: i64,

    /// Author of the message
    pub sender_id: UserId,

    /// Addressee of the message (never equal to `sender_id`)
    pub receiver_id: UserId,

    /// Message body
    pub content: String,

    /// Set once by the receiver, never cleared
    pub is_read: bool,

    /// Timestamp when the message was stored
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Key of the conversation this message belongs to.
    pub fn conversation_key(&self) -> ConversationKey {
        ConversationKey::new(self.sender_id, self.receiver_id)
    }
}

/// A message that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
}

/// Repository trait for Message data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Persist a message, assigning its id and timestamp.
    async fn create(&self, message: &NewMessage) -> Result<Message, AppError>;

    /// Find a message by its ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError>;

    /// Messages exchanged inside one conversation, newest first.
    async fn find_between(
        &self,
        key: ConversationKey,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, AppError>;

    /// Set the read flag. Returns `false` when no such message exists.
    async fn mark_read(&self, id: i64) -> Result<bool, AppError>;
}
