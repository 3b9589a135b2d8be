//! Bus events.
//!
//! A `ChatEvent` is the transient projection of a stored [`Message`] that
//! travels over the message bus. It has no lifecycle of its own.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::entities::Message;
use super::value_objects::{ConversationKey, UserId};

/// Wire record published under the conversation's canonical subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEvent {
    pub id: i64,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    /// Unix timestamp (seconds) of the stored message
    pub timestamp: i64,
}

impl ChatEvent {
    pub fn conversation_key(&self) -> ConversationKey {
        ConversationKey::new(self.sender_id, self.receiver_id)
    }

    /// Whether `user` is the sender or the receiver.
    pub fn involves(&self, user: UserId) -> bool {
        self.sender_id == user || self.receiver_id == user
    }
}

impl From<&Message> for ChatEvent {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content.clone(),
            timestamp: message.created_at.timestamp(),
        }
    }
}

/// Errors raised at the bus boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    #[error("not connected to message broker")]
    NotConnected,

    #[error("failed to encode event: {0}")]
    Serialization(String),

    #[error("failed to publish to {subject}: {reason}")]
    Publish { subject: String, reason: String },

    #[error("failed to subscribe to {pattern}: {reason}")]
    Subscribe { pattern: String, reason: String },
}

/// Callback invoked with a validated event for one online user.
///
/// Runs on the bus delivery task and must not block.
pub type ChatEventHandler = Arc<dyn Fn(ChatEvent) + Send + Sync>;

/// Outbound side of the bus as seen by the chat use case.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatEventPublisher: Send + Sync {
    /// Publish a stored message to everyone subscribed to its conversation.
    async fn publish_chat_event(&self, message: &Message) -> Result<(), BusError>;
}
