//! Response DTOs
//!
//! Data structures for API response bodies.

use serde::{Deserialize, Serialize};

use crate::domain::{Conversation, Message, UserId};

/// Message response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
    pub is_read: bool,
    pub created_at: String,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            sender_id: message.sender_id.as_i64(),
            receiver_id: message.receiver_id.as_i64(),
            content: message.content,
            is_read: message.is_read,
            created_at: message.created_at.to_rfc3339(),
        }
    }
}

/// Conversation response, seen from one participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub id: i64,
    pub user1_id: i64,
    pub user2_id: i64,
    /// The participant that is not the caller
    pub other_user_id: i64,
    pub last_message: String,
    pub updated_at: String,
}

impl ConversationResponse {
    pub fn for_user(conversation: Conversation, user: UserId) -> Self {
        Self {
            id: conversation.id,
            user1_id: conversation.user1_id.as_i64(),
            user2_id: conversation.user2_id.as_i64(),
            other_user_id: conversation.counterpart(user).as_i64(),
            last_message: conversation.last_message,
            updated_at: conversation.updated_at.to_rfc3339(),
        }
    }
}
