//! Chat Service
//!
//! The private chat use case: sending, reading history, listing
//! conversations and read receipts.
//!
//! Sending is sequenced as validate, persist, upsert conversation, publish.
//! Persistence must succeed before anything is published; publishing is
//! best-effort and never fails an already stored message.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    ChatEventPublisher, Conversation, ConversationKey, ConversationRepository, Message,
    MessageRepository, NewMessage, UserId, UserRepository,
};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// Default page size for history queries.
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// Largest page size a caller may request.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Chat service trait
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Store a message from `sender` to `receiver` and publish it.
    async fn send_message(
        &self,
        sender: UserId,
        receiver: UserId,
        content: &str,
    ) -> Result<Message, ChatError>;

    /// History between `user` and `other`, newest first.
    async fn get_conversation_messages(
        &self,
        user: UserId,
        other: UserId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Message>, ChatError>;

    /// Every conversation `user` takes part in, most recently updated first.
    async fn get_user_conversations(&self, user: UserId) -> Result<Vec<Conversation>, ChatError>;

    /// Set the read flag on a message addressed to `acting_user`.
    ///
    /// Returns the message as stored after the update.
    async fn mark_message_as_read(
        &self,
        message_id: i64,
        acting_user: UserId,
    ) -> Result<Message, ChatError>;
}

/// Chat service errors
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Message content cannot be empty")]
    InvalidContent,

    #[error("Cannot send a message to yourself")]
    SelfAddressed,

    #[error("User {0} not found")]
    ReceiverNotFound(UserId),

    #[error("Message {0} not found")]
    MessageNotFound(i64),

    #[error("Only the receiver can mark a message as read")]
    Unauthorized,

    #[error("Storage failure: {0}")]
    Storage(#[from] AppError),
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::InvalidContent | ChatError::SelfAddressed => {
                AppError::Validation(err.to_string())
            }
            ChatError::ReceiverNotFound(_) | ChatError::MessageNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            ChatError::Unauthorized => AppError::Forbidden(err.to_string()),
            ChatError::Storage(inner) => inner,
        }
    }
}

/// Clamp a requested page into `[1, MAX_PAGE_LIMIT]` and a non-negative offset.
///
/// Missing or non-positive limits fall back to the default.
pub fn clamp_page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = match limit {
        Some(l) if l > 0 => l.min(MAX_PAGE_LIMIT),
        _ => DEFAULT_PAGE_LIMIT,
    };
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

/// ChatService implementation
pub struct ChatServiceImpl<U, M, C>
where
    U: UserRepository,
    M: MessageRepository,
    C: ConversationRepository,
{
    user_repo: Arc<U>,
    message_repo: Arc<M>,
    conversation_repo: Arc<C>,
    publisher: Arc<dyn ChatEventPublisher>,
}

impl<U, M, C> ChatServiceImpl<U, M, C>
where
    U: UserRepository,
    M: MessageRepository,
    C: ConversationRepository,
{
    pub fn new(
        user_repo: Arc<U>,
        message_repo: Arc<M>,
        conversation_repo: Arc<C>,
        publisher: Arc<dyn ChatEventPublisher>,
    ) -> Self {
        Self {
            user_repo,
            message_repo,
            conversation_repo,
            publisher,
        }
    }

    async fn ensure_user_exists(&self, user: UserId) -> Result<(), ChatError> {
        if !self.user_repo.exists(user).await? {
            return Err(ChatError::ReceiverNotFound(user));
        }
        Ok(())
    }
}

#[async_trait]
impl<U, M, C> ChatService for ChatServiceImpl<U, M, C>
where
    U: UserRepository + 'static,
    M: MessageRepository + 'static,
    C: ConversationRepository + 'static,
{
    async fn send_message(
        &self,
        sender: UserId,
        receiver: UserId,
        content: &str,
    ) -> Result<Message, ChatError> {
        if content.trim().is_empty() {
            return Err(ChatError::InvalidContent);
        }
        if sender == receiver {
            return Err(ChatError::SelfAddressed);
        }

        self.ensure_user_exists(receiver).await?;

        let message = self
            .message_repo
            .create(&NewMessage {
                sender_id: sender,
                receiver_id: receiver,
                content: content.to_string(),
            })
            .await?;
        metrics::record_message_persisted();

        let conversation = self
            .conversation_repo
            .get_or_create(message.conversation_key())
            .await?;
        self.conversation_repo
            .update_snapshot(conversation.id, &message.content, message.created_at)
            .await?;

        tracing::debug!(
            message_id = message.id,
            sender_id = %sender,
            receiver_id = %receiver,
            conversation_id = conversation.id,
            "Message stored"
        );

        if let Err(err) = self.publisher.publish_chat_event(&message).await {
            tracing::warn!(
                message_id = message.id,
                error = %err,
                "Failed to publish chat event, live delivery skipped"
            );
        }

        Ok(message)
    }

    async fn get_conversation_messages(
        &self,
        user: UserId,
        other: UserId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Message>, ChatError> {
        self.ensure_user_exists(other).await?;

        let (limit, offset) = clamp_page(limit, offset);
        let messages = self
            .message_repo
            .find_between(ConversationKey::new(user, other), limit, offset)
            .await?;

        Ok(messages)
    }

    async fn get_user_conversations(&self, user: UserId) -> Result<Vec<Conversation>, ChatError> {
        Ok(self.conversation_repo.find_for_user(user).await?)
    }

    async fn mark_message_as_read(
        &self,
        message_id: i64,
        acting_user: UserId,
    ) -> Result<Message, ChatError> {
        let mut message = self
            .message_repo
            .find_by_id(message_id)
            .await?
            .ok_or(ChatError::MessageNotFound(message_id))?;

        if message.receiver_id != acting_user {
            return Err(ChatError::Unauthorized);
        }

        if !message.is_read {
            if !self.message_repo.mark_read(message_id).await? {
                return Err(ChatError::MessageNotFound(message_id));
            }
            message.is_read = true;
        }

        Ok(message)
    }
}
