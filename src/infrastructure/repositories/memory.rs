//! In-memory chat store.
//!
//! Implements every chat repository trait over process memory. Used by tests
//! and by local runs without PostgreSQL. A single lock guards all tables so
//! get-or-create and id assignment are atomic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::domain::{
    Conversation, ConversationKey, ConversationRepository, Message, MessageRepository,
    NewMessage, User, UserId, UserRepository,
};
use crate::shared::error::AppError;

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    messages: Vec<Message>,
    conversations: HashMap<ConversationKey, Conversation>,
    next_message_id: i64,
    next_conversation_id: i64,
}

/// Process-local storage for users, messages and conversations.
#[derive(Default)]
pub struct InMemoryChatStore {
    tables: Mutex<Tables>,
    failing: AtomicBool,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user.
    pub fn add_user(&self, id: UserId, name: &str) {
        let user = User {
            id,
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            created_at: Utc::now(),
        };
        self.tables.lock().users.insert(id, user);
    }

    /// Make every subsequent operation fail with a storage error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of stored messages.
    pub fn message_count(&self) -> usize {
        self.tables.lock().messages.len()
    }

    fn check(&self) -> Result<(), AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Internal("storage unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryChatStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, AppError> {
        self.check()?;
        Ok(self.tables.lock().users.get(&id).cloned())
    }
}

#[async_trait]
impl MessageRepository for InMemoryChatStore {
    async fn create(&self, message: &NewMessage) -> Result<Message, AppError> {
        self.check()?;
        let mut tables = self.tables.lock();
        tables.next_message_id += 1;
        let stored = Message {
            id: tables.next_message_id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content.clone(),
            is_read: false,
            created_at: Utc::now(),
        };
        tables.messages.push(stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError> {
        self.check()?;
        Ok(self
            .tables
            .lock()
            .messages
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn find_between(
        &self,
        key: ConversationKey,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, AppError> {
        self.check()?;
        let tables = self.tables.lock();
        let mut found: Vec<Message> = tables
            .messages
            .iter()
            .filter(|m| m.conversation_key() == key)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(found
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn mark_read(&self, id: i64) -> Result<bool, AppError> {
        self.check()?;
        let mut tables = self.tables.lock();
        match tables.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ConversationRepository for InMemoryChatStore {
    async fn get_or_create(&self, key: ConversationKey) -> Result<Conversation, AppError> {
        self.check()?;
        let mut tables = self.tables.lock();
        if let Some(existing) = tables.conversations.get(&key) {
            return Ok(existing.clone());
        }

        tables.next_conversation_id += 1;
        let conversation = Conversation {
            id: tables.next_conversation_id,
            user1_id: key.low(),
            user2_id: key.high(),
            last_message: String::new(),
            updated_at: Utc::now(),
        };
        tables.conversations.insert(key, conversation.clone());
        Ok(conversation)
    }

    async fn update_snapshot(
        &self,
        id: i64,
        last_message: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.check()?;
        let mut tables = self.tables.lock();
        if let Some(conversation) = tables
            .conversations
            .values_mut()
            .find(|c| c.id == id && (c.last_message.is_empty() || c.updated_at <= updated_at))
        {
            conversation.last_message = last_message.to_string();
            conversation.updated_at = updated_at;
        }
        Ok(())
    }

    async fn find_for_user(&self, user: UserId) -> Result<Vec<Conversation>, AppError> {
        self.check()?;
        let tables = self.tables.lock();
        let mut found: Vec<Conversation> = tables
            .conversations
            .values()
            .filter(|c| c.key().involves(user))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(found)
    }
}
