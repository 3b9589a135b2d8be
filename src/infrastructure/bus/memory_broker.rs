//! In-process broker for single-node deployments and tests.
//!
//! Subject matching follows NATS token rules: `*` matches exactly one
//! dot-separated token, `>` matches one or more trailing tokens. Handlers are
//! invoked on the publisher's task, after the subscription lock is released.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use super::broker::{BrokerMessage, MessageBroker, MessageHandler, SubscriptionHandle};
use crate::domain::BusError;

/// In-memory pub/sub broker.
pub struct InMemoryBroker {
    subscriptions: RwLock<HashMap<u64, (String, MessageHandler)>>,
    next_id: AtomicU64,
    connected: AtomicBool,
    /// Everything published while connected, in publish order
    published: Mutex<Vec<BrokerMessage>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            connected: AtomicBool::new(true),
            published: Mutex::new(Vec::new()),
        }
    }

    /// Simulate the broker going away or coming back.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Messages published so far.
    pub fn published(&self) -> Vec<BrokerMessage> {
        self.published.lock().clone()
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

/// NATS-style subject match.
pub fn subject_matches(pattern: &str, subject: &str) -> bool {
    let mut pattern_tokens = pattern.split('.');
    let mut subject_tokens = subject.split('.');

    loop {
        match (pattern_tokens.next(), subject_tokens.next()) {
            (Some(">"), Some(_)) => return true,
            (Some("*"), Some(_)) => continue,
            (Some(p), Some(s)) if p == s => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BusError> {
        if !self.is_connected() {
            return Err(BusError::NotConnected);
        }

        let message = BrokerMessage::new(subject, payload);
        self.published.lock().push(message.clone());

        let handlers: Vec<MessageHandler> = self
            .subscriptions
            .read()
            .values()
            .filter(|(pattern, _)| subject_matches(pattern, subject))
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in handlers {
            handler(message.clone());
        }

        Ok(())
    }

    async fn subscribe(
        &self,
        pattern: &str,
        handler: MessageHandler,
    ) -> Result<SubscriptionHandle, BusError> {
        if !self.is_connected() {
            return Err(BusError::NotConnected);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscriptions
            .write()
            .insert(id, (pattern.to_string(), handler));

        tracing::debug!(pattern = %pattern, subscription_id = id, "Subscribed");
        Ok(SubscriptionHandle::new(id, pattern))
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), BusError> {
        if self.subscriptions.write().remove(&handle.id()).is_some() {
            tracing::debug!(subscription = %handle, "Unsubscribed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
