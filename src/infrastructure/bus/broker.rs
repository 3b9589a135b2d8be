//! Broker contract.
//!
//! The narrow interface the chat core needs from an external pub/sub broker:
//! publish raw bytes under a subject, subscribe a callback to a subject
//! pattern, cancel a subscription, and report connectivity.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::BusError;

/// A message received from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    /// Concrete subject the message was published to
    pub subject: String,
    /// Raw payload bytes
    pub payload: Vec<u8>,
}

impl BrokerMessage {
    pub fn new(subject: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            subject: subject.into(),
            payload,
        }
    }
}

/// Callback invoked by the broker's delivery task for each matching message.
pub type MessageHandler = Arc<dyn Fn(BrokerMessage) + Send + Sync>;

/// Handle identifying one live subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: u64,
    pattern: String,
}

impl SubscriptionHandle {
    pub fn new(id: u64, pattern: impl Into<String>) -> Self {
        Self {
            id,
            pattern: pattern.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.pattern, self.id)
    }
}

/// External pub/sub broker.
///
/// Patterns support the single-segment wildcard `*`.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Publish `payload` under a concrete `subject`.
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BusError>;

    /// Register `handler` for every message whose subject matches `pattern`.
    async fn subscribe(
        &self,
        pattern: &str,
        handler: MessageHandler,
    ) -> Result<SubscriptionHandle, BusError>;

    /// Cancel a subscription. Unknown handles are ignored.
    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), BusError>;

    /// Whether the broker connection is currently usable.
    fn is_connected(&self) -> bool;
}
