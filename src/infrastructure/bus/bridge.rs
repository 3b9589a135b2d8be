//! Chat bridge.
//!
//! Translates between chat messages and broker traffic. Outbound, a stored
//! message is encoded as a [`ChatEvent`] and published under its
//! conversation's canonical subject. Inbound, each online user owns two
//! wildcard subscriptions which together cover every conversation the user
//! can take part in; incoming payloads are decoded, re-validated against the
//! subject they arrived on and handed to the user's delivery callback.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;

use super::broker::{BrokerMessage, MessageBroker, MessageHandler, SubscriptionHandle};
use crate::domain::{
    parse_subject, subscription_patterns, BusError, ChatEvent, ChatEventHandler,
    ChatEventPublisher, Message, UserId,
};
use crate::infrastructure::metrics;

/// Subscription handles of one user. Subscribe and unsubscribe for the same
/// user run one at a time under this lock.
type UserSubscriptions = Arc<Mutex<Vec<SubscriptionHandle>>>;

/// Bridge between the chat core and the broker.
pub struct ChatBridge {
    broker: Arc<dyn MessageBroker>,
    subscriptions: DashMap<UserId, UserSubscriptions>,
}

impl ChatBridge {
    pub fn new(broker: Arc<dyn MessageBroker>) -> Self {
        Self {
            broker,
            subscriptions: DashMap::new(),
        }
    }

    /// Whether the underlying broker is usable.
    pub fn is_connected(&self) -> bool {
        self.broker.is_connected()
    }

    /// Subscribe `user` to every conversation subject involving them.
    ///
    /// Any subscriptions left over from an earlier session of the same user
    /// are cancelled first, so a user never holds more than one pair. If the
    /// second subscription fails the first is rolled back.
    pub async fn subscribe_for_user(
        &self,
        user: UserId,
        on_event: ChatEventHandler,
    ) -> Result<(), BusError> {
        let slot = self.slot(user);
        let result = {
            let mut handles = slot.lock().await;
            self.cancel(user, std::mem::take(&mut *handles)).await;
            self.subscribe_pair(user, on_event).await.map(|pair| {
                *handles = pair;
            })
        };
        drop(slot);
        self.prune(user);

        if result.is_ok() {
            tracing::debug!(user_id = %user, "Subscribed to private chat subjects");
        }
        result
    }

    /// Cancel every subscription held for `user`. No-op when none exist.
    pub async fn unsubscribe_all(&self, user: UserId) {
        let Some(slot) = self.subscriptions.get(&user).map(|s| s.value().clone()) else {
            return;
        };

        let cancelled = {
            let mut handles = slot.lock().await;
            let taken = std::mem::take(&mut *handles);
            let any = !taken.is_empty();
            self.cancel(user, taken).await;
            any
        };
        drop(slot);
        self.prune(user);

        if cancelled {
            tracing::debug!(user_id = %user, "Unsubscribed from private chat subjects");
        }
    }

    /// Whether `user` currently holds subscriptions.
    pub fn has_subscriptions(&self, user: UserId) -> bool {
        let Some(slot) = self.subscriptions.get(&user).map(|s| s.value().clone()) else {
            return false;
        };
        // A locked slot is mid-update; report it as held.
        let held = slot.try_lock().map_or(true, |handles| !handles.is_empty());
        held
    }

    fn slot(&self, user: UserId) -> UserSubscriptions {
        self.subscriptions.entry(user).or_default().value().clone()
    }

    /// Drop the user's slot once nobody else holds it and it is empty.
    fn prune(&self, user: UserId) {
        self.subscriptions.remove_if(&user, |_, slot| {
            Arc::strong_count(slot) == 1
                && slot.try_lock().is_ok_and(|handles| handles.is_empty())
        });
    }

    async fn subscribe_pair(
        &self,
        user: UserId,
        on_event: ChatEventHandler,
    ) -> Result<Vec<SubscriptionHandle>, BusError> {
        let mut handles = Vec::with_capacity(2);
        for pattern in subscription_patterns(user) {
            let handler = inbound_handler(user, on_event.clone());
            match self.broker.subscribe(&pattern, handler).await {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    self.cancel(user, handles).await;
                    return Err(err);
                }
            }
        }
        Ok(handles)
    }

    async fn cancel(&self, user: UserId, handles: Vec<SubscriptionHandle>) {
        for handle in handles {
            if let Err(err) = self.broker.unsubscribe(handle.clone()).await {
                tracing::warn!(
                    user_id = %user,
                    subscription = %handle,
                    error = %err,
                    "Failed to cancel subscription"
                );
            }
        }
    }
}

#[async_trait]
impl ChatEventPublisher for ChatBridge {
    async fn publish_chat_event(&self, message: &Message) -> Result<(), BusError> {
        if !self.broker.is_connected() {
            metrics::record_bus_publish_failure();
            return Err(BusError::NotConnected);
        }

        let event = ChatEvent::from(message);
        let subject = event.conversation_key().subject();
        let payload =
            serde_json::to_vec(&event).map_err(|e| BusError::Serialization(e.to_string()))?;

        if let Err(err) = self.broker.publish(&subject, payload).await {
            metrics::record_bus_publish_failure();
            return Err(err);
        }

        tracing::debug!(subject = %subject, message_id = event.id, "Published chat event");
        Ok(())
    }
}

/// Wrap a user's delivery callback with decoding and validation.
///
/// Payloads that fail to decode, arrive on a subject outside the private
/// chat family, disagree with their subject, or do not involve `user` are
/// dropped.
fn inbound_handler(user: UserId, on_event: ChatEventHandler) -> MessageHandler {
    Arc::new(move |msg: BrokerMessage| {
        let Some(key) = parse_subject(&msg.subject) else {
            tracing::debug!(subject = %msg.subject, "Ignoring non-chat subject");
            return;
        };

        let event: ChatEvent = match serde_json::from_slice(&msg.payload) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(subject = %msg.subject, error = %err, "Dropping undecodable chat event");
                return;
            }
        };

        if event.conversation_key() != key || !event.involves(user) {
            tracing::debug!(
                subject = %msg.subject,
                user_id = %user,
                "Dropping chat event outside the user's conversations"
            );
            return;
        }

        on_event(event);
    })
}
