//! Delivery Fan-out
//!
//! Turns a validated bus event into a `chat` frame on the receiver's live
//! connection. Runs on the broker's delivery task, so it never waits: a
//! missing connection or a full queue drops the frame. The message itself is
//! already stored and stays available through history.

use std::sync::Arc;

use super::connection::TransportError;
use super::messages::{ChatDelivery, ServerEnvelope};
use super::registry::ConnectionRegistry;
use crate::domain::{ChatEvent, ChatEventHandler, UserId};
use crate::infrastructure::metrics::{self, FanoutOutcome};

/// Deliver `event` to `user` if they are its receiver and online.
pub fn deliver_event(registry: &ConnectionRegistry, user: UserId, event: ChatEvent) -> FanoutOutcome {
    let Some(conn) = registry.lookup(user) else {
        tracing::debug!(user_id = %user, message_id = event.id, "Receiver offline, dropping live delivery");
        return FanoutOutcome::Offline;
    };

    let message_id = event.id;
    match conn.offer(ServerEnvelope::Chat(ChatDelivery::from(event))) {
        Ok(()) => {
            tracing::debug!(user_id = %user, message_id, "Delivered chat event");
            FanoutOutcome::Delivered
        }
        Err(TransportError::QueueFull) => {
            tracing::warn!(
                user_id = %user,
                connection_id = %conn.id(),
                message_id,
                "Outbound queue full, dropping live delivery"
            );
            FanoutOutcome::QueueFull
        }
        Err(_) => FanoutOutcome::Offline,
    }
}

/// Bus callback for `user`.
///
/// The sender also receives its own events through the wildcard
/// subscriptions; those are skipped because the sender already got
/// `chat_confirmed`.
pub fn delivery_handler(registry: Arc<ConnectionRegistry>, user: UserId) -> ChatEventHandler {
    Arc::new(move |event: ChatEvent| {
        if event.receiver_id != user {
            return;
        }
        let outcome = deliver_event(&registry, user, event);
        metrics::record_fanout(outcome);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::websocket::connection::Connection;

    fn event(sender: i64, receiver: i64) -> ChatEvent {
        ChatEvent {
            id: 1,
            sender_id: UserId::new(sender),
            receiver_id: UserId::new(receiver),
            content: "hi".into(),
            timestamp: 0,
        }
    }

    #[tokio::test]
    async fn test_delivers_to_online_receiver() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (conn, mut rx) = Connection::new(UserId::new(2), 4);
        registry.register(conn);

        let handler = delivery_handler(registry.clone(), UserId::new(2));
        handler(event(1, 2));

        match rx.recv().await {
            Some(ServerEnvelope::Chat(delivery)) => {
                assert_eq!(delivery.sender_id, UserId::new(1));
                assert_eq!(delivery.content, "hi");
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sender_echo_is_skipped() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (conn, mut rx) = Connection::new(UserId::new(1), 4);
        registry.register(conn);

        let handler = delivery_handler(registry.clone(), UserId::new(1));
        handler(event(1, 2));

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_offline_and_full_queue() {
        let registry = ConnectionRegistry::new();
        assert_eq!(
            deliver_event(&registry, UserId::new(2), event(1, 2)),
            FanoutOutcome::Offline
        );

        let (conn, _rx) = Connection::new(UserId::new(2), 1);
        registry.register(conn);
        assert_eq!(
            deliver_event(&registry, UserId::new(2), event(1, 2)),
            FanoutOutcome::Delivered
        );
        assert_eq!(
            deliver_event(&registry, UserId::new(2), event(1, 2)),
            FanoutOutcome::QueueFull
        );
    }
}
