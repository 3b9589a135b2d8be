//! WebSocket Gateway
//!
//! Owns the lifecycle of every live connection:
//!
//! 1. register with the [`ConnectionRegistry`] (evicting an older session)
//! 2. subscribe the user on the bus; failure degrades to local-only
//! 3. run the writer loop on its own task and the reader loop inline
//! 4. on exit, close and unregister; the bus subscriptions are cancelled
//!    only if this connection was still the user's current one

use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::Message;
use futures::{Sink, Stream};

use super::connection::Connection;
use super::fanout;
use super::handler::FrameHandler;
use super::pump;
use super::registry::ConnectionRegistry;
use crate::application::services::ChatService;
use crate::domain::UserId;
use crate::infrastructure::bus::ChatBridge;

/// Gateway connecting WebSocket clients to the chat core.
pub struct Gateway {
    registry: Arc<ConnectionRegistry>,
    bridge: Arc<ChatBridge>,
    frames: FrameHandler,
    queue_capacity: usize,
}

impl Gateway {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        bridge: Arc<ChatBridge>,
        chat: Arc<dyn ChatService>,
        queue_capacity: usize,
    ) -> Self {
        let frames = FrameHandler::new(chat, registry.clone());
        Self {
            registry,
            bridge,
            frames,
            queue_capacity,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Serve one authenticated connection until it ends.
    pub async fn serve<Si, St, E>(&self, user: UserId, sink: Si, stream: St)
    where
        Si: Sink<Message> + Unpin + Send + 'static,
        Si::Error: Display,
        St: Stream<Item = Result<Message, E>> + Unpin,
        E: Display,
    {
        let (conn, rx) = Connection::new(user, self.queue_capacity);
        self.registry.register(conn.clone());
        self.subscribe(user).await;

        let writer = tokio::spawn(pump::write_loop(sink, conn.clone(), rx));
        pump::read_loop(stream, &conn, &self.frames).await;

        self.release(&conn).await;
        if let Err(err) = writer.await {
            tracing::error!(user_id = %user, error = %err, "Writer task failed");
        }
    }

    /// Forcefully disconnect `user`.
    pub async fn disconnect(&self, user: UserId) {
        if self.registry.unregister(user).is_some() {
            self.bridge.unsubscribe_all(user).await;
        }
    }

    async fn subscribe(&self, user: UserId) {
        let handler = fanout::delivery_handler(self.registry.clone(), user);
        if let Err(err) = self.bridge.subscribe_for_user(user, handler).await {
            tracing::warn!(
                user_id = %user,
                error = %err,
                "Bus subscription failed, live delivery from other nodes unavailable"
            );
        }
    }

    async fn release(&self, conn: &Connection) {
        let user = conn.user();
        if !self.registry.unregister_connection(conn) {
            return;
        }
        self.bridge.unsubscribe_all(user).await;

        // A new session may have registered while we were unsubscribing.
        if self.registry.is_online(user) {
            self.subscribe(user).await;
        }
    }
}
