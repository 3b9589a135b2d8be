//! WebSocket Connection Handler
//!
//! Upgrades authenticated requests and dispatches decoded client frames.

use std::sync::Arc;

use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
    Extension,
};
use futures::StreamExt;

use super::connection::Connection;
use super::messages::{
    ChatPayload, ClientFrame, ReadPayload, ReadReceipt, ServerEnvelope, TypingNotice,
    TypingPayload,
};
use super::registry::ConnectionRegistry;
use crate::application::dto::{MessageResponse, MAX_CONTENT_LENGTH};
use crate::application::services::{ChatError, ChatService};
use crate::infrastructure::metrics;
use crate::presentation::middleware::AuthUser;
use crate::startup::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Response {
    let max_message_size = state.settings.websocket.max_message_size;
    ws.max_message_size(max_message_size)
        .on_upgrade(move |socket| async move {
            let (sink, stream) = socket.split();
            state.gateway.serve(auth.user_id, sink, stream).await;
        })
}

/// Dispatches client frames for every connection.
pub struct FrameHandler {
    chat: Arc<dyn ChatService>,
    registry: Arc<ConnectionRegistry>,
}

impl FrameHandler {
    pub fn new(chat: Arc<dyn ChatService>, registry: Arc<ConnectionRegistry>) -> Self {
        Self { chat, registry }
    }

    /// Handle one text frame from `conn`. Malformed frames are logged and
    /// skipped.
    pub async fn handle_text(&self, conn: &Connection, text: &str) {
        let frame = match ClientFrame::parse(text) {
            Ok(frame) => frame,
            Err(err) => {
                metrics::record_malformed_frame();
                tracing::warn!(
                    user_id = %conn.user(),
                    connection_id = %conn.id(),
                    error = %err,
                    "Malformed frame"
                );
                return;
            }
        };

        match frame {
            ClientFrame::Chat(payload) => self.handle_chat(conn, payload).await,
            ClientFrame::Typing(payload) => self.handle_typing(conn, payload),
            ClientFrame::Read(payload) => self.handle_read(conn, payload).await,
            ClientFrame::Unknown(kind) => {
                tracing::debug!(user_id = %conn.user(), kind = %kind, "Unknown frame type");
            }
        }
    }

    async fn handle_chat(&self, conn: &Connection, payload: ChatPayload) {
        let reply = if payload.content.chars().count() as u64 > MAX_CONTENT_LENGTH {
            ServerEnvelope::error(format!(
                "Message content exceeds {} characters",
                MAX_CONTENT_LENGTH
            ))
        } else {
            match self
                .chat
                .send_message(conn.user(), payload.receiver_id, &payload.content)
                .await
            {
                Ok(message) => ServerEnvelope::ChatConfirmed(MessageResponse::from(message)),
                Err(err) => {
                    tracing::warn!(user_id = %conn.user(), error = %err, "Failed to send message");
                    ServerEnvelope::error(client_message(&err))
                }
            }
        };

        if let Err(err) = conn.deliver(reply).await {
            tracing::debug!(user_id = %conn.user(), error = %err, "Could not reply to sender");
        }
    }

    /// Typing notices go straight to the receiver's local connection.
    fn handle_typing(&self, conn: &Connection, payload: TypingPayload) {
        let Some(target) = self.registry.lookup(payload.receiver_id) else {
            return;
        };
        let notice = ServerEnvelope::Typing(TypingNotice {
            sender_id: conn.user(),
            receiver_id: payload.receiver_id,
            is_typing: payload.is_typing,
        });
        if let Err(err) = target.offer(notice) {
            tracing::debug!(receiver_id = %payload.receiver_id, error = %err, "Dropped typing notice");
        }
    }

    async fn handle_read(&self, conn: &Connection, payload: ReadPayload) {
        match self
            .chat
            .mark_message_as_read(payload.message_id, conn.user())
            .await
        {
            Ok(message) => {
                if let Some(sender) = self.registry.lookup(message.sender_id) {
                    let _ = sender.offer(ServerEnvelope::Read(ReadReceipt {
                        message_id: message.id,
                        reader_id: conn.user(),
                    }));
                }
            }
            Err(err) => {
                tracing::debug!(
                    user_id = %conn.user(),
                    message_id = payload.message_id,
                    error = %err,
                    "Failed to mark message as read"
                );
                if let Err(err) = conn.deliver(ServerEnvelope::error(client_message(&err))).await {
                    tracing::debug!(user_id = %conn.user(), error = %err, "Could not reply to reader");
                }
            }
        }
    }
}

/// Error text shown to the client. Storage causes stay in the logs.
fn client_message(err: &ChatError) -> String {
    match err {
        ChatError::Storage(_) => "Failed to process message".to_string(),
        other => other.to_string(),
    }
}
