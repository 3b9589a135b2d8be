//! Per-connection pump loops.
//!
//! The reader processes inbound frames one at a time, in receipt order. The
//! writer drains the outbound queue in FIFO order. Either loop ending closes
//! the connection, which stops the other one.

use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::Message;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;

use super::connection::{Connection, TransportError};
use super::handler::FrameHandler;
use super::messages::ServerEnvelope;

/// Read frames until the client goes away, the transport fails or the
/// connection is closed elsewhere.
pub async fn read_loop<St, E>(mut stream: St, conn: &Arc<Connection>, frames: &FrameHandler)
where
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    loop {
        let next = tokio::select! {
            _ = conn.closed() => break,
            next = stream.next() => next,
        };

        match next {
            Some(Ok(Message::Text(text))) => frames.handle_text(conn, text.as_str()).await,
            Some(Ok(Message::Binary(_))) => {
                tracing::debug!(connection_id = %conn.id(), "Ignoring binary frame");
            }
            Some(Ok(Message::Close(_))) | None => {
                tracing::debug!(user_id = %conn.user(), connection_id = %conn.id(), "Client closed connection");
                break;
            }
            // Ping/Pong are answered by the transport
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                let err = TransportError::Io(err.to_string());
                tracing::debug!(user_id = %conn.user(), connection_id = %conn.id(), error = %err, "Read failed");
                break;
            }
        }
    }
    conn.close();
}

/// Write queued envelopes until the queue is closed, a write fails or the
/// connection is closed. On close, frames already queued are still flushed.
pub async fn write_loop<Si>(mut sink: Si, conn: Arc<Connection>, mut rx: mpsc::Receiver<ServerEnvelope>)
where
    Si: Sink<Message> + Unpin,
    Si::Error: Display,
{
    loop {
        let envelope = tokio::select! {
            envelope = rx.recv() => envelope,
            _ = conn.closed() => break,
        };
        let Some(envelope) = envelope else {
            break;
        };
        if let Err(err) = write_envelope(&mut sink, &envelope).await {
            tracing::debug!(user_id = %conn.user(), connection_id = %conn.id(), error = %err, "Write failed");
            conn.close();
            return;
        }
    }

    while let Ok(envelope) = rx.try_recv() {
        if write_envelope(&mut sink, &envelope).await.is_err() {
            break;
        }
    }
    let _ = sink.send(Message::Close(None)).await;
    conn.close();
}

async fn write_envelope<Si>(sink: &mut Si, envelope: &ServerEnvelope) -> Result<(), TransportError>
where
    Si: Sink<Message> + Unpin,
    Si::Error: Display,
{
    let text = match serde_json::to_string(envelope) {
        Ok(text) => text,
        Err(err) => {
            tracing::error!(kind = envelope.kind(), error = %err, "Failed to serialize envelope");
            return Ok(());
        }
    };
    sink.send(Message::Text(text.into()))
        .await
        .map_err(|e| TransportError::Io(e.to_string()))
}
