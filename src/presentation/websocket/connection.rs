//! WebSocket Connection
//!
//! One live client connection: its owner, a bounded outbound queue drained by
//! the writer loop, and a close signal observed by both pump loops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use super::messages::ServerEnvelope;
use crate::domain::UserId;

/// Connection-level failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("outbound queue is full")]
    QueueFull,

    #[error("connection is closed")]
    Closed,

    #[error("transport I/O error: {0}")]
    Io(String),
}

/// A registered client connection.
#[derive(Debug)]
pub struct Connection {
    id: Uuid,
    user: UserId,
    outbound: mpsc::Sender<ServerEnvelope>,
    closed: AtomicBool,
    close_signal: watch::Sender<bool>,
}

impl Connection {
    /// Create a connection for `user` with an outbound queue of `capacity`.
    ///
    /// The receiver half is handed to the writer loop.
    pub fn new(user: UserId, capacity: usize) -> (Arc<Self>, mpsc::Receiver<ServerEnvelope>) {
        let (outbound, rx) = mpsc::channel(capacity.max(1));
        let (close_signal, _) = watch::channel(false);

        let conn = Arc::new(Self {
            id: Uuid::new_v4(),
            user,
            outbound,
            closed: AtomicBool::new(false),
            close_signal,
        });
        (conn, rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user(&self) -> UserId {
        self.user
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close the connection. Returns `true` only for the call that closed it.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.close_signal.send_replace(true);
        tracing::debug!(user_id = %self.user, connection_id = %self.id, "Connection closed");
        true
    }

    /// Resolve once the connection has been closed.
    pub async fn closed(&self) {
        let mut rx = self.close_signal.subscribe();
        // The sender lives as long as `self`, so this only returns on close.
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Non-blocking enqueue for best-effort traffic (bus fan-out, typing).
    pub fn offer(&self, envelope: ServerEnvelope) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.outbound.try_send(envelope).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
        })
    }

    /// Enqueue, waiting for queue space, for frames that must not be dropped
    /// (chat confirmations, errors). Gives up if the connection closes.
    pub async fn deliver(&self, envelope: ServerEnvelope) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        tokio::select! {
            sent = self.outbound.send(envelope) => sent.map_err(|_| TransportError::Closed),
            _ = self.closed() => Err(TransportError::Closed),
        }
    }
}
