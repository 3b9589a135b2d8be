//! WebSocket Message Types
//!
//! Every frame in either direction is a JSON envelope:
//!
//! ```json
//! { "type": "chat", "data": { "receiver_id": 2, "content": "hi" } }
//! ```
//!
//! Client frames: `chat`, `typing`, `read`. Server frames: `chat`,
//! `chat_confirmed`, `typing`, `read`, `error`.

use serde::{Deserialize, Serialize};

use crate::application::dto::MessageResponse;
use crate::domain::{ChatEvent, UserId};

/// Raw envelope before the payload is interpreted.
#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// `chat` payload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatPayload {
    pub receiver_id: UserId,
    pub content: String,
}

/// `typing` payload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TypingPayload {
    pub receiver_id: UserId,
    pub is_typing: bool,
}

/// `read` payload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReadPayload {
    pub message_id: i64,
}

/// A decoded client frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Chat(ChatPayload),
    Typing(TypingPayload),
    Read(ReadPayload),
    /// Well-formed envelope with a type this server does not handle
    Unknown(String),
}

/// Why a client frame could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("invalid {kind} payload: {source}")]
    Payload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientFrame {
    /// Decode a text frame.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let raw: RawFrame = serde_json::from_str(text).map_err(FrameError::Envelope)?;

        fn payload<T: serde::de::DeserializeOwned>(
            kind: &'static str,
            data: serde_json::Value,
        ) -> Result<T, FrameError> {
            serde_json::from_value(data).map_err(|source| FrameError::Payload { kind, source })
        }

        Ok(match raw.kind.as_str() {
            "chat" => Self::Chat(payload("chat", raw.data)?),
            "typing" => Self::Typing(payload("typing", raw.data)?),
            "read" => Self::Read(payload("read", raw.data)?),
            _ => Self::Unknown(raw.kind),
        })
    }
}

/// A chat message pushed to its receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatDelivery {
    pub message_id: i64,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    /// Unix timestamp (seconds)
    pub timestamp: i64,
}

impl From<ChatEvent> for ChatDelivery {
    fn from(event: ChatEvent) -> Self {
        Self {
            message_id: event.id,
            sender_id: event.sender_id,
            receiver_id: event.receiver_id,
            content: event.content,
            timestamp: event.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingNotice {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub is_typing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub message_id: i64,
    pub reader_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// Outgoing envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEnvelope {
    Chat(ChatDelivery),
    ChatConfirmed(MessageResponse),
    Typing(TypingNotice),
    Read(ReadReceipt),
    Error(ErrorPayload),
}

impl ServerEnvelope {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            message: message.into(),
        })
    }

    /// Envelope type tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Chat(_) => "chat",
            Self::ChatConfirmed(_) => "chat_confirmed",
            Self::Typing(_) => "typing",
            Self::Read(_) => "read",
            Self::Error(_) => "error",
        }
    }
}
