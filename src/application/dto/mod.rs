//! Data Transfer Objects
//!
//! DTOs for API request/response serialization.

pub mod request;
pub mod response;

pub use request::{PageQuery, SendMessageRequest, MAX_CONTENT_LENGTH};
pub use response::{ConversationResponse, MessageResponse};
