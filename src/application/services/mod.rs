//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **ChatService**: Sending, history, conversation listing and read receipts

pub mod chat_service;

pub use chat_service::{clamp_page, ChatError, ChatService, ChatServiceImpl};
