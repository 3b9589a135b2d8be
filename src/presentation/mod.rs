//! Presentation Layer
//!
//! REST endpoints, the WebSocket gateway and the middleware in front of
//! both.

pub mod http;
pub mod middleware;
pub mod websocket;
