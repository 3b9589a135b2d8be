//! HTTP API
//!
//! REST endpoints for history, conversations and read receipts, plus health
//! and metrics.

pub mod handlers;
pub mod routes;
