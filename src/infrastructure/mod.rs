//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - Database repositories (PostgreSQL) and the in-memory store
//! - Message bus brokers (Redis, in-memory) and the chat bridge
//! - Prometheus metrics

pub mod bus;
pub mod database;
pub mod metrics;
pub mod repositories;
