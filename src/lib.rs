//! # Chat Delivery Library
//!
//! Real-time one-to-one chat delivery:
//! - WebSocket gateway with one live session per user
//! - PostgreSQL for durable messages and conversation snapshots
//! - Redis pub/sub so a message reaches its receiver on whichever node
//!   holds the receiver's connection
//! - REST endpoints for history, conversations and read receipts
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Entities, typed identities, conversation addressing and
//!   the repository/publisher contracts
//! - **Application Layer**: The chat use cases and DTOs
//! - **Infrastructure Layer**: Database, message bus and metrics
//! - **Presentation Layer**: HTTP handlers and WebSocket gateway
//!
//! ## Module Structure
//!
//! ```text
//! chat_delivery/
//! +-- config/         Configuration management
//! +-- domain/         Entities, value objects, events and traits
//! +-- application/    Chat service and DTOs
//! +-- infrastructure/ Database, bus and metrics implementations
//! +-- presentation/   HTTP routes and WebSocket gateway
//! +-- shared/         Common error type
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
