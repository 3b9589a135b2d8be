//! Repository Implementations
//!
//! Implementations of the domain repository traits.
//!
//! ## Available Repositories
//!
//! - **PgUserRepository** - Read-only user lookups
//! - **PgMessageRepository** - Message storage and per-conversation history
//! - **PgConversationRepository** - Pairwise conversation records and snapshots
//! - **InMemoryChatStore** - All three traits over process memory
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use crate::infrastructure::repositories::{
//!     PgConversationRepository, PgMessageRepository, PgUserRepository,
//! };
//!
//! async fn setup_repositories(pool: PgPool) {
//!     let user_repo = PgUserRepository::new(pool.clone());
//!     let message_repo = PgMessageRepository::new(pool.clone());
//!     let conversation_repo = PgConversationRepository::new(pool);
//! }
//! ```

pub mod conversation_repository;
pub mod memory;
pub mod message_repository;
pub mod user_repository;

pub use conversation_repository::PgConversationRepository;
pub use memory::InMemoryChatStore;
pub use message_repository::PgMessageRepository;
pub use user_repository::PgUserRepository;
