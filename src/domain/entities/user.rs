//! User entity and repository trait.
//!
//! Users are owned by the authentication collaborator; the chat core only
//! reads them to check that a counterpart exists.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::UserId;
use crate::shared::error::AppError;

/// Represents a user account as seen by the chat system.
///
/// Maps to the `users` table:
/// - id: BIGSERIAL PRIMARY KEY
/// - name: VARCHAR(100) NOT NULL
/// - email: VARCHAR(100) NOT NULL UNIQUE
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Repository trait for read-only User lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by ID.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, AppError>;

    /// Check whether a user exists.
    async fn exists(&self, id: UserId) -> Result<bool, AppError> {
        Ok(self.find_by_id(id).await?.is_some())
    }
}
