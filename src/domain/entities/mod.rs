//! # Domain Entities
//!
//! Core domain entities of the private chat system.
//! All entities map directly to their corresponding database tables.
//!
//! - **User**: Account owned by the auth collaborator, read-only here
//! - **Message**: A durable message between two users
//! - **Conversation**: The pairwise record with a last-message snapshot
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access operations.
//! These traits are implemented in the infrastructure layer, following the
//! dependency inversion principle.

mod conversation;
mod message;
mod user;

pub use conversation::{Conversation, ConversationRepository};
pub use message::{Message, MessageRepository, NewMessage};
pub use user::{User, UserRepository};

#[cfg(test)]
pub use conversation::MockConversationRepository;
#[cfg(test)]
pub use message::MockMessageRepository;
#[cfg(test)]
pub use user::MockUserRepository;
