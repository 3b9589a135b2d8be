//! # Domain Layer
//!
//! The domain layer contains the core concepts of private chat delivery.
//! It is independent of any external frameworks or infrastructure concerns.
//!
//! ## Structure
//!
//! - **entities**: Users, messages, conversations and their repository traits
//! - **value_objects**: Typed identities and conversation addressing
//! - **events**: The bus event and the publisher contract
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Repository and publisher traits define the contracts with collaborators

pub mod entities;
pub mod events;
pub mod value_objects;

// Re-export commonly used types
pub use entities::*;
pub use events::{BusError, ChatEvent, ChatEventHandler, ChatEventPublisher};
pub use value_objects::*;

#[cfg(test)]
pub use events::MockChatEventPublisher;
