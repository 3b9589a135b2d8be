//! # Domain Value Objects
//!
//! Immutable value types that represent domain concepts without identity.
//!
//! ## Value Objects
//!
//! - **UserId**: Verified, strongly typed user identity
//! - **ConversationKey**: Order-independent pair of participants and the
//!   canonical bus subject derived from it

mod subject;
mod user_id;

pub use subject::*;
pub use user_id::*;
