//! Shared Utilities
//!
//! The boundary error type used across layers.

pub mod error;
