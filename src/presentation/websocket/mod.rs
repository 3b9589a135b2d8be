//! WebSocket Gateway
//!
//! Real-time delivery over WebSocket connections.

pub mod connection;
pub mod fanout;
pub mod gateway;
pub mod handler;
pub mod messages;
pub mod pump;
pub mod registry;

pub use connection::{Connection, TransportError};
pub use gateway::Gateway;
pub use handler::{ws_handler, FrameHandler};
pub use messages::{ClientFrame, ServerEnvelope};
pub use registry::ConnectionRegistry;
