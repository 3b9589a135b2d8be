//! Message Bus Module
//!
//! Cross-node delivery of chat events.
//!
//! ```text
//! +-------------------+
//! |    ChatService    |
//! +-------------------+
//!          | publish_chat_event
//!          v
//! +-------------------+        +-------------------+
//! |    ChatBridge     | -----> |   MessageBroker   |  <-- Abstract interface
//! +-------------------+        +-------------------+
//!          ^                     |               |
//!          | per-user handlers   v               v
//! +-------------------+   RedisBroker     InMemoryBroker
//! |   Delivery fan-out|
//! +-------------------+
//! ```

mod bridge;
mod broker;
mod memory_broker;
mod redis_broker;

pub use bridge::ChatBridge;
pub use broker::{BrokerMessage, MessageBroker, MessageHandler, SubscriptionHandle};
pub use memory_broker::{subject_matches, InMemoryBroker};
pub use redis_broker::RedisBroker;
