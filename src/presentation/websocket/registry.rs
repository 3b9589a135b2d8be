//! Connection Registry
//!
//! Live connections keyed by user. At most one entry per user: registering a
//! new connection evicts and closes the previous one. No connection is closed
//! while the map lock is held.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::connection::Connection;
use crate::domain::UserId;
use crate::infrastructure::metrics;

/// Registry of live connections.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<UserId, Arc<Connection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `conn` for its user. A previous connection of the same user is
    /// closed and returned.
    pub fn register(&self, conn: Arc<Connection>) -> Option<Arc<Connection>> {
        let user = conn.user();
        let (evicted, active) = {
            let mut map = self.connections.write();
            let evicted = map.insert(user, conn.clone());
            (evicted, map.len())
        };
        metrics::set_websocket_connections(active);

        tracing::info!(user_id = %user, connection_id = %conn.id(), "Connection registered");

        let evicted = evicted.filter(|old| old.id() != conn.id())?;
        evicted.close();
        tracing::info!(
            user_id = %user,
            connection_id = %evicted.id(),
            "Evicted previous connection"
        );
        Some(evicted)
    }

    /// Remove and close whatever connection `user` has. Idempotent.
    pub fn unregister(&self, user: UserId) -> Option<Arc<Connection>> {
        let (removed, active) = {
            let mut map = self.connections.write();
            let removed = map.remove(&user);
            (removed, map.len())
        };
        let removed = removed?;
        metrics::set_websocket_connections(active);
        removed.close();
        tracing::info!(user_id = %user, connection_id = %removed.id(), "Connection unregistered");
        Some(removed)
    }

    /// Remove `conn` if it is still the registered connection of its user,
    /// and close it either way.
    ///
    /// Returns `true` when the entry was removed. A connection that was
    /// already evicted by a newer one leaves the newer entry untouched.
    pub fn unregister_connection(&self, conn: &Connection) -> bool {
        let user = conn.user();
        let removed = {
            let mut map = self.connections.write();
            let is_current = map.get(&user).is_some_and(|c| c.id() == conn.id());
            if is_current {
                map.remove(&user);
            }
            is_current.then_some(map.len())
        };
        conn.close();

        match removed {
            Some(active) => {
                metrics::set_websocket_connections(active);
                tracing::info!(user_id = %user, connection_id = %conn.id(), "Connection unregistered");
                true
            }
            None => false,
        }
    }

    /// Current connection of `user`, if any.
    pub fn lookup(&self, user: UserId) -> Option<Arc<Connection>> {
        self.connections.read().get(&user).cloned()
    }

    pub fn is_online(&self, user: UserId) -> bool {
        self.connections.read().contains_key(&user)
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }
}
