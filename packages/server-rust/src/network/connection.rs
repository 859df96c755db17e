//! Registry of live legacy-link connections.
//!
//! Each accepted socket registers a handle here for the lifetime of its
//! connection task. The registry backs the admin connection count and lets
//! shutdown enumerate what is still open; replies are written by the
//! connection task itself, so handles carry metadata only.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;

/// Registry-assigned connection identifier. Zero is never issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Metadata for one live connection.
#[derive(Debug)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub peer_addr: SocketAddr,
    pub connected_at: Instant,
}

/// Thread-safe connection table.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, Arc<ConnectionHandle>>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a newly accepted connection.
    pub fn register(&self, peer_addr: SocketAddr) -> Arc<ConnectionHandle> {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let handle = Arc::new(ConnectionHandle {
            id,
            peer_addr,
            connected_at: Instant::now(),
        });
        self.connections.insert(id, Arc::clone(&handle));
        handle
    }

    /// Removes a connection, returning its handle if it was present.
    pub fn remove(&self, id: ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.connections.remove(&id).map(|(_, handle)| handle)
    }

    /// Looks up a connection by id.
    #[must_use]
    pub fn get(&self, id: ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.connections.get(&id).map(|e| Arc::clone(e.value()))
    }

    /// Number of live connections.
    #[must_use]
    pub fn count(&self) -> usize {
        self.connections.len()
    }

    /// Removes and returns every connection. Used at shutdown.
    pub fn drain_all(&self) -> Vec<Arc<ConnectionHandle>> {
        let ids: Vec<ConnectionId> = self.connections.iter().map(|e| *e.key()).collect();
        ids.into_iter()
            .filter_map(|id| self.remove(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    #[test]
    fn register_assigns_increasing_ids_from_one() {
        let registry = ConnectionRegistry::new();
        let a = registry.register(addr(1000));
        let b = registry.register(addr(1001));
        assert_eq!(a.id, ConnectionId(1));
        assert_eq!(b.id, ConnectionId(2));
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn remove_forgets_the_connection() {
        let registry = ConnectionRegistry::new();
        let handle = registry.register(addr(1000));
        assert!(registry.remove(handle.id).is_some());
        assert!(registry.remove(handle.id).is_none());
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn get_returns_registered_handles() {
        let registry = ConnectionRegistry::new();
        let handle = registry.register(addr(1000));
        assert_eq!(registry.get(handle.id).unwrap().peer_addr, addr(1000));
        assert!(registry.get(ConnectionId(99)).is_none());
    }

    #[test]
    fn drain_all_empties_the_registry() {
        let registry = ConnectionRegistry::new();
        registry.register(addr(1000));
        registry.register(addr(1001));
        registry.register(addr(1002));

        let drained = registry.drain_all();
        assert_eq!(drained.len(), 3);
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn connection_id_display() {
        assert_eq!(ConnectionId(7).to_string(), "conn-7");
    }
}
