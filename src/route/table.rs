//! In-process route registry.
//!
//! Mirrors the teacher's `RoutingTable` shape (an `Arc<RwLock<Inner>>` with
//! a monotonic version counter bumped on every mutation) but keyed on
//! route ID rather than node ID, and carrying handling flags rather than
//! shard/datacenter assignments.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Handling flags carried alongside a route ID, per the consul metadata
/// bit layout (`internal`, `stateful`, `authorized`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteFlags {
    /// Only reachable from other cluster nodes, never from a client frame.
    pub internal: bool,
    /// Requires a session already bound to a node before dispatch.
    pub stateful: bool,
    /// Requires the connection to have completed authorization.
    pub authorized: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct RouteEntry {
    pub id: i32,
    pub flags: RouteFlags,
}

struct Inner {
    routes: HashMap<i32, RouteFlags>,
    version: u64,
}

/// Process-wide table of known route IDs and their flags.
#[derive(Clone)]
pub struct RouteTable {
    inner: Arc<RwLock<Inner>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                routes: HashMap::new(),
                version: 0,
            })),
        }
    }

    pub fn register(&self, id: i32, flags: RouteFlags) {
        let mut inner = self.inner.write();
        inner.routes.insert(id, flags);
        inner.version += 1;
    }

    pub fn deregister(&self, id: i32) {
        let mut inner = self.inner.write();
        if inner.routes.remove(&id).is_some() {
            inner.version += 1;
        }
    }

    pub fn flags(&self, id: i32) -> Option<RouteFlags> {
        self.inner.read().routes.get(&id).copied()
    }

    pub fn contains(&self, id: i32) -> bool {
        self.inner.read().routes.contains_key(&id)
    }

    pub fn version(&self) -> u64 {
        self.inner.read().version
    }

    /// Snapshot every registered route, for publishing into service
    /// registry metadata.
    pub fn snapshot(&self) -> Vec<RouteEntry> {
        self.inner
            .read()
            .routes
            .iter()
            .map(|(&id, &flags)| RouteEntry { id, flags })
            .collect()
    }

    /// Replace the table wholesale, e.g. after pulling a peer's metadata.
    /// Bumps the version exactly once regardless of how many routes change.
    pub fn replace_all(&self, entries: impl IntoIterator<Item = RouteEntry>) {
        let mut inner = self.inner.write();
        inner.routes = entries.into_iter().map(|e| (e.id, e.flags)).collect();
        inner.version += 1;
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup() {
        let table = RouteTable::new();
        table.register(
            1,
            RouteFlags {
                internal: false,
                stateful: true,
                authorized: true,
            },
        );
        let flags = table.flags(1).unwrap();
        assert!(flags.stateful);
        assert!(flags.authorized);
        assert!(!flags.internal);
    }

    #[test]
    fn deregister_removes_and_bumps_version() {
        let table = RouteTable::new();
        table.register(1, RouteFlags::default());
        let v1 = table.version();
        table.deregister(1);
        assert!(table.version() > v1);
        assert!(!table.contains(1));
    }

    #[test]
    fn deregister_unknown_route_is_a_noop() {
        let table = RouteTable::new();
        let v0 = table.version();
        table.deregister(99);
        assert_eq!(table.version(), v0);
    }

    #[test]
    fn replace_all_swaps_atomically_from_readers_perspective() {
        let table = RouteTable::new();
        table.register(1, RouteFlags::default());
        table.replace_all(vec![RouteEntry {
            id: 2,
            flags: RouteFlags {
                internal: true,
                stateful: false,
                authorized: false,
            },
        }]);
        assert!(!table.contains(1));
        assert!(table.contains(2));
    }
}
