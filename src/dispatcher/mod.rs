//! Route-to-endpoint dispatch table.
//!
//! Keyed by route (or event) id, each entry is a swap-on-rebuild
//! `Arc<Buckets>` so readers never observe a half-built bucket set while a
//! rebuild is in flight — the same guarantee the teacher's `dashmap`-backed
//! routing tables give for node/shard maps.

pub mod buckets;
pub mod endpoint;

pub use buckets::Buckets;
pub use endpoint::Endpoint;

use dashmap::DashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct Dispatcher {
    routes: DashMap<i32, Arc<Buckets>>,
    events: DashMap<i32, Arc<Buckets>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            routes: DashMap::new(),
            events: DashMap::new(),
        }
    }

    /// Atomically replace the endpoint set for `route_id`. A single
    /// `DashMap` insert is the swap; no partial state is ever visible.
    pub fn rebuild_route(&self, route_id: i32, buckets: Buckets) {
        self.routes.insert(route_id, Arc::new(buckets));
    }

    pub fn route_buckets(&self, route_id: i32) -> Option<Arc<Buckets>> {
        self.routes.get(&route_id).map(|e| e.clone())
    }

    pub fn remove_route(&self, route_id: i32) {
        self.routes.remove(&route_id);
    }

    pub fn rebuild_event(&self, event_id: i32, buckets: Buckets) {
        self.events.insert(event_id, Arc::new(buckets));
    }

    pub fn event_buckets(&self, event_id: i32) -> Option<Arc<Buckets>> {
        self.events.get(&event_id).map(|e| e.clone())
    }

    pub fn remove_event(&self, event_id: i32) {
        self.events.remove(&event_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebuild_is_visible_immediately_and_wholesale() {
        let dispatcher = Dispatcher::new();
        dispatcher.rebuild_route(
            1,
            Buckets {
                b1: vec![Endpoint::new("n1", "addr1", 1)],
                ..Default::default()
            },
        );
        let buckets = dispatcher.route_buckets(1).unwrap();
        assert_eq!(buckets.len(), 1);

        dispatcher.rebuild_route(
            1,
            Buckets {
                b1: vec![Endpoint::new("n2", "addr2", 1), Endpoint::new("n3", "addr3", 1)],
                ..Default::default()
            },
        );
        let buckets = dispatcher.route_buckets(1).unwrap();
        assert_eq!(buckets.len(), 2);
    }

    #[test]
    fn missing_route_returns_none() {
        let dispatcher = Dispatcher::new();
        assert!(dispatcher.route_buckets(42).is_none());
    }

    #[test]
    fn events_are_tracked_separately_from_routes() {
        let dispatcher = Dispatcher::new();
        dispatcher.rebuild_event(7, Buckets::default());
        assert!(dispatcher.event_buckets(7).is_some());
        assert!(dispatcher.route_buckets(7).is_none());
    }
}
