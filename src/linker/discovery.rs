//! Discovery backend contract the node linker polls to keep its route
//! table and dispatcher buckets current. Real backends (Consul, etcd,
//! DNS, a static list) are out of scope for this crate; only the trait
//! and an in-memory test double are provided, mirroring the teacher's
//! `ServiceDiscovery` trait with its `consul.rs`/`etcd.rs`/`dns.rs`
//! plugins left as thin glue in the example pack.

use crate::dispatcher::Endpoint;
use crate::route::RouteEntry;
use async_trait::async_trait;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    RoutesChanged(Vec<RouteEntry>),
    EndpointsChanged { route_id: i32, endpoints: Vec<Endpoint> },
    InstanceRemoved { instance_id: String },
}

#[async_trait]
pub trait DiscoveryBackend: Send + Sync {
    /// Start watching and return the receiving end of a change stream.
    /// Each call starts an independent watch; backends with a single
    /// upstream subscription should fan a cached receiver out internally.
    async fn watch(&self) -> mpsc::Receiver<DiscoveryEvent>;
}

/// Test double: replays a fixed, pre-seeded sequence of events and then
/// closes the channel, enough to exercise `NodeLinker`'s watch loops
/// without a real registry client.
#[derive(Default)]
pub struct InMemoryDiscovery {
    events: Vec<DiscoveryEvent>,
}

impl InMemoryDiscovery {
    pub fn new(events: Vec<DiscoveryEvent>) -> Self {
        Self { events }
    }
}

#[async_trait]
impl DiscoveryBackend for InMemoryDiscovery {
    async fn watch(&self) -> mpsc::Receiver<DiscoveryEvent> {
        let (tx, rx) = mpsc::channel(self.events.len().max(1));
        for event in self.events.clone() {
            let _ = tx.send(event).await;
        }
        rx
    }
}
