//! Node linker: resolves a client message or cluster event to a Node
//! endpoint and calls it, composing the dispatcher, locator, route table,
//! and RPC client builder. Grounded in `cluster/gate/proxy.go` (the
//! `deliver`/`trigger`/`watch` call shapes) and `networking/routing/
//! router.rs` (resolve-then-call structure).

pub mod discovery;

pub use discovery::{DiscoveryBackend, DiscoveryEvent};

use crate::dispatcher::Dispatcher;
use crate::error::{GateMeshError, Result};
use crate::locator::LocatorClient;
use crate::protocol::Code;
use crate::rpcclient::RpcClientBuilder;
use crate::route::RouteTable;
use bytes::Bytes;
use std::sync::Arc;

pub struct DeliverArgs {
    pub cid: i64,
    pub uid: i64,
    pub route: i32,
    pub message: Bytes,
}

pub struct TriggerArgs {
    pub event: i32,
    pub cid: i64,
    pub uid: i64,
}

pub struct NodeLinker {
    dispatcher: Arc<Dispatcher>,
    locator: Arc<LocatorClient>,
    rpc: Arc<RpcClientBuilder>,
    routes: Arc<RouteTable>,
}

impl NodeLinker {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        locator: Arc<LocatorClient>,
        rpc: Arc<RpcClientBuilder>,
        routes: Arc<RouteTable>,
    ) -> Arc<Self> {
        Arc::new(Self {
            dispatcher,
            locator,
            rpc,
            routes,
        })
    }

    /// Classify an error the way `proxy.go` does at every call site:
    /// routing misses are warnings, anything else is an error.
    pub fn is_warning(err: &GateMeshError) -> bool {
        err.is_routing_warning()
    }

    async fn resolve_address(&self, uid: i64, route: i32) -> Result<String> {
        let flags = self
            .routes
            .flags(route)
            .ok_or(GateMeshError::NotFoundRoute(route))?;

        if flags.stateful {
            self.locator
                .locate_node(uid, route)
                .await?
                .ok_or(GateMeshError::NotFoundUserLocation(uid))
        } else {
            let buckets = self
                .dispatcher
                .route_buckets(route)
                .ok_or(GateMeshError::NotFoundEndpoint(route))?;
            buckets
                .pick_weighted()
                .map(|ep| ep.address.clone())
                .ok_or(GateMeshError::NotFoundEndpoint(route))
        }
    }

    pub async fn deliver(&self, args: DeliverArgs) -> Result<()> {
        let addr = self.resolve_address(args.uid, args.route).await?;
        let client = self
            .rpc
            .build(&addr)
            .await
            .map_err(|e| GateMeshError::Backend(e.to_string()))?;
        let code = client.deliver(args.cid, args.uid, &args.message).await?;
        if code != Code::Ok as u16 {
            return Err(GateMeshError::Backend(format!("deliver rejected with code {code}")));
        }
        Ok(())
    }

    /// Fan out a trigger to every subscriber of `event`, matching
    /// `proxy.trigger`'s best-effort broadcast (failures are classified
    /// and logged by the caller, never aggregated into one error).
    pub async fn trigger(&self, args: TriggerArgs) -> Result<()> {
        let buckets = self
            .dispatcher
            .event_buckets(args.event)
            .ok_or(GateMeshError::NotFoundEvent(args.event))?;

        let mut targets = Vec::new();
        buckets.visit_all(|ep| targets.push(ep.address.clone()));
        if targets.is_empty() {
            return Err(GateMeshError::NotFoundEvent(args.event));
        }

        for addr in targets {
            let client = match self.rpc.build(&addr).await {
                Ok(c) => c,
                Err(_) => continue,
            };
            let _ = client.trigger(args.event, args.cid, args.uid).await;
        }
        Ok(())
    }

    /// Poll a discovery backend for user-location events and replay them
    /// into the locator/route table. The backend itself is a test double
    /// in this crate; a real deployment plugs in Consul/etcd/DNS.
    pub fn watch_user_locate(self: &Arc<Self>, backend: Arc<dyn DiscoveryBackend>) {
        let linker = self.clone();
        tokio::spawn(async move {
            let mut rx = backend.watch().await;
            while let Some(event) = rx.recv().await {
                if let DiscoveryEvent::RoutesChanged(routes) = event {
                    linker.routes.replace_all(routes);
                }
            }
        });
    }

    pub fn watch_cluster_instance(self: &Arc<Self>, backend: Arc<dyn DiscoveryBackend>) {
        let linker = self.clone();
        tokio::spawn(async move {
            let mut rx = backend.watch().await;
            while let Some(event) = rx.recv().await {
                match event {
                    DiscoveryEvent::EndpointsChanged { route_id, endpoints } => {
                        for ep in &endpoints {
                            linker.rpc.register_instance(&ep.instance_id, &ep.address);
                        }
                        let mut buckets = crate::dispatcher::Buckets::default();
                        buckets.b1 = endpoints;
                        linker.dispatcher.rebuild_route(route_id, buckets);
                    }
                    DiscoveryEvent::InstanceRemoved { instance_id } => {
                        if let Some(addr) = linker.rpc.unregister_instance(&instance_id) {
                            linker.rpc.evict(&addr);
                        }
                    }
                    DiscoveryEvent::RoutesChanged(_) => {}
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::MemoryLocator;
    use crate::route::RouteFlags;
    use crate::config::RpcClientConfig;
    use crate::rpcclient::RpcClientOptions;

    fn make_linker() -> Arc<NodeLinker> {
        let dispatcher = Arc::new(Dispatcher::new());
        let locator = Arc::new(LocatorClient::new(Arc::new(MemoryLocator::new())));
        let rpc = RpcClientBuilder::new(
            RpcClientConfig::default(),
            RpcClientOptions {
                ins_id: "gate-1".to_string(),
                close_handler: None,
            },
        );
        let routes = Arc::new(RouteTable::new());
        NodeLinker::new(dispatcher, locator, rpc, routes)
    }

    #[tokio::test]
    async fn deliver_without_registered_route_is_not_found_route() {
        let linker = make_linker();
        let err = linker
            .deliver(DeliverArgs {
                cid: 1,
                uid: 1,
                route: 99,
                message: Bytes::from_static(b"hi"),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GateMeshError::NotFoundRoute(99)));
        assert!(NodeLinker::is_warning(&err));
    }

    #[tokio::test]
    async fn deliver_stateful_route_without_user_location_is_not_found_user_location() {
        let linker = make_linker();
        linker.routes.register(
            1,
            RouteFlags {
                internal: false,
                stateful: true,
                authorized: false,
            },
        );
        let err = linker
            .deliver(DeliverArgs {
                cid: 1,
                uid: 42,
                route: 1,
                message: Bytes::from_static(b"hi"),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GateMeshError::NotFoundUserLocation(42)));
    }

    #[tokio::test]
    async fn deliver_nonstateful_route_without_endpoints_is_not_found_endpoint() {
        let linker = make_linker();
        linker.routes.register(1, RouteFlags::default());
        let err = linker
            .deliver(DeliverArgs {
                cid: 1,
                uid: 42,
                route: 1,
                message: Bytes::from_static(b"hi"),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GateMeshError::NotFoundEndpoint(1)));
        assert!(NodeLinker::is_warning(&err));
    }

    #[tokio::test]
    async fn trigger_without_subscribers_is_not_found_event() {
        let linker = make_linker();
        let err = linker
            .trigger(TriggerArgs {
                event: 7,
                cid: 1,
                uid: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GateMeshError::NotFoundEvent(7)));
    }
}
