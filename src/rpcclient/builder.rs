//! Keyed client cache with coalescing builds and background retry,
//! grounded in `internal/transporter/gate/builder_test.go`'s
//! `Builder.Build(addr)` contract and `internal/transporter/internal/
//! client/options.go`'s `Options{Addr, InsID, InsKind, CloseHandler}`.

use super::client::RpcClient;
use super::target::Target;
use crate::config::RpcClientConfig;
use crate::error::{GateMeshError, Result};
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;

pub type CloseHandler = Arc<dyn Fn(&str) + Send + Sync>;

pub struct RpcClientOptions {
    pub ins_id: String,
    pub close_handler: Option<CloseHandler>,
}

/// Builds and caches one `RpcClient` per address. Concurrent `build()`
/// calls for the same address coalesce onto the same dial attempt via a
/// per-address `Mutex`; a failed dial returns immediately to the first
/// caller while a background task keeps retrying with exponential
/// backoff so the *next* `build()` can pick up a warm client.
pub struct RpcClientBuilder {
    config: RpcClientConfig,
    options: RpcClientOptions,
    clients: DashMap<String, Arc<RpcClient>>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    /// `discovery://name` -> last-known address, populated by whoever
    /// watches the discovery backend (see `linker::watch_cluster_instance`).
    instances: DashMap<String, String>,
}

impl RpcClientBuilder {
    pub fn new(config: RpcClientConfig, options: RpcClientOptions) -> Arc<Self> {
        Arc::new(Self {
            config,
            options,
            clients: DashMap::new(),
            locks: DashMap::new(),
            instances: DashMap::new(),
        })
    }

    fn lock_for(&self, addr: &str) -> Arc<Mutex<()>> {
        self.locks.entry(addr.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Record the address a discovery-resolved instance name currently
    /// dials to.
    pub fn register_instance(&self, instance_id: &str, address: &str) {
        self.instances.insert(instance_id.to_string(), address.to_string());
    }

    /// Drop a discovery-resolved instance, returning its last-known
    /// address (if any) so the caller can evict the matching client.
    pub fn unregister_instance(&self, instance_id: &str) -> Option<String> {
        self.instances.remove(instance_id).map(|(_, addr)| addr)
    }

    /// Turn a `direct://`/`discovery://`/bare target into a dialable
    /// address, resolving `discovery://` through the instance registry.
    fn resolve(&self, target: &str) -> Result<String> {
        match Target::parse(target) {
            Target::Direct(addr) => Ok(addr),
            Target::Discovery(name) => self
                .instances
                .get(&name)
                .map(|addr| addr.clone())
                .ok_or(GateMeshError::NotFoundSession(name)),
        }
    }

    pub async fn build(self: &Arc<Self>, target: &str) -> Result<Arc<RpcClient>> {
        let addr = self.resolve(target)?;

        if let Some(client) = self.clients.get(&addr) {
            return Ok(client.clone());
        }

        let lock = self.lock_for(&addr);
        let _guard = lock.lock().await;

        if let Some(client) = self.clients.get(&addr) {
            return Ok(client.clone());
        }

        match self.dial(&addr).await {
            Ok(client) => {
                self.clients.insert(addr, client.clone());
                Ok(client)
            }
            Err(err) => {
                self.spawn_retry(addr);
                Err(err)
            }
        }
    }

    /// Connect, wiring a close hook so the client self-evicts from the
    /// cache (and fires `CloseHandler`) the moment its socket dies,
    /// whether `build()` or `spawn_retry()` established it.
    async fn dial(self: &Arc<Self>, addr: &str) -> Result<Arc<RpcClient>> {
        let builder: Weak<RpcClientBuilder> = Arc::downgrade(self);
        let addr_owned = addr.to_string();
        RpcClient::connect_with_on_close(addr, move || {
            if let Some(builder) = builder.upgrade() {
                builder.evict(&addr_owned);
            }
        })
        .await
    }

    fn spawn_retry(self: &Arc<Self>, addr: String) {
        let builder = self.clone();
        tokio::spawn(async move {
            let mut backoff = builder.config.initial_backoff;
            loop {
                tokio::time::sleep(backoff).await;
                if builder.clients.contains_key(&addr) {
                    return;
                }
                if let Ok(client) = builder.dial(&addr).await {
                    builder.clients.insert(addr.clone(), client);
                    return;
                }
                backoff = std::cmp::min(
                    builder.config.max_backoff,
                    backoff.mul_f64(builder.config.backoff_multiplier),
                );
            }
        });
    }

    /// Evict a client, e.g. after the transport reports it dead, invoking
    /// the configured `CloseHandler` the way the Go builder's eviction
    /// callback notifies the owning registry entry.
    pub fn evict(&self, addr: &str) {
        if self.clients.remove(addr).is_some() {
            if let Some(handler) = &self.options.close_handler {
                handler(addr);
            }
        }
    }

    pub fn ins_id(&self) -> &str {
        &self.options.ins_id
    }

    pub fn cached_count(&self) -> usize {
        self.clients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn build_against_unreachable_address_fails_fast_and_schedules_retry() {
        let builder = RpcClientBuilder::new(
            RpcClientConfig {
                initial_backoff: std::time::Duration::from_millis(5),
                max_backoff: std::time::Duration::from_millis(20),
                backoff_multiplier: 2.0,
            },
            RpcClientOptions {
                ins_id: "node-1".to_string(),
                close_handler: None,
            },
        );
        let result = builder.build("127.0.0.1:1").await;
        assert!(matches!(result, Err(GateMeshError::Io(_))));
        assert_eq!(builder.cached_count(), 0);
    }

    #[tokio::test]
    async fn evict_invokes_close_handler_only_when_present() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let builder = RpcClientBuilder::new(
            RpcClientConfig::default(),
            RpcClientOptions {
                ins_id: "node-1".to_string(),
                close_handler: Some(Arc::new(move |_addr| {
                    calls2.fetch_add(1, Ordering::SeqCst);
                })),
            },
        );
        builder.evict("127.0.0.1:9000");
        assert_eq!(calls.load(Ordering::SeqCst), 0, "nothing cached, nothing to evict");
    }

    #[tokio::test]
    async fn build_rejects_unresolved_discovery_target() {
        let builder = RpcClientBuilder::new(
            RpcClientConfig::default(),
            RpcClientOptions {
                ins_id: "node-1".to_string(),
                close_handler: None,
            },
        );
        let err = builder.build("discovery://unknown-service").await.unwrap_err();
        assert!(matches!(err, GateMeshError::NotFoundSession(name) if name == "unknown-service"));
    }

    #[tokio::test]
    async fn build_resolves_a_registered_discovery_target_to_its_address() {
        let builder = RpcClientBuilder::new(
            RpcClientConfig {
                initial_backoff: std::time::Duration::from_millis(5),
                max_backoff: std::time::Duration::from_millis(20),
                backoff_multiplier: 2.0,
            },
            RpcClientOptions {
                ins_id: "node-1".to_string(),
                close_handler: None,
            },
        );
        builder.register_instance("node-cluster", "127.0.0.1:1");
        // Unreachable, but this proves resolution happened: a raw
        // "discovery://node-cluster" dial would otherwise fail at parse,
        // not at connect.
        let err = builder.build("discovery://node-cluster").await.unwrap_err();
        assert!(matches!(err, GateMeshError::Io(_)));
    }
}
