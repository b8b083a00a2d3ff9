//! Gate-side facade in front of the node linker, mirroring
//! `cluster/gate/proxy.go`'s `bindGate`/`unbindGate`/`deliver`/`trigger`/
//! `watch` methods: thin wrappers that translate connection-manager
//! events into linker calls and classify/log the results.

use crate::error::GateMeshError;
use crate::linker::{DeliverArgs, DiscoveryBackend, NodeLinker, TriggerArgs};
use crate::locator::LocatorClient;
use bytes::Bytes;
use std::sync::Arc;

/// Event IDs the proxy itself raises, distinct from application-level
/// `Trigger` events a Node subscribes to.
pub mod event {
    pub const RECONNECT: i32 = 1;
    pub const DISCONNECT: i32 = 2;
}

pub struct GateProxy {
    instance_id: String,
    locator: Arc<LocatorClient>,
    linker: Arc<NodeLinker>,
}

impl GateProxy {
    pub fn new(instance_id: impl Into<String>, locator: Arc<LocatorClient>, linker: Arc<NodeLinker>) -> Self {
        Self {
            instance_id: instance_id.into(),
            locator,
            linker,
        }
    }

    /// Bind a user to this gate instance, then announce the reconnect so
    /// any Node holding cross-session state can catch up.
    pub async fn bind_gate(&self, cid: i64, uid: i64) -> Result<(), GateMeshError> {
        self.locator.bind_gate(uid, &self.instance_id).await?;
        self.trigger(event::RECONNECT, cid, uid).await;
        Ok(())
    }

    pub async fn unbind_gate(&self, cid: i64, uid: i64) -> Result<(), GateMeshError> {
        if let Err(err) = self.locator.unbind_gate(uid, &self.instance_id).await {
            tracing::error!(gid = %self.instance_id, cid, uid, %err, "user unbind failed");
            return Err(err);
        }
        Ok(())
    }

    /// Trigger an event, logging misses as warnings and everything else
    /// as errors, never propagating the failure to the caller — matches
    /// `proxy.trigger`'s fire-and-forget semantics.
    pub async fn trigger(&self, event: i32, cid: i64, uid: i64) {
        if let Err(err) = self.linker.trigger(TriggerArgs { event, cid, uid }).await {
            if NodeLinker::is_warning(&err) {
                tracing::warn!(cid, uid, event, %err, "trigger event failed");
            } else {
                tracing::error!(cid, uid, event, %err, "trigger event failed");
            }
        }
    }

    /// Deliver a client message to its destination Node, same
    /// warn-vs-error split as `trigger`.
    pub async fn deliver(&self, cid: i64, uid: i64, route: i32, message: Bytes) {
        if let Err(err) = self.linker.deliver(DeliverArgs { cid, uid, route, message }).await {
            if NodeLinker::is_warning(&err) {
                tracing::warn!(cid, uid, route, %err, "deliver message failed");
            } else {
                tracing::error!(cid, uid, route, %err, "deliver message failed");
            }
        }
    }

    /// Start the linker's background watch loops.
    pub fn watch(self: &Arc<Self>, backend: Arc<dyn DiscoveryBackend>) {
        self.linker.watch_user_locate(backend.clone());
        self.linker.watch_cluster_instance(backend);
    }
}
