//! User-location binding: which Gate and which Node a user is currently
//! attached to. Mirrors the teacher's `ServiceDiscovery` trait-plus-backends
//! shape (`async_trait`, `Send + Sync`, a handful of pluggable
//! implementations) applied to session binding rather than node discovery.

pub mod client;
pub mod memory;
pub mod redis_stub;

pub use client::LocatorClient;
pub use memory::MemoryLocator;
pub use redis_stub::RedisLocatorStub;

use crate::error::Result;
use async_trait::async_trait;

/// Backend contract for where a user's Gate/Node binding lives. Real
/// deployments back this with Redis or another shared store; this crate
/// ships only [`MemoryLocator`] (a working in-process implementation) and
/// [`RedisLocatorStub`] (documents the wire contract, always returns
/// `Backend` errors).
#[async_trait]
pub trait LocatorBackend: Send + Sync {
    async fn bind_gate(&self, uid: i64, gid: &str) -> Result<()>;
    async fn unbind_gate(&self, uid: i64, gid: &str) -> Result<()>;
    async fn locate_gate(&self, uid: i64) -> Result<Option<String>>;

    async fn bind_node(&self, uid: i64, route: i32, nid: &str) -> Result<()>;
    async fn unbind_node(&self, uid: i64, route: i32, nid: &str) -> Result<()>;
    async fn locate_node(&self, uid: i64, route: i32) -> Result<Option<String>>;
}
