use super::LocatorBackend;
use crate::error::{GateMeshError, Result};
use async_trait::async_trait;

/// Documents the wire contract a real Redis-backed locator would satisfy
/// (same key scheme as the teacher's discovery backends: `gate:{uid}`,
/// `node:{uid}:{route}`) without carrying a Redis client dependency. Every
/// call fails with `Backend`, exercising the "backend unavailable, caller
/// decides to retry or degrade" path.
pub struct RedisLocatorStub {
    pub addr: String,
}

impl RedisLocatorStub {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    fn unavailable(&self) -> GateMeshError {
        GateMeshError::Backend(format!("redis locator backend not implemented: {}", self.addr))
    }
}

#[async_trait]
impl LocatorBackend for RedisLocatorStub {
    async fn bind_gate(&self, _uid: i64, _gid: &str) -> Result<()> {
        Err(self.unavailable())
    }

    async fn unbind_gate(&self, _uid: i64, _gid: &str) -> Result<()> {
        Err(self.unavailable())
    }

    async fn locate_gate(&self, _uid: i64) -> Result<Option<String>> {
        Err(self.unavailable())
    }

    async fn bind_node(&self, _uid: i64, _route: i32, _nid: &str) -> Result<()> {
        Err(self.unavailable())
    }

    async fn unbind_node(&self, _uid: i64, _route: i32, _nid: &str) -> Result<()> {
        Err(self.unavailable())
    }

    async fn locate_node(&self, _uid: i64, _route: i32) -> Result<Option<String>> {
        Err(self.unavailable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_call_reports_backend_unavailable() {
        let locator = RedisLocatorStub::new("127.0.0.1:6379");
        assert!(matches!(locator.locate_gate(1).await, Err(GateMeshError::Backend(_))));
        assert!(matches!(locator.bind_node(1, 1, "n").await, Err(GateMeshError::Backend(_))));
    }
}
