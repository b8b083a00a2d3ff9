use super::LocatorBackend;
use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;

/// In-process `LocatorBackend`, good enough to drive the whole pipeline in
/// tests and single-node deployments without a real shared store.
#[derive(Default)]
pub struct MemoryLocator {
    gates: DashMap<i64, String>,
    nodes: DashMap<(i64, i32), String>,
}

impl MemoryLocator {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocatorBackend for MemoryLocator {
    async fn bind_gate(&self, uid: i64, gid: &str) -> Result<()> {
        self.gates.insert(uid, gid.to_string());
        Ok(())
    }

    async fn unbind_gate(&self, uid: i64, gid: &str) -> Result<()> {
        // Only clear the binding if it still points at the caller's gate —
        // a stale unbind racing a newer bind must not evict the new owner.
        self.gates.remove_if(&uid, |_, current| current == gid);
        Ok(())
    }

    async fn locate_gate(&self, uid: i64) -> Result<Option<String>> {
        Ok(self.gates.get(&uid).map(|v| v.clone()))
    }

    async fn bind_node(&self, uid: i64, route: i32, nid: &str) -> Result<()> {
        self.nodes.insert((uid, route), nid.to_string());
        Ok(())
    }

    async fn unbind_node(&self, uid: i64, route: i32, nid: &str) -> Result<()> {
        self.nodes.remove_if(&(uid, route), |_, current| current == nid);
        Ok(())
    }

    async fn locate_node(&self, uid: i64, route: i32) -> Result<Option<String>> {
        Ok(self.nodes.get(&(uid, route)).map(|v| v.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_and_locate_gate() {
        let locator = MemoryLocator::new();
        locator.bind_gate(1, "gate-a").await.unwrap();
        assert_eq!(locator.locate_gate(1).await.unwrap(), Some("gate-a".to_string()));
    }

    #[tokio::test]
    async fn unbind_ignores_stale_owner() {
        let locator = MemoryLocator::new();
        locator.bind_gate(1, "gate-a").await.unwrap();
        locator.bind_gate(1, "gate-b").await.unwrap();
        locator.unbind_gate(1, "gate-a").await.unwrap();
        assert_eq!(locator.locate_gate(1).await.unwrap(), Some("gate-b".to_string()));
    }

    #[tokio::test]
    async fn locate_missing_user_is_none() {
        let locator = MemoryLocator::new();
        assert_eq!(locator.locate_gate(999).await.unwrap(), None);
        assert_eq!(locator.locate_node(999, 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn node_binding_is_scoped_per_route() {
        let locator = MemoryLocator::new();
        locator.bind_node(1, 10, "node-a").await.unwrap();
        locator.bind_node(1, 20, "node-b").await.unwrap();
        assert_eq!(locator.locate_node(1, 10).await.unwrap(), Some("node-a".to_string()));
        assert_eq!(locator.locate_node(1, 20).await.unwrap(), Some("node-b".to_string()));
    }
}
