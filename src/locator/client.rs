use super::LocatorBackend;
use crate::error::Result;
use std::sync::Arc;

/// Thin facade over a `LocatorBackend`, giving the Gate proxy and node
/// linker the exact call shapes `cluster/gate/proxy.go`'s `bindGate`/
/// `unbindGate` use, independent of which backend is plugged in.
#[derive(Clone)]
pub struct LocatorClient {
    backend: Arc<dyn LocatorBackend>,
}

impl LocatorClient {
    pub fn new(backend: Arc<dyn LocatorBackend>) -> Self {
        Self { backend }
    }

    pub async fn bind_gate(&self, uid: i64, gid: &str) -> Result<()> {
        self.backend.bind_gate(uid, gid).await
    }

    pub async fn unbind_gate(&self, uid: i64, gid: &str) -> Result<()> {
        self.backend.unbind_gate(uid, gid).await
    }

    pub async fn locate_gate(&self, uid: i64) -> Result<Option<String>> {
        self.backend.locate_gate(uid).await
    }

    pub async fn bind_node(&self, uid: i64, route: i32, nid: &str) -> Result<()> {
        self.backend.bind_node(uid, route, nid).await
    }

    pub async fn unbind_node(&self, uid: i64, route: i32, nid: &str) -> Result<()> {
        self.backend.unbind_node(uid, route, nid).await
    }

    pub async fn locate_node(&self, uid: i64, route: i32) -> Result<Option<String>> {
        self.backend.locate_node(uid, route).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::MemoryLocator;

    #[tokio::test]
    async fn client_delegates_to_backend() {
        let client = LocatorClient::new(Arc::new(MemoryLocator::new()));
        client.bind_gate(1, "gate-a").await.unwrap();
        assert_eq!(client.locate_gate(1).await.unwrap(), Some("gate-a".to_string()));
    }
}
