use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// Lifecycle callbacks a transport's connection manager invokes. A Gate
/// (or test harness) implements this once and hands it to
/// [`super::manager::ConnectionManager`], matching the teacher's
/// `connectHandler`/`disconnectHandler`/`receiveHandler` trio.
#[async_trait]
pub trait ConnectionHandlers: Send + Sync {
    async fn on_connect(&self, conn_id: u64);
    async fn on_disconnect(&self, conn_id: u64);
    async fn on_receive(&self, conn_id: u64, route: u8, seq: u64, body: Bytes);
}

pub type SharedHandlers = Arc<dyn ConnectionHandlers>;
