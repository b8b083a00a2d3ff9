//! Connection registry and accept loops for both transports, grounded in
//! the teacher's `networking/transport/mod.rs` connection-pool shape and
//! `network/{tcp,ws}/server_conn.go`'s per-transport `serverConnMgr`.

use super::handlers::{ConnectionHandlers, SharedHandlers};
use super::tcp::{self, TcpConnection};
use super::ws::{self, WsConnection};
use crate::config::GateConfig;
use crate::error::{GateMeshError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::net::{TcpListener, TcpStream};

/// Wraps the caller's handlers so a connection closing also reclaims its
/// slot in the manager's registry; `conns`/`count()` would otherwise grow
/// without bound since nothing else ever removes a finished entry.
struct RecyclingHandlers {
    manager: Weak<ConnectionManager>,
    inner: SharedHandlers,
}

#[async_trait]
impl ConnectionHandlers for RecyclingHandlers {
    async fn on_connect(&self, conn_id: u64) {
        self.inner.on_connect(conn_id).await;
    }

    async fn on_disconnect(&self, conn_id: u64) {
        self.inner.on_disconnect(conn_id).await;
        if let Some(manager) = self.manager.upgrade() {
            manager.remove(conn_id);
        }
    }

    async fn on_receive(&self, conn_id: u64, route: u8, seq: u64, body: Bytes) {
        self.inner.on_receive(conn_id, route, seq, body).await;
    }
}

/// Either flavor of live connection, keyed by the same ID space.
#[derive(Clone)]
pub enum Conn {
    Tcp(Arc<TcpConnection>),
    Ws(Arc<WsConnection>),
}

impl Conn {
    pub fn id(&self) -> u64 {
        match self {
            Conn::Tcp(c) => c.id(),
            Conn::Ws(c) => c.id(),
        }
    }

    pub fn uid(&self) -> i64 {
        match self {
            Conn::Tcp(c) => c.uid(),
            Conn::Ws(c) => c.uid(),
        }
    }

    pub fn bind(&self, uid: i64) {
        match self {
            Conn::Tcp(c) => c.bind(uid),
            Conn::Ws(c) => c.bind(uid),
        }
    }

    pub async fn send(&self, body: &[u8], route: u8, seq: u64) -> Result<()> {
        match self {
            Conn::Tcp(c) => c.send(body, route, seq).await,
            Conn::Ws(c) => c.send(body, route, seq).await,
        }
    }

    pub async fn push(&self, body: &[u8], route: u8, seq: u64) -> Result<()> {
        match self {
            Conn::Tcp(c) => c.push(body, route, seq).await,
            Conn::Ws(c) => c.push(body, route, seq).await,
        }
    }

    pub async fn grace_close(&self) -> Result<()> {
        match self {
            Conn::Tcp(c) => c.grace_close().await,
            Conn::Ws(c) => c.grace_close().await,
        }
    }

    pub async fn force_close(&self) -> Result<()> {
        match self {
            Conn::Tcp(c) => c.force_close().await,
            Conn::Ws(c) => c.force_close().await,
        }
    }
}

/// Owns every live connection and hands out monotonically increasing IDs,
/// matching `serverConnMgr`'s responsibility split from `serverConn`
/// itself.
pub struct ConnectionManager {
    config: GateConfig,
    handlers: SharedHandlers,
    next_id: AtomicU64,
    conns: DashMap<u64, Conn>,
}

impl ConnectionManager {
    pub fn new(config: GateConfig, handlers: SharedHandlers) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            config,
            handlers: Arc::new(RecyclingHandlers {
                manager: weak.clone(),
                inner: handlers,
            }),
            next_id: AtomicU64::new(1),
            conns: DashMap::new(),
        })
    }

    pub fn get(&self, id: u64) -> Option<Conn> {
        self.conns.get(&id).map(|c| c.clone())
    }

    pub fn count(&self) -> usize {
        self.conns.len()
    }

    pub fn remove(&self, id: u64) {
        self.conns.remove(&id);
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Accept TCP connections until the listener errors out, registering
    /// and wiring up each one. Rejects new connections once
    /// `max_connections` is reached, matching the teacher's admission
    /// check ahead of the business-level accept handshake.
    pub async fn accept_tcp(self: &Arc<Self>, listener: TcpListener) -> Result<()> {
        loop {
            let (stream, _peer) = listener.accept().await?;
            if self.conns.len() >= self.config.limits.max_connections {
                drop(stream);
                continue;
            }
            self.register_tcp(stream)?;
        }
    }

    fn register_tcp(self: &Arc<Self>, stream: TcpStream) -> Result<u64> {
        let id = self.next_id();
        let conn = tcp::spawn(
            id,
            stream,
            self.config.heartbeat.clone(),
            self.config.limits.authorize_timeout,
            self.handlers.clone(),
            self.config.limits.tcp_write_queue,
        )?;
        self.conns.insert(id, Conn::Tcp(conn));
        let handlers = self.handlers.clone();
        tokio::spawn(async move { handlers.on_connect(id).await });
        Ok(id)
    }

    /// Accept one already-upgraded WebSocket stream.
    pub fn register_ws(
        self: &Arc<Self>,
        ws: tokio_tungstenite::WebSocketStream<TcpStream>,
    ) -> Result<u64> {
        if self.conns.len() >= self.config.limits.max_connections {
            return Err(GateMeshError::Internal("max connections reached".into()));
        }
        let id = self.next_id();
        let conn = ws::spawn(
            id,
            ws,
            self.config.heartbeat.clone(),
            self.config.limits.authorize_timeout,
            self.handlers.clone(),
            self.config.limits.ws_high_write_queue,
            self.config.limits.ws_low_write_queue,
        );
        self.conns.insert(id, Conn::Ws(conn));
        let handlers = self.handlers.clone();
        tokio::spawn(async move { handlers.on_connect(id).await });
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::handlers::ConnectionHandlers;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::AtomicUsize;

    struct CountingHandlers {
        connects: AtomicUsize,
    }

    #[async_trait]
    impl ConnectionHandlers for CountingHandlers {
        async fn on_connect(&self, _conn_id: u64) {
            self.connects.fetch_add(1, Ordering::SeqCst);
        }
        async fn on_disconnect(&self, _conn_id: u64) {}
        async fn on_receive(&self, _conn_id: u64, _route: u8, _seq: u64, _body: Bytes) {}
    }

    #[tokio::test]
    async fn rejects_connections_past_the_limit() {
        let mut config = GateConfig::default();
        config.limits.max_connections = 0;
        let handlers = Arc::new(CountingHandlers {
            connects: AtomicUsize::new(0),
        });
        let manager = ConnectionManager::new(config, handlers);
        assert_eq!(manager.count(), 0);
    }
}
