//! Exercises the TCP connection FSM over real loopback sockets: the
//! authorize timer force-closing an unbound connection, and the
//! heartbeat ticker force-closing a silent one.

use async_trait::async_trait;
use bytes::Bytes;
use gatemesh::config::{HeartbeatConfig, HeartbeatMechanism};
use gatemesh::transport::handlers::ConnectionHandlers;
use gatemesh::transport::{tcp, ConnState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};

struct TrackingHandlers {
    disconnected: Arc<AtomicBool>,
}

#[async_trait]
impl ConnectionHandlers for TrackingHandlers {
    async fn on_connect(&self, _conn_id: u64) {}
    async fn on_disconnect(&self, _conn_id: u64) {
        self.disconnected.store(true, Ordering::SeqCst);
    }
    async fn on_receive(&self, _conn_id: u64, _route: u8, _seq: u64, _body: Bytes) {}
}

async fn accepted_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr).await.unwrap();
    let (server, _) = listener.accept().await.unwrap();
    (server, client)
}

#[tokio::test]
async fn authorize_timeout_force_closes_an_unbound_connection() {
    let (server, _client) = accepted_pair().await;
    let disconnected = Arc::new(AtomicBool::new(false));
    let handlers = Arc::new(TrackingHandlers {
        disconnected: disconnected.clone(),
    });

    let conn = tcp::spawn(
        1,
        server,
        HeartbeatConfig {
            interval: Duration::ZERO,
            mechanism: HeartbeatMechanism::Tick,
        },
        Duration::from_millis(30),
        handlers,
        64,
    )
    .unwrap();

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(conn.state(), ConnState::Closed);
}

#[tokio::test]
async fn binding_before_the_deadline_cancels_the_authorize_timer() {
    let (server, _client) = accepted_pair().await;
    let handlers = Arc::new(TrackingHandlers {
        disconnected: Arc::new(AtomicBool::new(false)),
    });

    let conn = tcp::spawn(
        1,
        server,
        HeartbeatConfig {
            interval: Duration::ZERO,
            mechanism: HeartbeatMechanism::Tick,
        },
        Duration::from_millis(50),
        handlers,
        64,
    )
    .unwrap();

    conn.bind(42);
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(conn.state(), ConnState::Opened);
}

#[tokio::test]
async fn heartbeat_timeout_force_closes_a_silent_connection() {
    let (server, _client) = accepted_pair().await;
    let disconnected = Arc::new(AtomicBool::new(false));
    let handlers = Arc::new(TrackingHandlers {
        disconnected: disconnected.clone(),
    });

    let conn = tcp::spawn(
        1,
        server,
        HeartbeatConfig {
            interval: Duration::from_millis(30),
            mechanism: HeartbeatMechanism::Tick,
        },
        Duration::ZERO,
        handlers,
        64,
    )
    .unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(conn.state(), ConnState::Closed);
    assert!(disconnected.load(Ordering::SeqCst));
}
