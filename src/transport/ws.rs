//! WebSocket connection: two write queues (`high` for heartbeats and
//! control traffic, `low` for everything else), ported from
//! `network/ws/server_conn.go`. `gorilla/websocket` forbids concurrent
//! writers on one socket, so the original serializes through a single
//! write goroutine that drains `chHighWrite` before ever looking at
//! `chLowWrite` — modeled here as a biased `tokio::select!` with a nested
//! fallback, the same two-tier shape as the source.

use super::attrs::AttributeMap;
use super::authorize::AuthorizeTimer;
use super::command::{now_millis, WriteCommand};
use super::handlers::SharedHandlers;
use super::state::AtomicConnState;
use crate::config::{HeartbeatConfig, HeartbeatMechanism};
use crate::error::{GateMeshError, Result};
use crate::protocol::{ClientPacker, DefaultPacker, Frame};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

type Sink = SplitSink<WebSocketStream<TcpStream>, Message>;

pub struct WsConnection {
    id: u64,
    uid: AtomicI64,
    state: AtomicConnState,
    /// Guards the sink itself: every write path (queued high/low drain,
    /// heartbeat tick) takes this lock for one `send`, and teardown takes
    /// it once to swap in `None`.
    sink: RwLock<Option<Sink>>,
    high_tx: mpsc::Sender<WriteCommand>,
    low_tx: mpsc::Sender<WriteCommand>,
    authorize_timer: AuthorizeTimer,
    last_heartbeat_ms: Arc<AtomicI64>,
    handlers: SharedHandlers,
    attrs: AttributeMap,
}

impl WsConnection {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn uid(&self) -> i64 {
        self.uid.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> super::state::ConnState {
        self.state.load()
    }

    /// Opaque per-connection attribute map; every read is a copy.
    pub fn attrs(&self) -> &AttributeMap {
        &self.attrs
    }

    pub fn bind(&self, uid: i64) {
        self.uid.store(uid, Ordering::SeqCst);
        self.authorize_timer.cancel();
    }

    fn rearm_authorize(conn: &Arc<WsConnection>, timeout: std::time::Duration) {
        let armed = conn.clone();
        conn.authorize_timer.arm(timeout, async move {
            if armed.uid() != 0 {
                return;
            }
            armed.do_close().await;
        });
    }

    /// High-priority send: heartbeats and anything that must preempt
    /// already-queued low-priority traffic.
    pub async fn send(&self, body: &[u8], route: u8, seq: u64) -> Result<()> {
        self.state.check()?;
        let frame = DefaultPacker.pack_buffer(route, seq, body).freeze();
        self.high_tx
            .send(WriteCommand::Data(frame))
            .await
            .map_err(|_| GateMeshError::ConnectionClosed)
    }

    /// Low-priority send, drained only once the high queue is empty.
    pub async fn push(&self, body: &[u8], route: u8, seq: u64) -> Result<()> {
        self.state.check()?;
        let frame = DefaultPacker.pack_buffer(route, seq, body).freeze();
        self.low_tx
            .send(WriteCommand::Data(frame))
            .await
            .map_err(|_| GateMeshError::ConnectionClosed)
    }

    async fn write_direct(sink: &RwLock<Option<Sink>>, bytes: Vec<u8>) -> Result<()> {
        let mut guard = sink.write().await;
        match guard.as_mut() {
            Some(s) => s
                .send(Message::Binary(bytes.into()))
                .await
                .map_err(|e| GateMeshError::Internal(e.to_string())),
            None => Err(GateMeshError::ConnectionClosed),
        }
    }

    pub async fn grace_close(&self) -> Result<()> {
        if !self.state.try_opened_to_hanged() {
            return Err(GateMeshError::ConnectionNotOpened);
        }
        self.authorize_timer.cancel();

        let (tx, rx) = oneshot::channel();
        if self.low_tx.send(WriteCommand::Close(tx)).await.is_ok() {
            let _ = rx.await;
        }

        self.do_close().await;
        Ok(())
    }

    pub async fn force_close(&self) -> Result<()> {
        if self.do_close().await {
            Ok(())
        } else {
            Err(GateMeshError::ConnectionClosed)
        }
    }

    /// Single teardown path: CAS-guarded so exactly one of the read-error,
    /// close-frame, heartbeat-timeout, authorize-timeout, `grace_close`,
    /// and `force_close` callers actually closes the sink and invokes
    /// `on_disconnect`.
    async fn do_close(&self) -> bool {
        if !self.state.try_force_to_closed() {
            return false;
        }
        self.authorize_timer.cancel();
        if let Some(mut s) = self.sink.write().await.take() {
            let _ = s.close().await;
        }
        self.handlers.on_disconnect(self.id).await;
        true
    }
}

pub fn spawn(
    id: u64,
    ws: WebSocketStream<TcpStream>,
    heartbeat: HeartbeatConfig,
    authorize_timeout: std::time::Duration,
    handlers: SharedHandlers,
    high_capacity: usize,
    low_capacity: usize,
) -> Arc<WsConnection> {
    let (sink, stream) = ws.split();
    let (high_tx, high_rx) = mpsc::channel(high_capacity);
    let (low_tx, low_rx) = mpsc::channel(low_capacity);

    let conn = Arc::new(WsConnection {
        id,
        uid: AtomicI64::new(0),
        state: AtomicConnState::new(),
        sink: RwLock::new(Some(sink)),
        high_tx,
        low_tx,
        authorize_timer: AuthorizeTimer::new(),
        last_heartbeat_ms: Arc::new(AtomicI64::new(now_millis())),
        handlers,
        attrs: AttributeMap::new(),
    });

    WsConnection::rearm_authorize(&conn, authorize_timeout);

    tokio::spawn(read_loop(conn.clone(), stream, heartbeat.clone()));
    tokio::spawn(write_loop(conn.clone(), high_rx, low_rx, heartbeat));

    conn
}

async fn read_loop(
    conn: Arc<WsConnection>,
    mut stream: futures_util::stream::SplitStream<WebSocketStream<TcpStream>>,
    heartbeat: HeartbeatConfig,
) {
    loop {
        if conn.state.is_closed() {
            return;
        }

        // Bounded poll so an externally-triggered close (heartbeat
        // timeout, authorize timeout, explicit force/grace close) is
        // noticed promptly even with nothing incoming on the wire.
        let msg = match tokio::time::timeout(std::time::Duration::from_millis(200), stream.next()).await {
            Ok(Some(Ok(msg))) => msg,
            Ok(_) => {
                conn.do_close().await;
                return;
            }
            Err(_elapsed) => continue,
        };

        let data = match msg {
            Message::Binary(data) => data,
            Message::Close(_) => {
                conn.do_close().await;
                return;
            }
            _ => continue,
        };

        if !heartbeat.interval.is_zero() {
            conn.last_heartbeat_ms.store(now_millis(), Ordering::SeqCst);
        }

        match conn.state.load() {
            super::state::ConnState::Hanged => continue,
            super::state::ConnState::Closed => return,
            super::state::ConnState::Opened => {}
        }

        if data.is_empty() {
            continue;
        }

        let frame = match Frame::decode(bytes::Bytes::from(data.to_vec())) {
            Ok(f) => f,
            Err(_) => continue,
        };

        if frame.is_heartbeat() {
            if heartbeat.mechanism == HeartbeatMechanism::Resp {
                let _ = conn.high_tx.send(WriteCommand::Heartbeat).await;
            }
            continue;
        }

        if frame.body.is_empty() {
            continue;
        }

        conn.handlers.on_receive(conn.id, frame.route, frame.seq, frame.body).await;
    }
}

async fn write_loop(
    conn: Arc<WsConnection>,
    mut high_rx: mpsc::Receiver<WriteCommand>,
    mut low_rx: mpsc::Receiver<WriteCommand>,
    heartbeat: HeartbeatConfig,
) {
    let mut ticker = if !heartbeat.interval.is_zero() {
        Some(tokio::time::interval(heartbeat.interval))
    } else {
        None
    };

    loop {
        let tick = async {
            match &mut ticker {
                Some(t) => {
                    t.tick().await;
                }
                None => std::future::pending::<()>().await,
            }
        };

        // High-priority tier gets first refusal via `biased`; only when it
        // has nothing ready do we fall through to the low tier.
        tokio::select! {
            biased;
            cmd = high_rx.recv() => {
                if !handle_command(&conn, cmd).await {
                    return;
                }
            }
            cmd = low_rx.recv() => {
                if !handle_command(&conn, cmd).await {
                    return;
                }
            }
            _ = tick => {
                if !handle_tick(&conn, &heartbeat).await {
                    return;
                }
            }
        }
    }
}

async fn handle_command(conn: &Arc<WsConnection>, cmd: Option<WriteCommand>) -> bool {
    match cmd {
        None => false,
        Some(WriteCommand::Close(ack)) => {
            let _ = ack.send(());
            false
        }
        Some(WriteCommand::Data(bytes)) => {
            if conn.state.is_closed() {
                return false;
            }
            if WsConnection::write_direct(&conn.sink, bytes.to_vec()).await.is_err() {
                tracing::error!(conn_id = conn.id, "write message error");
                conn.do_close().await;
                return false;
            }
            true
        }
        Some(WriteCommand::Heartbeat) => {
            let hb = DefaultPacker.pack_heartbeat(0, 0).freeze();
            let _ = WsConnection::write_direct(&conn.sink, hb.to_vec()).await;
            true
        }
    }
}

async fn handle_tick(conn: &Arc<WsConnection>, heartbeat: &HeartbeatConfig) -> bool {
    let deadline = now_millis() - 2 * heartbeat.interval.as_millis() as i64;
    if conn.last_heartbeat_ms.load(Ordering::SeqCst) < deadline {
        tracing::debug!(conn_id = conn.id, "connection heartbeat timeout");
        conn.do_close().await;
        return false;
    }

    if conn.state.is_closed() {
        return false;
    }

    if heartbeat.mechanism == HeartbeatMechanism::Tick {
        let hb = DefaultPacker.pack_heartbeat(0, 0).freeze();
        let _ = WsConnection::write_direct(&conn.sink, hb.to_vec()).await;
    }

    true
}
