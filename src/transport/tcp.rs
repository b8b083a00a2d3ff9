//! TCP connection: single write queue, ported from
//! `network/tcp/server_conn.go`.

use super::attrs::AttributeMap;
use super::authorize::AuthorizeTimer;
use super::command::{now_millis, WriteCommand};
use super::handlers::SharedHandlers;
use super::state::AtomicConnState;
use crate::config::{HeartbeatConfig, HeartbeatMechanism};
use crate::error::{GateMeshError, Result};
use crate::protocol::{ClientPacker, DefaultPacker};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, RwLock};

pub struct TcpConnection {
    id: u64,
    uid: AtomicI64,
    state: AtomicConnState,
    local_addr: SocketAddr,
    remote_addr: SocketAddr,
    /// Guards the write half itself (not just serializes writers): `send`
    /// and the push-queue drain both take this lock to get `&mut` access
    /// for the write, and teardown takes it once to swap in `None` so
    /// every writer past that point observes the connection as closed.
    socket: RwLock<Option<OwnedWriteHalf>>,
    write_tx: mpsc::Sender<WriteCommand>,
    authorize_timer: AuthorizeTimer,
    last_heartbeat_ms: Arc<AtomicI64>,
    handlers: SharedHandlers,
    attrs: AttributeMap,
}

impl TcpConnection {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn uid(&self) -> i64 {
        self.uid.load(Ordering::SeqCst)
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.state.check()?;
        Ok(self.local_addr)
    }

    pub fn remote_addr(&self) -> Result<SocketAddr> {
        self.state.check()?;
        Ok(self.remote_addr)
    }

    pub fn state(&self) -> super::state::ConnState {
        self.state.load()
    }

    /// Opaque per-connection attribute map; every read is a copy.
    pub fn attrs(&self) -> &AttributeMap {
        &self.attrs
    }

    /// Bind a user to this connection and cancel the authorize timer.
    pub fn bind(&self, uid: i64) {
        self.uid.store(uid, Ordering::SeqCst);
        self.authorize_timer.cancel();
    }

    /// Unbind and re-arm the authorize timer.
    pub fn unbind(&self, timeout: Duration, conn: Arc<TcpConnection>) {
        self.uid.store(0, Ordering::SeqCst);
        Self::rearm_authorize(&conn, timeout);
    }

    fn rearm_authorize(conn: &Arc<TcpConnection>, timeout: Duration) {
        let armed = conn.clone();
        conn.authorize_timer.arm(timeout, async move {
            if armed.uid() != 0 {
                return;
            }
            armed.do_close().await;
        });
    }

    /// Direct, synchronous-style send: writes straight to the socket
    /// under the write lock instead of going through the push queue,
    /// matching `serverConn.Send`'s RLock-guarded `conn.Write`.
    pub async fn send(&self, body: &[u8], route: u8, seq: u64) -> Result<()> {
        self.state.check()?;
        let frame = DefaultPacker.pack_buffer(route, seq, body).freeze();
        Self::write_direct(&self.socket, &frame).await
    }

    /// Enqueue onto the write task's bounded channel; TCP has only one
    /// priority tier so this and `send` end up at the same socket, just
    /// via different paths (direct vs. queued-then-drained).
    pub async fn push(&self, body: &[u8], route: u8, seq: u64) -> Result<()> {
        self.state.check()?;
        let frame = DefaultPacker.pack_buffer(route, seq, body).freeze();
        self.write_tx
            .send(WriteCommand::Data(frame))
            .await
            .map_err(|_| GateMeshError::ConnectionClosed)
    }

    async fn write_direct(socket: &RwLock<Option<OwnedWriteHalf>>, bytes: &[u8]) -> Result<()> {
        let mut guard = socket.write().await;
        match guard.as_mut() {
            Some(w) => w.write_all(bytes).await.map_err(GateMeshError::Io),
            None => Err(GateMeshError::ConnectionClosed),
        }
    }

    pub async fn grace_close(&self) -> Result<()> {
        if !self.state.try_opened_to_hanged() {
            return Err(GateMeshError::ConnectionNotOpened);
        }
        self.authorize_timer.cancel();

        let (tx, rx) = oneshot::channel();
        if self.write_tx.send(WriteCommand::Close(tx)).await.is_ok() {
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
    /// heartbeat-timeout, authorize-timeout, `grace_close`, and
    /// `force_close` callers actually shuts the socket down and invokes
    /// `on_disconnect`. Everyone else's call is a cheap no-op.
    async fn do_close(&self) -> bool {
        if !self.state.try_force_to_closed() {
            return false;
        }
        self.authorize_timer.cancel();
        if let Some(mut w) = self.socket.write().await.take() {
            let _ = w.shutdown().await;
        }
        self.handlers.on_disconnect(self.id).await;
        true
    }
}

/// Spawn the read and write tasks for a freshly-accepted TCP stream and
/// return the shared connection handle.
pub fn spawn(
    id: u64,
    stream: TcpStream,
    heartbeat: HeartbeatConfig,
    authorize_timeout: Duration,
    handlers: SharedHandlers,
    write_queue_capacity: usize,
) -> Result<Arc<TcpConnection>> {
    let local_addr = stream.local_addr()?;
    let remote_addr = stream.peer_addr()?;
    let (read_half, write_half) = stream.into_split();
    let (write_tx, write_rx) = mpsc::channel(write_queue_capacity);

    let conn = Arc::new(TcpConnection {
        id,
        uid: AtomicI64::new(0),
        state: AtomicConnState::new(),
        local_addr,
        remote_addr,
        socket: RwLock::new(Some(write_half)),
        write_tx,
        authorize_timer: AuthorizeTimer::new(),
        last_heartbeat_ms: Arc::new(AtomicI64::new(now_millis())),
        handlers,
        attrs: AttributeMap::new(),
    });

    TcpConnection::rearm_authorize(&conn, authorize_timeout);

    tokio::spawn(read_loop(conn.clone(), read_half, heartbeat.clone()));
    tokio::spawn(write_loop(conn.clone(), write_rx, heartbeat));

    Ok(conn)
}

async fn read_loop(conn: Arc<TcpConnection>, mut reader: OwnedReadHalf, heartbeat: HeartbeatConfig) {
    use crate::protocol::Frame;

    loop {
        if conn.state.is_closed() {
            return;
        }

        // A bounded poll instead of an indefinite blocking read so a
        // close triggered by another task (heartbeat timeout, authorize
        // timeout, an explicit force/grace close) is noticed promptly
        // even with nothing incoming on the wire.
        let frame = match tokio::time::timeout(Duration::from_millis(200), Frame::read_from(&mut reader)).await {
            Ok(Ok(f)) => f,
            Ok(Err(_)) => {
                conn.do_close().await;
                return;
            }
            Err(_elapsed) => continue,
        };

        if !heartbeat.interval.is_zero() {
            conn.last_heartbeat_ms.store(now_millis(), Ordering::SeqCst);
        }

        match conn.state.load() {
            super::state::ConnState::Hanged => continue,
            super::state::ConnState::Closed => return,
            super::state::ConnState::Opened => {}
        }

        if frame.is_heartbeat() {
            if heartbeat.mechanism == HeartbeatMechanism::Resp {
                let hb = DefaultPacker.pack_heartbeat(0, frame.seq).freeze();
                let _ = conn.write_tx.send(WriteCommand::Data(hb)).await;
            }
            continue;
        }

        if frame.body.is_empty() {
            continue;
        }

        conn.handlers.on_receive(conn.id, frame.route, frame.seq, frame.body).await;
    }
}

async fn write_loop(conn: Arc<TcpConnection>, mut write_rx: mpsc::Receiver<WriteCommand>, heartbeat: HeartbeatConfig) {
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

        tokio::select! {
            cmd = write_rx.recv() => {
                match cmd {
                    None => return,
                    Some(WriteCommand::Close(ack)) => {
                        let _ = ack.send(());
                        return;
                    }
                    Some(WriteCommand::Data(bytes)) => {
                        if conn.state.is_closed() {
                            return;
                        }
                        if TcpConnection::write_direct(&conn.socket, &bytes).await.is_err() {
                            tracing::error!(conn_id = conn.id, "write data message error");
                        }
                    }
                    Some(WriteCommand::Heartbeat) => {
                        let hb = DefaultPacker.pack_heartbeat(0, 0);
                        let _ = TcpConnection::write_direct(&conn.socket, &hb).await;
                    }
                }
            }
            _ = tick => {
                let deadline = now_millis() - 2 * heartbeat.interval.as_millis() as i64;
                if conn.last_heartbeat_ms.load(Ordering::SeqCst) < deadline {
                    conn.do_close().await;
                    return;
                }
                if conn.state.is_closed() {
                    return;
                }
                if heartbeat.mechanism == HeartbeatMechanism::Tick {
                    let hb = DefaultPacker.pack_heartbeat(0, 0);
                    let _ = TcpConnection::write_direct(&conn.socket, &hb).await;
                }
            }
        }
    }
}
