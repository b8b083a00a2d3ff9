use bytes::Bytes;
use tokio::sync::oneshot;

/// Unit of work handed to a connection's write task.
pub enum WriteCommand {
    Data(Bytes),
    Heartbeat,
    /// Graceful-close rendezvous: the write task acks through the
    /// embedded oneshot once it has drained and is about to return,
    /// mirroring the Go `chWrite <- closeSig` / `<-c.done` handshake.
    Close(oneshot::Sender<()>),
}

pub(crate) fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
