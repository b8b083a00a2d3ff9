//! A single long-lived connection to a Node, speaking the internal wire
//! protocol. One background task owns the socket read half and completes
//! in-flight calls keyed by `seq`; callers never touch the socket
//! directly.

use crate::error::{GateMeshError, Result};
use crate::protocol::codec;
use crate::protocol::frame::Frame;
use crate::protocol::SessionKind;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};

type InFlight = DashMap<u64, oneshot::Sender<Frame>>;

pub struct RpcClient {
    pub addr: String,
    next_seq: AtomicU64,
    write_tx: mpsc::Sender<bytes::Bytes>,
    in_flight: Arc<InFlight>,
}

impl RpcClient {
    /// Dial `addr` and spin up its read/write tasks. A failed dial returns
    /// immediately — the caller (the builder) decides whether to retry.
    pub async fn connect(addr: &str) -> Result<Arc<RpcClient>> {
        Self::connect_with_on_close(addr, || {}).await
    }

    /// Like [`Self::connect`], but `on_close` runs once the reader task's
    /// read loop exits (the socket closed, by any cause). The builder uses
    /// this to evict the client from its cache and fire `CloseHandler`
    /// without the caller having to poll for liveness.
    pub async fn connect_with_on_close<F>(addr: &str, on_close: F) -> Result<Arc<RpcClient>>
    where
        F: FnOnce() + Send + 'static,
    {
        let stream = TcpStream::connect(addr).await?;
        let (mut read_half, mut write_half) = stream.into_split();
        let (write_tx, mut write_rx) = mpsc::channel::<bytes::Bytes>(256);
        let in_flight: Arc<InFlight> = Arc::new(DashMap::new());

        tokio::spawn(async move {
            while let Some(bytes) = write_rx.recv().await {
                if write_half.write_all(&bytes).await.is_err() {
                    break;
                }
            }
        });

        let reader_in_flight = in_flight.clone();
        tokio::spawn(async move {
            loop {
                match Frame::read_from(&mut read_half).await {
                    Ok(frame) => {
                        if let Some((_, tx)) = reader_in_flight.remove(&frame.seq) {
                            let _ = tx.send(frame);
                        }
                    }
                    Err(_) => break,
                }
            }
            on_close();
        });

        Ok(Arc::new(RpcClient {
            addr: addr.to_string(),
            next_seq: AtomicU64::new(1),
            write_tx,
            in_flight,
        }))
    }

    fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    async fn call(&self, framed: bytes::BytesMut) -> Result<Frame> {
        let seq_bytes = framed.as_ref();
        // seq sits at header bytes [6..14); extract it back out so the
        // caller doesn't have to thread it through twice.
        let seq = u64::from_be_bytes(seq_bytes[6..14].try_into().unwrap());

        let (tx, rx) = oneshot::channel();
        self.in_flight.insert(seq, tx);

        if self.write_tx.send(framed.freeze()).await.is_err() {
            self.in_flight.remove(&seq);
            return Err(GateMeshError::ConnectionClosed);
        }

        rx.await.map_err(|_| GateMeshError::ConnectionClosed)
    }

    pub async fn deliver(&self, cid: i64, uid: i64, message: &[u8]) -> Result<u16> {
        let seq = self.next_seq();
        let framed = codec::encode_deliver_req(seq, cid, uid, message);
        let resp = self.call(framed).await?;
        codec::decode_deliver_res(&resp.body)
    }

    pub async fn trigger(&self, event: i32, cid: i64, uid: i64) -> Result<u16> {
        let seq = self.next_seq();
        let framed = codec::encode_trigger_req(seq, event, cid, uid);
        let resp = self.call(framed).await?;
        codec::decode_trigger_res(&resp.body)
    }

    pub async fn get_ip(&self, kind: SessionKind, target: i64) -> Result<(u16, String)> {
        let seq = self.next_seq();
        let framed = codec::encode_get_ip_req(seq, kind, target);
        let resp = self.call(framed).await?;
        codec::decode_get_ip_res(&resp.body)
    }
}
