//! End-to-end: register a route + endpoint, point the endpoint at a fake
//! Node speaking the internal wire protocol, and drive `NodeLinker::deliver`
//! all the way through dispatch, RPC dial, and response decoding.

use bytes::Bytes;
use gatemesh::config::RpcClientConfig;
use gatemesh::dispatcher::{Buckets, Dispatcher, Endpoint};
use gatemesh::linker::{DeliverArgs, NodeLinker};
use gatemesh::locator::{LocatorClient, MemoryLocator};
use gatemesh::protocol::codec;
use gatemesh::route::{RouteFlags, RouteTable};
use gatemesh::rpcclient::{RpcClientBuilder, RpcClientOptions};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

async fn spawn_fake_node() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut size_buf = [0u8; 4];
        stream.read_exact(&mut size_buf).await.unwrap();
        let size = u32::from_be_bytes(size_buf) as usize;
        let mut rest = vec![0u8; size];
        stream.read_exact(&mut rest).await.unwrap();

        let seq = u64::from_be_bytes(rest[6..14].try_into().unwrap());
        let req_body = &rest[14..];
        let deliver = codec::decode_deliver_req(req_body).unwrap();
        assert_eq!(&deliver.message[..], b"hello-node");

        let res = codec::encode_deliver_res(seq, 0);
        stream.write_all(&res).await.unwrap();
    });

    addr
}

#[tokio::test]
async fn deliver_reaches_the_resolved_node_and_completes() {
    let node_addr = spawn_fake_node().await;

    let dispatcher = Arc::new(Dispatcher::new());
    dispatcher.rebuild_route(
        1,
        Buckets {
            b1: vec![Endpoint::new("node-1", &node_addr, 1)],
            ..Default::default()
        },
    );

    let routes = Arc::new(RouteTable::new());
    routes.register(1, RouteFlags::default());

    let locator = Arc::new(LocatorClient::new(Arc::new(MemoryLocator::new())));
    let rpc = RpcClientBuilder::new(
        RpcClientConfig::default(),
        RpcClientOptions {
            ins_id: "gate-1".to_string(),
            close_handler: None,
        },
    );

    let linker = NodeLinker::new(dispatcher, locator, rpc, routes);

    linker
        .deliver(DeliverArgs {
            cid: 1,
            uid: 42,
            route: 1,
            message: Bytes::from_static(b"hello-node"),
        })
        .await
        .unwrap();
}
