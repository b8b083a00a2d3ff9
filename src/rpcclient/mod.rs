//! RPC client to Node instances: dialing, caching, and the request/
//! response framing used to call `Deliver`/`Trigger`/`GetIP` over the
//! internal wire protocol.

pub mod builder;
pub mod client;
pub mod target;

pub use builder::{CloseHandler, RpcClientBuilder, RpcClientOptions};
pub use client::RpcClient;
pub use target::Target;
