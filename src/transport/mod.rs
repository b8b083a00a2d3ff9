//! Client-facing transports: TCP and WebSocket connection state machines
//! plus the manager that accepts and tracks them.

pub mod attrs;
pub mod authorize;
pub mod command;
pub mod handlers;
pub mod manager;
pub mod state;
pub mod tcp;
pub mod ws;

pub use attrs::AttributeMap;
pub use handlers::{ConnectionHandlers, SharedHandlers};
pub use manager::{Conn, ConnectionManager};
pub use state::ConnState;
pub use tcp::TcpConnection;
pub use ws::WsConnection;
