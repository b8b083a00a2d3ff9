//! Route registry: what every internal route ID means and which handling
//! flags apply to it.

pub mod metadata;
pub mod table;

pub use metadata::{marshal_meta_routes, unmarshal_meta_routes, META_VALUE_SIZE};
pub use table::{RouteEntry, RouteFlags, RouteTable};
