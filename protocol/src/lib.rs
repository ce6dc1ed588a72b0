//! `lms-ws-protocol`: wire types for the LMS web-service socket.
//!
//! Newline-delimited JSON-RPC-lite: requests carry an `id`, a `method` and
//! optional `params`; there is no `"jsonrpc": "2.0"` member. Methods are
//! either service methods (`hello`, `service.*`) or the name of a
//! registered external function.

mod jsonrpc;
mod protocol;
mod schema;

pub use jsonrpc::*;
pub use protocol::*;
pub use schema::export_schemas;

/// Protocol version checked during the `hello` handshake.
pub const PROTOCOL_VERSION: &str = "1.0";
