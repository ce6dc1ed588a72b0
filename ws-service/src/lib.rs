//! `lms-ws-service`: LMS external functions over a Unix domain socket.
//!
//! Listens on `$XDG_RUNTIME_DIR/lms-ws.sock` and speaks the JSON-RPC-lite
//! protocol from `lms-ws-protocol`. Each external function is a method;
//! its params carry the caller's web-service token and the function
//! arguments.

pub mod config;
pub mod functions;
pub mod ipc;
pub mod service;

pub use lms_ws_protocol::PROTOCOL_VERSION;

/// Default socket filename.
pub const SOCKET_FILENAME: &str = "lms-ws.sock";

/// Default socket path under `XDG_RUNTIME_DIR`.
///
/// Falls back to `/tmp/lms-ws-<username>.sock` if XDG_RUNTIME_DIR is not set.
pub fn default_socket_path() -> std::path::PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        std::path::PathBuf::from(runtime_dir).join(SOCKET_FILENAME)
    } else {
        let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
        std::path::PathBuf::from(format!("/tmp/lms-ws-{user}.sock"))
    }
}
