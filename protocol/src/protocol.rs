//! Method params/results and error codes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─────────────────────────────────────────────────────────────────────────────
// Error codes (JSON-RPC error.code)
// ─────────────────────────────────────────────────────────────────────────────

/// Standard JSON-RPC errors.
pub const ERR_INVALID_REQUEST: i64 = -32600;
pub const ERR_METHOD_NOT_FOUND: i64 = -32601;
pub const ERR_INVALID_PARAMS: i64 = -32602;

/// Exception raised by an external function (feature disabled, coding error).
pub const ERR_EXCEPTION: i64 = 400;
/// Token missing or unknown.
pub const ERR_ACCESS_DENIED: i64 = 401;
/// Referenced record or course module does not exist.
pub const ERR_NOT_FOUND: i64 = 404;
/// Invalid response or collaborator failure.
pub const ERR_INTERNAL: i64 = 500;

/// `error.data` attached to every external-function failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorData {
    pub errorcode: String,
    pub component: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handshake
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HelloParams {
    pub protocol_version: String,
    pub client_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HelloResult {
    pub protocol_version: String,
    pub service_version: String,
    /// Names of the external functions this service answers.
    pub functions: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// External function calls
// ─────────────────────────────────────────────────────────────────────────────

/// Params of any external-function method.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CallParams {
    pub wstoken: String,
    /// Function arguments; validated against the function's input description.
    #[serde(default)]
    pub args: Value,
}

/// `status` + `warnings` envelope as seen on the wire. Function specific
/// payload keys (`badge`, `badges`) are kept in `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CallResult {
    pub status: bool,
    #[serde(default)]
    pub warnings: Vec<WireWarning>,
    #[serde(flatten)]
    pub payload: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WireWarning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub itemid: Option<i64>,
    pub warningcode: String,
    pub message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// service.functions
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FunctionDescription {
    pub name: String,
    pub component: String,
    pub description: String,
    pub input: Value,
    pub output: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FunctionsResult {
    pub functions: Vec<FunctionDescription>,
}

// ─────────────────────────────────────────────────────────────────────────────
// service.status
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ServiceStatusResult {
    pub uptime_s: u64,
    pub calls_served: u64,
    pub calls_failed: u64,
    pub functions: usize,
}
