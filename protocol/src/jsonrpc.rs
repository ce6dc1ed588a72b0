//! JSON-RPC-lite envelopes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Integer(i64),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JSONRPCRequest {
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JSONRPCResponse {
    pub id: RequestId,
    pub result: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JSONRPCError {
    pub id: RequestId,
    pub error: JSONRPCErrorError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JSONRPCErrorError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Either outcome of a request, as read back by a client.
///
/// `Error` is tried first: a missing `result` would otherwise read as null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum JSONRPCReply {
    Error(JSONRPCError),
    Response(JSONRPCResponse),
}

impl JSONRPCReply {
    pub fn id(&self) -> &RequestId {
        match self {
            Self::Error(error) => &error.id,
            Self::Response(response) => &response.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn request_params_are_optional() {
        let request: JSONRPCRequest =
            serde_json::from_value(json!({"id": "a", "method": "service.status"}))
                .unwrap_or_else(|e| panic!("parse: {e}"));
        assert_eq!(request.id, RequestId::String("a".to_string()));
        assert_eq!(request.params, None);
        assert_eq!(
            serde_json::to_value(&request).unwrap_or_default(),
            json!({"id": "a", "method": "service.status"})
        );
    }

    #[test]
    fn reply_distinguishes_error() {
        let reply: JSONRPCReply = serde_json::from_value(json!({
            "id": 4,
            "error": {"code": 404, "message": "gone", "data": {"errorcode": "invalidrecord"}}
        }))
        .unwrap_or_else(|e| panic!("parse: {e}"));
        match reply {
            JSONRPCReply::Error(err) => {
                assert_eq!(err.error.code, 404);
                assert_eq!(err.id.to_string(), "4");
            }
            JSONRPCReply::Response(_) => panic!("expected error reply"),
        }
    }
}
