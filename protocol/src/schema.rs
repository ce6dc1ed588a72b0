//! JSON Schema export for the wire types.

use std::collections::BTreeMap;

use schemars::schema_for;
use serde_json::Value;

use crate::{
    CallParams, CallResult, ErrorData, FunctionsResult, HelloParams, HelloResult, JSONRPCError,
    JSONRPCRequest, JSONRPCResponse, ServiceStatusResult,
};

/// Draft-07 schemas for every wire type, keyed by type name.
pub fn export_schemas() -> BTreeMap<&'static str, Value> {
    let mut schemas = BTreeMap::new();
    let mut add = |name: &'static str, schema: schemars::schema::RootSchema| {
        let mut value = serde_json::to_value(schema).unwrap_or(Value::Null);
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "$schema".to_string(),
                Value::String("http://json-schema.org/draft-07/schema#".to_string()),
            );
        }
        schemas.insert(name, value);
    };

    add("JSONRPCRequest", schema_for!(JSONRPCRequest));
    add("JSONRPCResponse", schema_for!(JSONRPCResponse));
    add("JSONRPCError", schema_for!(JSONRPCError));
    add("ErrorData", schema_for!(ErrorData));
    add("HelloParams", schema_for!(HelloParams));
    add("HelloResult", schema_for!(HelloResult));
    add("CallParams", schema_for!(CallParams));
    add("CallResult", schema_for!(CallResult));
    add("FunctionsResult", schema_for!(FunctionsResult));
    add("ServiceStatusResult", schema_for!(ServiceStatusResult));
    schemas
}
