//! The external function trait and the registry that runs the contract
//! pipeline around it.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::context::RequestContext;
use crate::error::{ExternalError, Result};
use crate::schema::Description;
use crate::validate::{clean_return_value, validate_parameters};

/// Arguments that passed [`validate_parameters`]: coerced, defaulted, and free
/// of undeclared keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedArgs(Map<String, Value>);

impl ValidatedArgs {
    pub(crate) fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Deserialize into a typed params struct.
    pub fn parse<T: DeserializeOwned>(self) -> Result<T> {
        serde_json::from_value(Value::Object(self.0))
            .map_err(|e| ExternalError::invalid_parameter("", e.to_string()))
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

/// A named, remotely callable operation.
///
/// `describe_input` and `describe_output` are pure; `execute` only ever sees
/// arguments that already match `describe_input`.
pub trait ExternalFunction: Send + Sync {
    fn name(&self) -> &'static str;

    fn component(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn describe_input(&self) -> Description;

    fn describe_output(&self) -> Description;

    fn execute(&self, ctx: &RequestContext, args: ValidatedArgs) -> Result<Value>;
}

/// Serializable summary of a registered function.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionInfo {
    pub name: String,
    pub component: String,
    pub description: String,
    pub input: Value,
    pub output: Value,
}

#[derive(Default, Clone)]
pub struct FunctionRegistry {
    functions: BTreeMap<&'static str, Arc<dyn ExternalFunction>>,
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function. A later registration under the same name replaces
    /// the earlier one.
    pub fn register<F: ExternalFunction + 'static>(&mut self, function: F) {
        let name = function.name();
        if self.functions.insert(name, Arc::new(function)).is_some() {
            warn!("external function {name} registered twice; keeping the latest");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ExternalFunction>> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.functions.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn describe(&self) -> Vec<FunctionInfo> {
        self.functions
            .values()
            .map(|function| FunctionInfo {
                name: function.name().to_string(),
                component: function.component().to_string(),
                description: function.description().to_string(),
                input: function.describe_input().to_json(),
                output: function.describe_output().to_json(),
            })
            .collect()
    }

    /// Validate `params`, execute, then clean the result against the declared
    /// output.
    pub fn call(&self, name: &str, ctx: &RequestContext, params: &Value) -> Result<Value> {
        let function = self.get(name).ok_or_else(|| ExternalError::UnknownFunction {
            name: name.to_string(),
        })?;

        let args = validate_parameters(&function.describe_input(), params).inspect_err(|e| {
            debug!("{name}: rejected parameters from user {}: {e}", ctx.caller_id);
        })?;

        let raw = match function.execute(ctx, args) {
            Ok(raw) => raw,
            Err(err) => {
                info!(
                    function = name,
                    caller = ctx.caller_id,
                    category = err.category().as_str(),
                    "external function failed: {err}"
                );
                return Err(err);
            }
        };

        let cleaned = clean_return_value(&function.describe_output(), &raw)?;
        let status = cleaned.get("status").and_then(Value::as_bool);
        let warnings = cleaned
            .get("warnings")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        info!(
            function = name,
            caller = ctx.caller_id,
            status = ?status,
            warnings,
            "external function completed"
        );
        Ok(cleaned)
    }
}
