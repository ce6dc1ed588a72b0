//! Unix domain socket IPC listener.
//!
//! Reads newline-delimited JSON-RPC-lite messages and dispatches them to
//! the service: `hello`, `service.*`, or the name of an external function.

use std::path::Path;
use std::sync::Arc;

use lms_external::{ErrorCategory, ExternalError};
use lms_ws_protocol::{
    CallParams, ERR_ACCESS_DENIED, ERR_EXCEPTION, ERR_INTERNAL, ERR_INVALID_PARAMS,
    ERR_INVALID_REQUEST, ERR_METHOD_NOT_FOUND, ERR_NOT_FOUND, ErrorData, FunctionDescription,
    FunctionsResult, HelloParams, HelloResult, JSONRPCError, JSONRPCErrorError, JSONRPCRequest,
    JSONRPCResponse, PROTOCOL_VERSION, RequestId, ServiceStatusResult,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::watch;

use crate::service::WsService;

type RpcResult = Result<Value, JSONRPCErrorError>;

fn rpc_error(code: i64, message: impl Into<String>) -> JSONRPCErrorError {
    JSONRPCErrorError {
        code,
        message: message.into(),
        data: None,
    }
}

/// Bind the listener, replacing a stale socket file.
pub fn bind(path: &Path) -> std::io::Result<UnixListener> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let listener = UnixListener::bind(path)?;
    tracing::info!("LMS web service listening on {}", path.display());
    Ok(listener)
}

/// Accept connections until `shutdown` turns true or its sender is dropped.
pub async fn serve(
    service: Arc<WsService>,
    listener: UnixListener,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, _addr)) => {
                    let service = Arc::clone(&service);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(&service, stream).await {
                            tracing::warn!("Connection error: {e}");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Accept error: {e}");
                }
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    tracing::info!("listener shutting down");
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Handle a single client connection.
async fn handle_connection(service: &WsService, stream: UnixStream) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = dispatch_message(service, trimmed);
        let mut response_bytes = serde_json::to_vec(&response).unwrap_or_else(|_| b"{}".to_vec());
        response_bytes.push(b'\n');
        writer.write_all(&response_bytes).await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Parse and dispatch a single JSON-RPC message.
pub fn dispatch_message(service: &WsService, raw: &str) -> Value {
    let request: JSONRPCRequest = match serde_json::from_str(raw) {
        Ok(req) => req,
        Err(e) => {
            return serde_json::to_value(JSONRPCError {
                id: RequestId::Integer(0),
                error: rpc_error(ERR_INVALID_REQUEST, format!("Invalid JSON-RPC: {e}")),
            })
            .unwrap_or_default();
        }
    };

    let id = request.id;
    match dispatch_method(service, &request.method, request.params) {
        Ok(result) => serde_json::to_value(JSONRPCResponse { id, result }).unwrap_or_default(),
        Err(error) => serde_json::to_value(JSONRPCError { id, error }).unwrap_or_default(),
    }
}

fn dispatch_method(service: &WsService, method: &str, params: Option<Value>) -> RpcResult {
    match method {
        "hello" => handle_hello(service, params),
        "service.functions" => handle_functions(service),
        "service.status" => handle_service_status(service),
        name if service.registry().contains(name) => handle_call(service, name, params),
        _ => Err(rpc_error(
            ERR_METHOD_NOT_FOUND,
            format!("Unknown method: {method}"),
        )),
    }
}

fn parse_params<T: DeserializeOwned>(method: &str, params: Option<Value>) -> Result<T, JSONRPCErrorError> {
    params
        .ok_or_else(|| rpc_error(ERR_INVALID_PARAMS, "Missing params"))
        .and_then(|v| {
            serde_json::from_value(v).map_err(|e| {
                rpc_error(ERR_INVALID_PARAMS, format!("Invalid {method} params: {e}"))
            })
        })
}

fn to_result<T: serde::Serialize>(value: T) -> RpcResult {
    serde_json::to_value(value).map_err(|e| rpc_error(ERR_INTERNAL, format!("Serialize error: {e}")))
}

fn handle_hello(service: &WsService, params: Option<Value>) -> RpcResult {
    let hello: HelloParams = parse_params("hello", params)?;

    if hello.protocol_version != PROTOCOL_VERSION {
        return Err(rpc_error(
            ERR_INVALID_PARAMS,
            format!(
                "Incompatible protocol version: client={}, service={}",
                hello.protocol_version, PROTOCOL_VERSION
            ),
        ));
    }
    tracing::debug!("hello from client {}", hello.client_version);

    to_result(HelloResult {
        protocol_version: PROTOCOL_VERSION.to_string(),
        service_version: env!("CARGO_PKG_VERSION").to_string(),
        functions: service
            .registry()
            .names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}

fn handle_functions(service: &WsService) -> RpcResult {
    let functions = service
        .registry()
        .describe()
        .into_iter()
        .map(|info| FunctionDescription {
            name: info.name,
            component: info.component,
            description: info.description,
            input: info.input,
            output: info.output,
        })
        .collect();
    to_result(FunctionsResult { functions })
}

fn handle_service_status(service: &WsService) -> RpcResult {
    to_result(ServiceStatusResult {
        uptime_s: service.uptime_secs(),
        calls_served: service.calls_served(),
        calls_failed: service.calls_failed(),
        functions: service.registry().len(),
    })
}

fn handle_call(service: &WsService, function: &str, params: Option<Value>) -> RpcResult {
    let call: CallParams = parse_params(function, params)?;
    service
        .call(function, &call.wstoken, &call.args)
        .map_err(|e| external_error_to_rpc(&e))
}

fn external_error_to_rpc(err: &ExternalError) -> JSONRPCErrorError {
    let code = match err.category() {
        ErrorCategory::InvalidInput => ERR_INVALID_PARAMS,
        ErrorCategory::NotFound => ERR_NOT_FOUND,
        ErrorCategory::FeatureDisabled => ERR_EXCEPTION,
        ErrorCategory::AccessDenied => ERR_ACCESS_DENIED,
        ErrorCategory::Internal => ERR_INTERNAL,
    };
    let data = ErrorData {
        errorcode: err.errorcode().to_string(),
        component: err.component().to_string(),
    };
    JSONRPCErrorError {
        code,
        message: err.to_string(),
        data: serde_json::to_value(data).ok(),
    }
}
