//! JSON-RPC method dispatch.
//!
//! Transport-agnostic: both the SSE session transport and stdio hand frames
//! here. Every failure raised while serving a tool call is turned into an
//! `isError` tool result, so nothing below this point reaches the transport
//! as a fault.

use crate::error::ServerError;
use crate::mcp::protocol::{
    CallToolParams, CallToolResult, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST,
    InitializeResult, JsonRpcRequest, JsonRpcResponse, ListToolsResult, METHOD_NOT_FOUND,
    PARSE_ERROR, PROTOCOL_VERSION, ServerInfo,
};
use crate::tools::ToolRegistry;
use futures_util::FutureExt;
use serde_json::{Value, json};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const INSTRUCTIONS: &str = "Read-only SQL tools.\n\
    \n\
    1. `list_tables` to see what exists\n\
    2. `get_columns` with a table name to see its columns\n\
    3. `execute_query` to run SQL\n\
    \n\
    Every statement runs in a read-only transaction that is rolled back, so \
    writes either fail or leave no trace.";

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    server_info: ServerInfo,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("tools", &self.registry.names())
            .field("server_info", &self.server_info)
            .finish()
    }
}

impl Dispatcher {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            server_info: ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    /// Parse one raw frame and dispatch it. Unparseable input gets a
    /// `-32700` response with a null id.
    pub async fn handle_raw(&self, frame: &str) -> Option<JsonRpcResponse> {
        match serde_json::from_str::<JsonRpcRequest>(frame) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                warn!(error = %e, "Unparseable JSON-RPC frame");
                Some(JsonRpcResponse::error(
                    None,
                    PARSE_ERROR,
                    format!("Parse error: {}", e),
                ))
            }
        }
    }

    /// Dispatch one request. Notifications yield `None`.
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            debug!(method = %request.method, "Notification received");
            return None;
        }

        let id = request.id.clone();
        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                id,
                INVALID_REQUEST,
                "Invalid request: jsonrpc must be \"2.0\"",
            ));
        }

        debug!(method = %request.method, id = ?id, "Dispatching request");

        let response = match request.method.as_str() {
            "initialize" => respond(id, &self.initialize_result()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => {
                let result = ListToolsResult {
                    tools: self.registry.definitions(),
                };
                respond(id, &result)
            }
            "tools/call" => match parse_call_params(request.params) {
                Ok(params) => {
                    let result = self.call_tool(params).await;
                    respond(id, &result)
                }
                Err(message) => JsonRpcResponse::error(id, INVALID_PARAMS, message),
            },
            other => {
                debug!(method = %other, "Unknown method");
                JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {}", other))
            }
        };

        Some(response)
    }

    /// Run one tool. Always produces a tool result; errors and panics become
    /// `isError` content.
    pub async fn call_tool(&self, params: CallToolParams) -> CallToolResult {
        let start = Instant::now();
        let name = params.name;

        let Some(tool) = self.registry.get(&name) else {
            warn!(tool = %name, "Unknown tool requested");
            return ServerError::unknown_tool(name).to_tool_result();
        };

        let outcome = AssertUnwindSafe(tool.call(params.arguments.as_ref()))
            .catch_unwind()
            .await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(result)) => {
                info!(tool = %name, elapsed_ms, "Tool call succeeded");
                result
            }
            Ok(Err(e)) => {
                warn!(
                    tool = %name,
                    kind = e.kind(),
                    error = %e,
                    elapsed_ms,
                    "Tool call failed"
                );
                e.to_tool_result()
            }
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(tool = %name, panic = %detail, "Tool handler panicked");
                ServerError::internal(format!("tool '{}' panicked", name)).to_tool_result()
            }
        }
    }

    fn initialize_result(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: json!({ "tools": {} }),
            server_info: self.server_info.clone(),
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }
}

fn parse_call_params(params: Option<Value>) -> Result<CallToolParams, String> {
    let params = params.ok_or_else(|| "Invalid params: missing tools/call params".to_string())?;
    serde_json::from_value(params).map_err(|e| format!("Invalid params: {}", e))
}

fn respond<T: serde::Serialize>(id: Option<Value>, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize result");
            JsonRpcResponse::error(id, INTERNAL_ERROR, format!("Internal error: {}", e))
        }
    }
}
