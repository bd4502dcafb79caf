//! Newline-delimited JSON-RPC over stdio.

use ceangal::ToolRegistry;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::initialize;
use crate::protocol::{
    error, success, InitializeRequest, JsonRpcRequest, JsonRpcResponse, ToolsCallRequest, INTERNAL_ERROR,
    INVALID_PARAMS, METHOD_NOT_FOUND, NOT_CONFIGURED, PARSE_ERROR,
};
use crate::tools::{self, ToolCallError};

pub async fn serve_stdio(registry: &ToolRegistry) -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let mut reader = BufReader::new(stdin);
    let mut stdout = tokio::io::stdout();
    let mut line = String::new();

    info!("Serving {} tools on stdio", registry.specs().len());

    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            break;
        }

        let Some(response) = handle_line(registry, line.trim()).await else {
            continue;
        };

        stdout.write_all(serde_json::to_string(&response)?.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    info!("stdin closed, shutting down");
    Ok(())
}

/// Handle one request line; `None` for blank lines and notifications.
pub async fn handle_line(registry: &ToolRegistry, line: &str) -> Option<JsonRpcResponse> {
    if line.is_empty() {
        return None;
    }

    let request = match serde_json::from_str::<JsonRpcRequest>(line) {
        Ok(req) => req,
        Err(e) => {
            warn!("Unparseable request: {}", e);
            return Some(error(Value::Null, PARSE_ERROR, format!("parse error: {}", e), None));
        }
    };

    let Some(id) = request.id.clone() else {
        debug!("Notification: {}", request.method);
        return None;
    };

    let response = match request.method.as_str() {
        "initialize" => match serde_json::from_value::<InitializeRequest>(request.params) {
            Ok(init_req) => to_success(id, initialize::handle_initialize(init_req)),
            Err(e) => error(id, INVALID_PARAMS, format!("invalid initialize params: {}", e), None),
        },
        "ping" => success(id, json!({})),
        "tools/list" => to_success(id, tools::list_response(registry)),
        "tools/call" => match serde_json::from_value::<ToolsCallRequest>(request.params) {
            Ok(call) => match tools::call_tool(registry, &call.name, call.arguments).await {
                Ok(result) => to_success(id, result),
                Err(ToolCallError::UnknownTool(name)) => {
                    error(id, METHOD_NOT_FOUND, format!("unknown tool: {}", name), None)
                }
                Err(ToolCallError::NotConfigured(msg)) => error(id, NOT_CONFIGURED, msg, None),
            },
            Err(e) => error(id, INVALID_PARAMS, format!("invalid tools/call params: {}", e), None),
        },
        "notifications/initialized" => success(id, json!({})),
        _ => error(id, METHOD_NOT_FOUND, format!("method not found: {}", request.method), None),
    };

    Some(response)
}

fn to_success<T: serde::Serialize>(id: Value, result: T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => success(id, value),
        Err(e) => error(id, INTERNAL_ERROR, format!("internal error: {}", e), None),
    }
}
