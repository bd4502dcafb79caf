//! Bridge between the library tool registry and MCP tool types.

use ceangal::tools::{DispatchError, ToolRegistry, ToolSpec};
use serde_json::Value;

use crate::protocol::{McpTool, ToolAnnotations, ToolContent, ToolsCallResponse, ToolsListResponse};

#[derive(Debug)]
pub enum ToolCallError {
    UnknownTool(String),
    NotConfigured(String),
}

fn to_mcp(spec: &ToolSpec) -> McpTool {
    McpTool {
        name: spec.name.to_string(),
        description: spec.description.to_string(),
        input_schema: spec.input_schema.clone(),
        annotations: Some(ToolAnnotations {
            read_only_hint: Some(spec.annotations.read_only),
            destructive_hint: Some(spec.annotations.destructive),
            idempotent_hint: Some(spec.annotations.idempotent),
            // create_excel_file is the only tool that stays on this machine
            open_world_hint: Some(spec.name != "create_excel_file"),
        }),
    }
}

pub fn list_response(registry: &ToolRegistry) -> ToolsListResponse {
    let mut tools: Vec<McpTool> = registry.specs().iter().map(to_mcp).collect();
    tools.sort_by(|a, b| a.name.cmp(&b.name));
    ToolsListResponse {
        tools,
        next_cursor: None,
    }
}

pub async fn call_tool(registry: &ToolRegistry, name: &str, arguments: Value) -> Result<ToolsCallResponse, ToolCallError> {
    let result = registry.call(name, arguments).await.map_err(|e| match e {
        DispatchError::UnknownTool(name) => ToolCallError::UnknownTool(name),
        DispatchError::Configuration(e) => ToolCallError::NotConfigured(e.to_string()),
    })?;

    let text = serde_json::to_string(&result.to_json()).unwrap_or_else(|_| "{}".to_string());
    Ok(ToolsCallResponse {
        content: vec![ToolContent {
            content_type: "text".to_string(),
            text,
        }],
        is_error: !result.is_success(),
    })
}
