use ceangal::tools::SCHEMA_VERSION;

use crate::protocol::{
    InitializeRequest, InitializeResponse, ServerCapabilities, ServerInfo, ToolsCapabilities, MCP_PROTOCOL_VERSION,
};

const INSTRUCTIONS: &str = "\
Ceangal acts on the user's Google account: Gmail, Docs, Sheets and Drive, plus local Excel files and web search.
Every tool returns JSON with status \"success\" or \"error\"; on error, explain the message to the user and suggest an alternative.
Email: ask for any missing recipient, subject or body, confirm the details with the user, and only send when explicitly asked. send_mail accepts exactly one recipient.
Finding email: list_messages date_filter is one of today, yesterday, week, month. Show sender, date, subject and preview first; use get_message for the full text and offer mark_read afterwards.
count_unread is Gmail's estimate, not an exact number.
Web search: cite the returned links.";

pub fn handle_initialize(request: InitializeRequest) -> InitializeResponse {
    tracing::info!(
        client = %request.client_info.name,
        version = %request.client_info.version,
        "MCP client connected"
    );

    InitializeResponse {
        protocol_version: MCP_PROTOCOL_VERSION.to_string(),
        capabilities: ServerCapabilities {
            tools: ToolsCapabilities { list_changed: false },
        },
        server_info: ServerInfo {
            name: "ceangal-mcp".to_string(),
            version: format!("{} (schema {})", env!("CARGO_PKG_VERSION"), SCHEMA_VERSION),
        },
        instructions: INSTRUCTIONS.to_string(),
    }
}
