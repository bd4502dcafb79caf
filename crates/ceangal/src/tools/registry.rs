//! Tool Registry
//!
//! Name/description/schema triples for every tool, and dispatch of a call
//! by name with JSON arguments. Arguments and results pass through
//! unchanged apart from deserialization.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use super::excel::DEFAULT_SHEET_NAME;
use super::mail::MessageFilter;
use super::sheets::DEFAULT_VALUE_INPUT;
use super::{docs, excel, mail, search, sheets, ErrorKind, ToolOutcome, ToolResult};
use crate::common::ConfigurationError;
use crate::session::Session;

/// Version of the parameter schemas below; bump on any incompatible change.
pub const SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolAnnotations {
    pub read_only: bool,
    pub destructive: bool,
    pub idempotent: bool,
}

const READ: ToolAnnotations = ToolAnnotations {
    read_only: true,
    destructive: false,
    idempotent: true,
};
const WRITE: ToolAnnotations = ToolAnnotations {
    read_only: false,
    destructive: false,
    idempotent: false,
};
const OVERWRITE: ToolAnnotations = ToolAnnotations {
    read_only: false,
    destructive: true,
    idempotent: true,
};

#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    pub annotations: ToolAnnotations,
}

// ── Arguments ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SendMailArgs {
    to: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    body: String,
}

#[derive(Debug, Deserialize)]
struct MessageIdArgs {
    #[serde(alias = "id")]
    message_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateDocumentArgs {
    title: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct EditDocumentArgs {
    document_id: String,
    content: String,
    #[serde(default)]
    replace_all: bool,
}

#[derive(Debug, Deserialize)]
struct DocumentIdArgs {
    document_id: String,
}

#[derive(Debug, Deserialize)]
struct TitleArgs {
    title: String,
}

#[derive(Debug, Deserialize)]
struct AddSheetArgs {
    spreadsheet_id: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct RangeArgs {
    spreadsheet_id: String,
    range: String,
}

#[derive(Debug, Deserialize)]
struct WriteRangeArgs {
    spreadsheet_id: String,
    range: String,
    values: Vec<Vec<Value>>,
    #[serde(default = "default_value_input")]
    value_input_option: String,
}

fn default_value_input() -> String {
    DEFAULT_VALUE_INPUT.to_string()
}

#[derive(Debug, Deserialize)]
struct DeleteSheetArgs {
    spreadsheet_id: String,
    sheet_id: i64,
}

#[derive(Debug, Deserialize)]
struct SearchDriveArgs {
    name: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default = "default_drive_results")]
    max_results: usize,
}

fn default_drive_results() -> usize {
    10
}

#[derive(Debug, Deserialize)]
struct ExcelArgs {
    file_path: String,
    #[serde(default = "default_sheet_name")]
    sheet_name: String,
    #[serde(default)]
    data: Option<Vec<Vec<Value>>>,
    #[serde(default)]
    headers: Option<Vec<String>>,
}

fn default_sheet_name() -> String {
    DEFAULT_SHEET_NAME.to_string()
}

#[derive(Debug, Deserialize)]
struct WebSearchArgs {
    query: String,
    #[serde(default = "default_search_results")]
    max_results: usize,
}

fn default_search_results() -> usize {
    5
}

// ── Registry ────────────────────────────────────────────────────────────────

pub struct ToolRegistry {
    session: Session,
    specs: Vec<ToolSpec>,
}

impl ToolRegistry {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            specs: catalog(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// Invoke a tool by name.
    ///
    /// Malformed arguments produce a validation result. When a tool deadline
    /// is configured the whole call, authorization included, must finish
    /// within it.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<ToolResult, DispatchError> {
        let Some(spec) = self.get(name) else {
            warn!("Unknown tool requested: {}", name);
            return Err(DispatchError::UnknownTool(name.to_string()));
        };
        info!(tool = %spec.name, "Dispatching tool call");

        let arguments = match arguments {
            Value::Null => json!({}),
            other => other,
        };

        let outcome = match self.session.config().tool_deadline() {
            Some(deadline) => match tokio::time::timeout(deadline, self.dispatch(spec.name, arguments)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(tool = %spec.name, "Tool call exceeded {:?}", deadline);
                    Ok(ToolResult::error(
                        ErrorKind::Deadline,
                        format!("{} did not finish within {} seconds", spec.name, deadline.as_secs()),
                    ))
                }
            },
            None => self.dispatch(spec.name, arguments).await,
        };

        Ok(outcome?)
    }

    async fn dispatch(&self, name: &str, arguments: Value) -> ToolOutcome {
        macro_rules! parse_or_return {
            ($tool:expr, $args:expr) => {
                match parse($tool, $args) {
                    Ok(parsed) => parsed,
                    Err(invalid) => return Ok(invalid),
                }
            };
        }

        let session = &self.session;
        match name {
            "send_mail" => {
                let args: SendMailArgs = parse_or_return!(name, arguments);
                mail::send_mail(session, &args.to, &args.subject, &args.body).await
            }
            "list_labels" => mail::list_labels(session).await,
            "list_messages" => {
                let filter: MessageFilter = parse_or_return!(name, arguments);
                mail::list_messages(session, &filter).await
            }
            "get_message" => {
                let args: MessageIdArgs = parse_or_return!(name, arguments);
                mail::get_message(session, &args.message_id).await
            }
            "mark_read" => {
                let args: MessageIdArgs = parse_or_return!(name, arguments);
                mail::mark_read(session, &args.message_id).await
            }
            "count_unread" => mail::count_unread(session).await,
            "create_document" => {
                let args: CreateDocumentArgs = parse_or_return!(name, arguments);
                docs::create_document(session, &args.title, &args.content).await
            }
            "edit_document" => {
                let args: EditDocumentArgs = parse_or_return!(name, arguments);
                docs::edit_document(session, &args.document_id, &args.content, args.replace_all).await
            }
            "delete_document" => {
                let args: DocumentIdArgs = parse_or_return!(name, arguments);
                docs::delete_document(session, &args.document_id).await
            }
            "create_spreadsheet" => {
                let args: TitleArgs = parse_or_return!(name, arguments);
                sheets::create_spreadsheet(session, &args.title).await
            }
            "add_sheet" => {
                let args: AddSheetArgs = parse_or_return!(name, arguments);
                sheets::add_sheet(session, &args.spreadsheet_id, &args.title).await
            }
            "read_range" => {
                let args: RangeArgs = parse_or_return!(name, arguments);
                sheets::read_range(session, &args.spreadsheet_id, &args.range).await
            }
            "write_range" => {
                let args: WriteRangeArgs = parse_or_return!(name, arguments);
                sheets::write_range(
                    session,
                    &args.spreadsheet_id,
                    &args.range,
                    &args.values,
                    &args.value_input_option,
                )
                .await
            }
            "delete_sheet" => {
                let args: DeleteSheetArgs = parse_or_return!(name, arguments);
                sheets::delete_sheet(session, &args.spreadsheet_id, args.sheet_id).await
            }
            "search_drive" => {
                let args: SearchDriveArgs = parse_or_return!(name, arguments);
                sheets::search_drive(session, &args.name, &args.mime_type, args.max_results).await
            }
            "create_excel_file" => {
                let args: ExcelArgs = parse_or_return!(name, arguments);
                excel::create_excel_file(
                    &args.file_path,
                    &args.sheet_name,
                    args.data.as_deref(),
                    args.headers.as_deref(),
                )
                .await
            }
            "web_search" => {
                let args: WebSearchArgs = parse_or_return!(name, arguments);
                search::web_search(session, &args.query, args.max_results).await
            }
            other => Ok(ToolResult::error(
                ErrorKind::Unexpected,
                format!("No handler registered for {}", other),
            )),
        }
    }
}

/// Deserialize tool arguments, or the validation result to return instead.
fn parse<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, ToolResult> {
    serde_json::from_value(arguments).map_err(|e| {
        warn!(tool = %tool, "Invalid arguments: {}", e);
        ToolResult::error(ErrorKind::Validation, format!("Invalid arguments for {}: {}", tool, e))
    })
}

fn string_prop(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

/// The registered tool set.
pub fn catalog() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "send_mail",
            description: "Send a plain-text email to exactly one recipient. Confirm recipient, subject and body with the user before calling.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "to": string_prop("Single recipient email address"),
                    "subject": string_prop("Subject line"),
                    "body": string_prop("Plain-text body")
                },
                "required": ["to", "subject", "body"]
            }),
            annotations: WRITE,
        },
        ToolSpec {
            name: "list_labels",
            description: "List the names of all Gmail labels.",
            input_schema: json!({ "type": "object", "properties": {} }),
            annotations: READ,
        },
        ToolSpec {
            name: "list_messages",
            description: "Search the inbox and return summaries (sender, date, subject, preview) of matching emails.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "max_results": { "type": "integer", "minimum": 1, "default": 10 },
                    "sender": string_prop("Only emails from this address"),
                    "date_filter": {
                        "type": "string",
                        "enum": ["today", "yesterday", "week", "month"],
                        "description": "Relative time window"
                    },
                    "subject_filter": string_prop("Text the subject must contain"),
                    "unread_only": { "type": "boolean", "default": false }
                }
            }),
            annotations: READ,
        },
        ToolSpec {
            name: "get_message",
            description: "Get the full content, recipients, labels and attachment list of one email.",
            input_schema: json!({
                "type": "object",
                "properties": { "message_id": string_prop("Gmail message id") },
                "required": ["message_id"]
            }),
            annotations: READ,
        },
        ToolSpec {
            name: "mark_read",
            description: "Mark an email as read. Safe to repeat.",
            input_schema: json!({
                "type": "object",
                "properties": { "message_id": string_prop("Gmail message id") },
                "required": ["message_id"]
            }),
            annotations: ToolAnnotations {
                read_only: false,
                destructive: false,
                idempotent: true,
            },
        },
        ToolSpec {
            name: "count_unread",
            description: "Approximate number of unread emails (Gmail's estimate, not an exact count).",
            input_schema: json!({ "type": "object", "properties": {} }),
            annotations: READ,
        },
        ToolSpec {
            name: "create_document",
            description: "Create a Google Doc, optionally with initial text.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "title": string_prop("Document title"),
                    "content": string_prop("Initial text")
                },
                "required": ["title"]
            }),
            annotations: WRITE,
        },
        ToolSpec {
            name: "edit_document",
            description: "Append text to a Google Doc, or replace its whole body when replace_all is true.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "document_id": string_prop("Document id"),
                    "content": string_prop("Text to append or replace with"),
                    "replace_all": { "type": "boolean", "default": false }
                },
                "required": ["document_id", "content"]
            }),
            annotations: WRITE,
        },
        ToolSpec {
            name: "delete_document",
            description: "Move a Google Doc to the Drive trash (recoverable).",
            input_schema: json!({
                "type": "object",
                "properties": { "document_id": string_prop("Document id") },
                "required": ["document_id"]
            }),
            annotations: OVERWRITE,
        },
        ToolSpec {
            name: "create_spreadsheet",
            description: "Create a Google Sheets spreadsheet.",
            input_schema: json!({
                "type": "object",
                "properties": { "title": string_prop("Spreadsheet title") },
                "required": ["title"]
            }),
            annotations: WRITE,
        },
        ToolSpec {
            name: "add_sheet",
            description: "Add a sheet (tab) to a spreadsheet.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "spreadsheet_id": string_prop("Spreadsheet id"),
                    "title": string_prop("New sheet title")
                },
                "required": ["spreadsheet_id", "title"]
            }),
            annotations: WRITE,
        },
        ToolSpec {
            name: "read_range",
            description: "Read cell values from a range in A1 notation (e.g. Sheet1!A1:C10).",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "spreadsheet_id": string_prop("Spreadsheet id"),
                    "range": string_prop("A1 range")
                },
                "required": ["spreadsheet_id", "range"]
            }),
            annotations: READ,
        },
        ToolSpec {
            name: "write_range",
            description: "Overwrite a range with rows of values.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "spreadsheet_id": string_prop("Spreadsheet id"),
                    "range": string_prop("A1 range"),
                    "values": {
                        "type": "array",
                        "items": { "type": "array" },
                        "description": "Rows of cell values"
                    },
                    "value_input_option": {
                        "type": "string",
                        "enum": ["USER_ENTERED", "RAW"],
                        "default": DEFAULT_VALUE_INPUT
                    }
                },
                "required": ["spreadsheet_id", "range", "values"]
            }),
            annotations: OVERWRITE,
        },
        ToolSpec {
            name: "delete_sheet",
            description: "Delete a sheet (tab) from a spreadsheet by numeric sheet id.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "spreadsheet_id": string_prop("Spreadsheet id"),
                    "sheet_id": { "type": "integer" }
                },
                "required": ["spreadsheet_id", "sheet_id"]
            }),
            annotations: OVERWRITE,
        },
        ToolSpec {
            name: "search_drive",
            description: "Find Drive files whose name contains the given text, optionally of one MIME type.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": string_prop("Text contained in the file name"),
                    "mime_type": string_prop("e.g. application/vnd.google-apps.spreadsheet"),
                    "max_results": { "type": "integer", "minimum": 1, "default": 10 }
                },
                "required": ["name"]
            }),
            annotations: READ,
        },
        ToolSpec {
            name: "create_excel_file",
            description: "Write a local .xlsx file with one sheet. Headers are required whenever data is given.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "file_path": string_prop("Where to save the file"),
                    "sheet_name": { "type": "string", "default": DEFAULT_SHEET_NAME },
                    "data": {
                        "type": "array",
                        "items": { "type": "array" },
                        "description": "Rows of cell values"
                    },
                    "headers": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Column headers; one per data column"
                    }
                },
                "required": ["file_path"]
            }),
            annotations: WRITE,
        },
        ToolSpec {
            name: "web_search",
            description: "Search the web. Cite the returned links when answering.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": string_prop("Search query"),
                    "max_results": { "type": "integer", "minimum": 1, "maximum": 10, "default": 5 }
                },
                "required": ["query"]
            }),
            annotations: READ,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_names_unique() {
        let specs = catalog();
        let names: HashSet<_> = specs.iter().map(|s| s.name).collect();
        assert_eq!(names.len(), specs.len());
        assert_eq!(specs.len(), 17);
    }

    #[test]
    fn test_required_fields_are_declared_properties() {
        for spec in catalog() {
            let props = spec.input_schema["properties"].as_object().unwrap();
            if let Some(required) = spec.input_schema.get("required").and_then(|r| r.as_array()) {
                for field in required {
                    assert!(props.contains_key(field.as_str().unwrap()), "{}: {}", spec.name, field);
                }
            }
        }
    }

    #[test]
    fn test_parse_reports_missing_field() {
        let err = parse::<SendMailArgs>("send_mail", json!({"subject": "hi"})).unwrap_err();
        assert_eq!(err.error_kind(), Some(ErrorKind::Validation));
        assert!(err.message().contains("to"));
    }

    #[test]
    fn test_message_filter_accepts_is_unread() {
        let filter: MessageFilter = parse("list_messages", json!({"is_unread": true, "sender": "a@b.c"})).unwrap();
        assert!(filter.unread_only);
        assert_eq!(filter.max_results, 10);
    }
}
