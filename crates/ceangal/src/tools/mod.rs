//! Tool Functions
//!
//! Every tool takes a [`Session`](crate::session::Session) plus primitive
//! arguments and returns a [`ToolOutcome`]. Failures are reported inside the
//! [`ToolResult`]; only a missing or broken client secret escapes as `Err`,
//! because no tool can run without it.

pub mod docs;
pub mod excel;
pub mod mail;
pub mod registry;
pub mod search;
pub mod sheets;

use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use thiserror::Error;
use tracing::{error, info};

use crate::auth::AuthError;
use crate::common::ConfigurationError;
use crate::google::GoogleError;

pub use docs::EditMode;
pub use mail::{AttachmentInfo, DateFilter, EmailDetail, EmailSummary};
pub use registry::{DispatchError, ToolRegistry, ToolSpec, SCHEMA_VERSION};
pub use search::SearchHit;
pub use sheets::DriveFile;

/// Result of a tool call. The configuration failure is the only `Err`.
pub type ToolOutcome = Result<ToolResult, ConfigurationError>;

/// Uniform tool result.
///
/// Serialized as `{"status": "success", "message": ..., <payload keys>}` or
/// `{"status": "error", "kind": ..., "message": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolResult {
    Success {
        message: String,
        #[serde(flatten)]
        payload: ToolPayload,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

impl ToolResult {
    pub fn success(message: impl Into<String>, payload: ToolPayload) -> Self {
        Self::Success {
            message: message.into(),
            payload,
        }
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Success { message, .. } | Self::Error { message, .. } => message,
        }
    }

    pub fn payload(&self) -> Option<&ToolPayload> {
        match self {
            Self::Success { payload, .. } => Some(payload),
            Self::Error { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Error { kind, .. } => Some(*kind),
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({
                "status": "error",
                "kind": ErrorKind::Unexpected,
                "message": format!("Failed to serialize tool result: {}", e),
            })
        })
    }
}

/// Operation-specific success data, flattened into the result object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolPayload {
    /// `send_mail`, `mark_read`
    MessageId { message_id: String },
    Labels { labels: Vec<String> },
    Messages {
        emails: Vec<EmailSummary>,
        count: usize,
        query: String,
    },
    Message { email: EmailDetail },
    UnreadCount { unread_count: u64, estimated: bool },
    DocumentCreated {
        document_id: String,
        title: String,
        url: String,
    },
    DocumentEdited { document_id: String, mode: EditMode },
    /// `delete_document`
    DocumentId { document_id: String },
    SpreadsheetCreated { spreadsheet_id: String, url: String },
    SheetAdded {
        spreadsheet_id: String,
        sheet_id: i64,
        title: String,
    },
    Range { range: String, values: Vec<Vec<Value>> },
    RangeWritten { updated_range: String, updated_cells: u64 },
    SheetDeleted { spreadsheet_id: String, sheet_id: i64 },
    Files { files: Vec<DriveFile> },
    ExcelFile { path: String },
    SearchResults { results: Vec<SearchHit> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The remote API rejected or failed the call
    Vendor,
    /// Caller arguments were rejected before any side effect
    Validation,
    /// Credentials could not be obtained (consent denied, timed out, ...)
    Auth,
    /// A feature needs configuration that is absent
    NotConfigured,
    /// The call exceeded the configured deadline
    Deadline,
    Unexpected,
}

/// Internal tool failure; converted to a [`ToolResult`] at the boundary.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Configuration(ConfigurationError),
    #[error("{0}")]
    Auth(String),
    #[error(transparent)]
    Vendor(#[from] GoogleError),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotConfigured(String),
    #[error("{0}")]
    Unexpected(String),
}

impl ToolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            // Never surfaces as a result; listed for completeness
            Self::Configuration(_) => ErrorKind::NotConfigured,
            Self::Auth(_) => ErrorKind::Auth,
            Self::Vendor(_) => ErrorKind::Vendor,
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotConfigured(_) => ErrorKind::NotConfigured,
            Self::Unexpected(_) => ErrorKind::Unexpected,
        }
    }
}

impl From<AuthError> for ToolError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Configuration(c) => Self::Configuration(c),
            other => Self::Auth(other.to_string()),
        }
    }
}

impl From<ConfigurationError> for ToolError {
    fn from(e: ConfigurationError) -> Self {
        Self::Configuration(e)
    }
}

/// Run a tool body and convert its failure into a result.
pub(crate) async fn run<F>(tool: &str, body: F) -> ToolOutcome
where
    F: Future<Output = Result<ToolResult, ToolError>>,
{
    info!(tool = %tool, "Running tool");
    match body.await {
        Ok(result) => Ok(result),
        Err(ToolError::Configuration(e)) => {
            error!(tool = %tool, "Configuration error: {}", e);
            Err(e)
        }
        Err(e) => {
            let kind = e.kind();
            error!(tool = %tool, kind = ?kind, "{}", e);
            Ok(ToolResult::error(kind, e.to_string()))
        }
    }
}

/// String field of a vendor response that must be present.
pub(crate) fn required_field(response: &Value, field: &str) -> Result<String, ToolError> {
    response
        .get(field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .ok_or_else(|| ToolError::Unexpected(format!("Response is missing '{}'", field)))
}
