//! Spreadsheet tools
//!
//! Single Sheets/Drive calls with arguments passed through. Value matrices
//! are not shape-checked; the API rejects malformed ones.

use serde::Serialize;
use serde_json::Value;

use super::{required_field, run, ToolError, ToolOutcome, ToolPayload, ToolResult};
use crate::auth::scopes::{ScopeSet, DRIVE_READONLY, SPREADSHEETS};
use crate::google::common::{extract_array, extract_str};
use crate::google::sheets::{add_sheet_request, delete_sheet_request};
use crate::session::Session;

pub const DEFAULT_VALUE_INPUT: &str = "USER_ENTERED";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
}

fn sheet_scopes() -> ScopeSet {
    [SPREADSHEETS].into_iter().collect()
}

fn require(value: &str, what: &str) -> Result<(), ToolError> {
    if value.trim().is_empty() {
        Err(ToolError::Validation(format!("{} is required", what)))
    } else {
        Ok(())
    }
}

pub async fn create_spreadsheet(session: &Session, title: &str) -> ToolOutcome {
    run("create_spreadsheet", async {
        require(title, "Spreadsheet title")?;
        let sheets = session.sheets(&sheet_scopes()).await?;
        let created = sheets.create_spreadsheet(title).await?;
        let spreadsheet_id = required_field(&created, "spreadsheetId")?;

        Ok(ToolResult::success(
            format!("Spreadsheet '{}' created", title),
            ToolPayload::SpreadsheetCreated {
                url: extract_str(&created, "spreadsheetUrl"),
                spreadsheet_id,
            },
        ))
    })
    .await
}

pub async fn add_sheet(session: &Session, spreadsheet_id: &str, title: &str) -> ToolOutcome {
    run("add_sheet", async {
        require(spreadsheet_id, "Spreadsheet id")?;
        require(title, "Sheet title")?;
        let sheets = session.sheets(&sheet_scopes()).await?;
        let response = sheets
            .batch_update(spreadsheet_id, vec![add_sheet_request(title)])
            .await?;

        let properties = response
            .pointer("/replies/0/addSheet/properties")
            .ok_or_else(|| ToolError::Unexpected("Response is missing the new sheet".into()))?;
        let sheet_id = properties.get("sheetId").and_then(|v| v.as_i64()).unwrap_or(0);

        Ok(ToolResult::success(
            format!("Sheet '{}' added", title),
            ToolPayload::SheetAdded {
                spreadsheet_id: spreadsheet_id.to_string(),
                sheet_id,
                title: properties
                    .get("title")
                    .and_then(|v| v.as_str())
                    .unwrap_or(title)
                    .to_string(),
            },
        ))
    })
    .await
}

pub async fn read_range(session: &Session, spreadsheet_id: &str, range: &str) -> ToolOutcome {
    run("read_range", async {
        require(spreadsheet_id, "Spreadsheet id")?;
        require(range, "Range")?;
        let sheets = session.sheets(&sheet_scopes()).await?;
        let response = sheets.get_values(spreadsheet_id, range).await?;

        let values: Vec<Vec<Value>> = extract_array(&response, "values")
            .into_iter()
            .map(|row| row.as_array().cloned().unwrap_or_default())
            .collect();
        let range = match extract_str(&response, "range") {
            r if r.is_empty() => range.to_string(),
            r => r,
        };

        Ok(ToolResult::success(
            format!("Read {} rows", values.len()),
            ToolPayload::Range { range, values },
        ))
    })
    .await
}

pub async fn write_range(
    session: &Session,
    spreadsheet_id: &str,
    range: &str,
    values: &[Vec<Value>],
    value_input_option: &str,
) -> ToolOutcome {
    run("write_range", async {
        require(spreadsheet_id, "Spreadsheet id")?;
        require(range, "Range")?;
        let sheets = session.sheets(&sheet_scopes()).await?;
        let response = sheets
            .update_values(spreadsheet_id, range, values, value_input_option)
            .await?;

        let updated_cells = response.get("updatedCells").and_then(|v| v.as_u64()).unwrap_or(0);
        Ok(ToolResult::success(
            format!("Updated {} cells", updated_cells),
            ToolPayload::RangeWritten {
                updated_range: extract_str(&response, "updatedRange"),
                updated_cells,
            },
        ))
    })
    .await
}

pub async fn delete_sheet(session: &Session, spreadsheet_id: &str, sheet_id: i64) -> ToolOutcome {
    run("delete_sheet", async {
        require(spreadsheet_id, "Spreadsheet id")?;
        let sheets = session.sheets(&sheet_scopes()).await?;
        sheets
            .batch_update(spreadsheet_id, vec![delete_sheet_request(sheet_id)])
            .await?;

        Ok(ToolResult::success(
            format!("Sheet {} deleted", sheet_id),
            ToolPayload::SheetDeleted {
                spreadsheet_id: spreadsheet_id.to_string(),
                sheet_id,
            },
        ))
    })
    .await
}

/// Find Drive files by name, optionally restricted to a MIME type.
pub async fn search_drive(session: &Session, name: &str, mime_type: &str, max_results: usize) -> ToolOutcome {
    run("search_drive", async {
        require(name, "Search name")?;
        let drive = session.drive(&[DRIVE_READONLY].into_iter().collect()).await?;
        let found = drive
            .search_files(name, Some(mime_type), max_results.max(1))
            .await?;

        let files: Vec<DriveFile> = found
            .iter()
            .map(|f| DriveFile {
                id: extract_str(f, "id"),
                name: extract_str(f, "name"),
                mime_type: extract_str(f, "mimeType"),
            })
            .collect();

        Ok(ToolResult::success(
            format!("Found {} files", files.len()),
            ToolPayload::Files { files },
        ))
    })
    .await
}
