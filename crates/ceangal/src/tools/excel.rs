//! Excel file tool
//!
//! Writes a single-sheet `.xlsx` workbook to the local filesystem. No remote
//! service is involved.

use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{run, ToolError, ToolOutcome, ToolPayload, ToolResult};

pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// Create a workbook at `file_path`.
///
/// `headers` become the first row and `data` the rows below it. Data without
/// headers, or headers whose count differs from the first data row, are
/// rejected before anything touches the disk. Missing parent directories are
/// created.
pub async fn create_excel_file(
    file_path: &str,
    sheet_name: &str,
    data: Option<&[Vec<Value>]>,
    headers: Option<&[String]>,
) -> ToolOutcome {
    run("create_excel_file", async {
        if file_path.trim().is_empty() {
            return Err(ToolError::Validation("File path is required".into()));
        }
        if data.is_some() && headers.is_none() {
            return Err(ToolError::Validation(
                "Headers must be provided if data is specified".into(),
            ));
        }
        if let (Some(headers), Some(first)) = (headers, data.and_then(|d| d.first())) {
            if headers.len() != first.len() {
                return Err(ToolError::Validation(format!(
                    "Number of headers ({}) does not match number of data columns ({})",
                    headers.len(),
                    first.len()
                )));
            }
        }

        let sheet_name = if sheet_name.trim().is_empty() {
            DEFAULT_SHEET_NAME
        } else {
            sheet_name
        };
        let bytes = build_workbook(sheet_name, headers.unwrap_or_default(), data.unwrap_or_default())?;

        let path = absolute(Path::new(file_path))?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::Unexpected(format!("Failed to create directory {:?}: {}", parent, e)))?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| ToolError::Unexpected(format!("Failed to write {:?}: {}", path, e)))?;

        debug!("Wrote {} bytes to {:?}", bytes.len(), path);
        let path = path.display().to_string();
        Ok(ToolResult::success(
            format!("Excel file created successfully at '{}' with sheet '{}'", path, sheet_name),
            ToolPayload::ExcelFile { path },
        ))
    })
    .await
}

fn absolute(path: &Path) -> Result<PathBuf, ToolError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|e| ToolError::Unexpected(format!("Failed to resolve working directory: {}", e)))
}

/// Serialize the workbook in memory.
fn build_workbook(sheet_name: &str, headers: &[String], rows: &[Vec<Value>]) -> Result<Vec<u8>, ToolError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(sheet_name)
        .map_err(|e| ToolError::Validation(format!("Invalid sheet name '{}': {}", sheet_name, e)))?;

    for (col, header) in headers.iter().enumerate() {
        worksheet
            .write_string(0, column(col)?, header.as_str())
            .map_err(write_error)?;
    }

    let offset = if headers.is_empty() { 0 } else { 1 };
    for (index, row) in rows.iter().enumerate() {
        let row_num = u32::try_from(index + offset)
            .map_err(|_| ToolError::Validation("Too many rows for one worksheet".into()))?;
        for (col, cell) in row.iter().enumerate() {
            write_cell(worksheet, row_num, column(col)?, cell)?;
        }
    }

    workbook.save_to_buffer().map_err(write_error)
}

fn column(index: usize) -> Result<u16, ToolError> {
    u16::try_from(index).map_err(|_| ToolError::Validation("Too many columns for one worksheet".into()))
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, cell: &Value) -> Result<(), ToolError> {
    let written = match cell {
        Value::Null => return Ok(()),
        Value::Bool(b) => worksheet.write_boolean(row, col, *b),
        Value::Number(n) => match n.as_f64() {
            Some(f) => worksheet.write_number(row, col, f),
            None => worksheet.write_string(row, col, n.to_string()),
        },
        Value::String(s) => worksheet.write_string(row, col, s.as_str()),
        other => worksheet.write_string(row, col, other.to_string()),
    };
    written.map(|_| ()).map_err(write_error)
}

fn write_error(e: XlsxError) -> ToolError {
    match e {
        XlsxError::RowColumnLimitError => ToolError::Validation(e.to_string()),
        other => ToolError::Unexpected(format!("Failed to build workbook: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_sheet_name_rejected() {
        let err = build_workbook("bad/name", &[], &[]).unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }

    #[test]
    fn test_empty_workbook_builds() {
        let bytes = build_workbook(DEFAULT_SHEET_NAME, &[], &[]).unwrap();
        // xlsx is a zip container
        assert_eq!(&bytes[..2], b"PK");
    }
}
