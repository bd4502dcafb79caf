//! Google Drive API v3 Client

use super::client::{GoogleClient, GoogleError};
use serde_json::{json, Value};
use tracing::{debug, info};

pub const DOCUMENT_MIME: &str = "application/vnd.google-apps.document";
pub const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

pub struct DriveApi {
    client: GoogleClient,
    base_url: String,
}

super::google_api_wrapper!(DriveApi);

impl DriveApi {
    /// Move a file to the trash (recoverable; not a permanent delete)
    pub async fn trash_file(&self, file_id: &str) -> Result<Value, GoogleError> {
        info!("Trashing file: {}", file_id);

        let url = format!("{}/files/{}", self.base_url, file_id);
        self.client.patch(&url, &json!({ "trashed": true })).await
    }

    /// Search non-trashed files by name fragment and optional MIME type
    ///
    /// # Returns
    /// Array of file objects with id, name, mimeType
    pub async fn search_files(
        &self,
        name: &str,
        mime_type: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<Value>, GoogleError> {
        info!("Searching Drive for: {}", name);

        let query = build_search_query(name, mime_type);
        let url = format!("{}/files", self.base_url);
        let files = self
            .client
            .get_paginated(
                &url,
                &[
                    ("q", query),
                    ("fields", "nextPageToken, files(id, name, mimeType)".to_string()),
                ],
                "files",
                "pageSize",
                Some(max_results),
            )
            .await?;

        debug!("Found {} files", files.len());
        Ok(files)
    }
}

/// Drive `q` expression for a name search.
pub fn build_search_query(name: &str, mime_type: Option<&str>) -> String {
    let mut clauses = vec![format!("name contains '{}'", quote_literal(name))];
    if let Some(mime) = mime_type.filter(|m| !m.is_empty()) {
        clauses.push(format!("mimeType = '{}'", quote_literal(mime)));
    }
    clauses.push("trashed = false".to_string());
    clauses.join(" and ")
}

/// Escape a value for a single-quoted Drive query literal.
fn quote_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_with_mime() {
        assert_eq!(
            build_search_query("Budget", Some(SPREADSHEET_MIME)),
            "name contains 'Budget' and mimeType = 'application/vnd.google-apps.spreadsheet' and trashed = false"
        );
    }

    #[test]
    fn test_search_query_escapes_quotes() {
        assert_eq!(
            build_search_query("Q1 'final'", None),
            "name contains 'Q1 \\'final\\'' and trashed = false"
        );
    }

    #[test]
    fn test_search_query_escapes_mime_type() {
        assert_eq!(
            build_search_query("Budget", Some("x' or name contains '")),
            "name contains 'Budget' and mimeType = 'x\\' or name contains \\'' and trashed = false"
        );
    }
}
