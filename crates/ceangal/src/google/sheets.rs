//! Google Sheets API v4 Client
//!
//! Arguments pass straight through; value shapes are validated by the API.

use super::client::{GoogleClient, GoogleError};
use serde_json::{json, Value};
use tracing::info;

pub struct SheetsApi {
    client: GoogleClient,
    base_url: String,
}

super::google_api_wrapper!(SheetsApi);

impl SheetsApi {
    /// Create a spreadsheet
    ///
    /// # Returns
    /// Spreadsheet object with spreadsheetId and spreadsheetUrl
    pub async fn create_spreadsheet(&self, title: &str) -> Result<Value, GoogleError> {
        info!("Creating spreadsheet: {}", title);

        let url = format!("{}/spreadsheets", self.base_url);
        self.client
            .post(&url, &json!({ "properties": { "title": title } }))
            .await
    }

    /// Apply structural updates (add/delete sheets, ...)
    pub async fn batch_update(&self, spreadsheet_id: &str, requests: Vec<Value>) -> Result<Value, GoogleError> {
        info!("Updating spreadsheet {} ({} requests)", spreadsheet_id, requests.len());

        let url = format!("{}/spreadsheets/{}:batchUpdate", self.base_url, spreadsheet_id);
        self.client.post(&url, &json!({ "requests": requests })).await
    }

    /// Read a range in A1 notation
    pub async fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<Value, GoogleError> {
        info!("Reading {} from {}", range, spreadsheet_id);

        let url = format!(
            "{}/spreadsheets/{}/values/{}",
            self.base_url,
            spreadsheet_id,
            urlencoding::encode(range)
        );
        self.client.get(&url, &[]).await
    }

    /// Overwrite a range with a matrix of rows
    pub async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<Value>],
        value_input_option: &str,
    ) -> Result<Value, GoogleError> {
        info!("Writing {} rows to {} in {}", values.len(), range, spreadsheet_id);

        let url = format!(
            "{}/spreadsheets/{}/values/{}",
            self.base_url,
            spreadsheet_id,
            urlencoding::encode(range)
        );
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": values,
        });
        self.client
            .put(&url, &[("valueInputOption", value_input_option.to_string())], &body)
            .await
    }
}

/// `addSheet` request
pub fn add_sheet_request(title: &str) -> Value {
    json!({ "addSheet": { "properties": { "title": title } } })
}

/// `deleteSheet` request
pub fn delete_sheet_request(sheet_id: i64) -> Value {
    json!({ "deleteSheet": { "sheetId": sheet_id } })
}
