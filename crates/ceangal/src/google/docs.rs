//! Google Docs API v1 Client

use super::client::{GoogleClient, GoogleError};
use serde_json::{json, Value};
use tracing::info;

pub struct DocsApi {
    client: GoogleClient,
    base_url: String,
}

super::google_api_wrapper!(DocsApi);

impl DocsApi {
    /// Create an empty document
    ///
    /// # Returns
    /// Document object with documentId and title
    pub async fn create_document(&self, title: &str) -> Result<Value, GoogleError> {
        info!("Creating document: {}", title);

        let url = format!("{}/documents", self.base_url);
        self.client.post(&url, &json!({ "title": title })).await
    }

    /// Get a document including its body structure
    pub async fn get_document(&self, document_id: &str) -> Result<Value, GoogleError> {
        info!("Fetching document: {}", document_id);

        let url = format!("{}/documents/{}", self.base_url, document_id);
        self.client.get(&url, &[]).await
    }

    /// Apply a list of update requests atomically
    pub async fn batch_update(&self, document_id: &str, requests: Vec<Value>) -> Result<Value, GoogleError> {
        info!("Updating document {} ({} requests)", document_id, requests.len());

        let url = format!("{}/documents/{}:batchUpdate", self.base_url, document_id);
        self.client.post(&url, &json!({ "requests": requests })).await
    }
}

/// End index of the document body (one past the trailing newline).
///
/// A document always contains at least the trailing newline, so an empty
/// body reports 2.
pub fn body_end_index(document: &Value) -> i64 {
    document
        .pointer("/body/content")
        .and_then(|v| v.as_array())
        .and_then(|content| content.last())
        .and_then(|el| el.get("endIndex"))
        .and_then(|v| v.as_i64())
        .unwrap_or(2)
        .max(2)
}

/// `insertText` request at `index`
pub fn insert_text(index: i64, text: &str) -> Value {
    json!({
        "insertText": {
            "location": { "index": index },
            "text": text,
        }
    })
}

/// `deleteContentRange` request over `[start, end)`
pub fn delete_range(start: i64, end: i64) -> Value {
    json!({
        "deleteContentRange": {
            "range": { "startIndex": start, "endIndex": end }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_end_index_uses_last_element() {
        let doc = json!({
            "body": {"content": [
                {"endIndex": 1, "sectionBreak": {}},
                {"startIndex": 1, "endIndex": 24, "paragraph": {}},
                {"startIndex": 24, "endIndex": 57, "paragraph": {}}
            ]}
        });
        assert_eq!(body_end_index(&doc), 57);
    }

    #[test]
    fn test_body_end_index_defaults_for_empty_body() {
        assert_eq!(body_end_index(&json!({"body": {}})), 2);
    }
}
