//! Gmail API v1 Client
//!
//! Provides methods for interacting with Gmail API:
//! - List/search messages
//! - Get message details
//! - Send emails
//! - Manage labels

use super::client::{GoogleClient, GoogleError};
use super::common::{base64_url_encode, extract_array};
use serde_json::{json, Value};
use tracing::{debug, info};

pub struct GmailApi {
    client: GoogleClient,
    base_url: String,
}

super::google_api_wrapper!(GmailApi);

impl GmailApi {
    /// List messages matching a query
    ///
    /// # Arguments
    /// * `query` - Gmail search query (same syntax as web UI)
    /// * `max_results` - Maximum number of messages to return
    ///
    /// # Returns
    /// Array of message stubs with id and threadId
    pub async fn list_messages(
        &self,
        query: Option<&str>,
        max_results: Option<usize>,
    ) -> Result<Vec<Value>, GoogleError> {
        info!("Listing Gmail messages");

        let mut query_params = vec![];
        if let Some(q) = query.filter(|q| !q.is_empty()) {
            query_params.push(("q", q.to_string()));
        }

        let url = format!("{}/users/me/messages", self.base_url);
        let messages = self
            .client
            .get_paginated(&url, &query_params, "messages", "maxResults", max_results)
            .await?;

        debug!("Retrieved {} messages", messages.len());
        Ok(messages)
    }

    /// Gmail's `resultSizeEstimate` for a query. Approximate by design of the API.
    pub async fn estimate_count(&self, query: &str) -> Result<u64, GoogleError> {
        let url = format!("{}/users/me/messages", self.base_url);
        let response = self
            .client
            .get(&url, &[("q", query.to_string()), ("maxResults", "1".to_string())])
            .await?;

        Ok(response
            .get("resultSizeEstimate")
            .and_then(|v| v.as_u64())
            .unwrap_or(0))
    }

    /// Get a message by ID
    ///
    /// # Arguments
    /// * `id` - Message ID
    /// * `format` - "full" (default), "metadata", "minimal" or "raw"
    pub async fn get_message(&self, id: &str, format: Option<&str>) -> Result<Value, GoogleError> {
        info!("Fetching Gmail message: {}", id);

        let mut query_params = vec![];
        if let Some(fmt) = format {
            query_params.push(("format", fmt.to_string()));
        }

        let url = format!("{}/users/me/messages/{}", self.base_url, id);
        self.client.get(&url, &query_params).await
    }

    /// Send a plain-text email to a single recipient
    ///
    /// # Returns
    /// Sent message object with id and threadId
    pub async fn send_message(&self, to: &str, subject: &str, body: &str) -> Result<Value, GoogleError> {
        info!("Sending Gmail message to: {}", to);

        let raw_message = build_mime_message(to, subject, body);
        let request_body = json!({
            "raw": base64_url_encode(raw_message.as_bytes())
        });

        let url = format!("{}/users/me/messages/send", self.base_url);
        let response = self.client.post(&url, &request_body).await?;

        info!("Message sent successfully");
        Ok(response)
    }

    /// List all labels
    ///
    /// # Returns
    /// Array of label objects with id, name, type
    pub async fn list_labels(&self) -> Result<Vec<Value>, GoogleError> {
        info!("Listing Gmail labels");

        let url = format!("{}/users/me/labels", self.base_url);
        let response = self.client.get(&url, &[]).await?;

        let labels = extract_array(&response, "labels");
        debug!("Retrieved {} labels", labels.len());
        Ok(labels)
    }

    /// Modify message labels (add/remove labels from a message)
    pub async fn modify_message(
        &self,
        message_id: &str,
        add_label_ids: &[&str],
        remove_label_ids: &[&str],
    ) -> Result<Value, GoogleError> {
        info!("Modifying labels for message: {}", message_id);

        let body = json!({
            "addLabelIds": add_label_ids,
            "removeLabelIds": remove_label_ids,
        });

        let url = format!("{}/users/me/messages/{}/modify", self.base_url, message_id);
        self.client.post(&url, &body).await
    }

    /// Profile of the authenticated mailbox (emailAddress, messagesTotal, ...)
    pub async fn get_profile(&self) -> Result<Value, GoogleError> {
        let url = format!("{}/users/me/profile", self.base_url);
        self.client.get(&url, &[]).await
    }
}

/// Build an RFC 2822 plain-text message.
pub fn build_mime_message(to: &str, subject: &str, body: &str) -> String {
    let message_parts = [
        format!("To: {}", to),
        format!("Subject: {}", encode_header(subject)),
        "MIME-Version: 1.0".to_string(),
        "Content-Type: text/plain; charset=\"utf-8\"".to_string(),
        "Content-Transfer-Encoding: 8bit".to_string(),
        String::new(), // Empty line separates headers from body
        body.to_string(),
    ];

    message_parts.join("\r\n")
}

/// RFC 2047 encoded-word for header values that are non-ASCII or carry
/// control characters, so the value can never spill into a second header.
fn encode_header(value: &str) -> String {
    use base64::{engine::general_purpose::STANDARD, Engine};

    if value.is_ascii() && !value.chars().any(|c| c.is_ascii_control()) {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_message_headers() {
        let raw = build_mime_message("ceo@example.com", "Quarterly numbers", "See attached.");
        assert!(raw.starts_with("To: ceo@example.com\r\nSubject: Quarterly numbers\r\n"));
        assert!(raw.contains("Content-Type: text/plain; charset=\"utf-8\""));
        assert!(raw.ends_with("\r\n\r\nSee attached."));
    }

    #[test]
    fn test_non_ascii_subject_is_encoded() {
        let raw = build_mime_message("a@example.com", "Fáilte", "body");
        assert!(raw.contains("Subject: =?UTF-8?B?RsOhaWx0ZQ==?="));
    }

    #[test]
    fn test_line_break_in_subject_stays_in_one_header() {
        let raw = build_mime_message("a@example.com", "Hi\r\nCc: other@example.com", "body");
        assert!(!raw.contains("\r\nCc:"));
        assert!(raw.contains("Subject: =?UTF-8?B?"));
    }
}
