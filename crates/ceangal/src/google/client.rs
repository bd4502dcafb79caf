//! Google API Authenticated HTTP Client
//!
//! Injects the OAuth bearer token, maps Google's error envelope and handles
//! `nextPageToken` pagination.

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("HTTP request failed: {0}")]
    Transport(String),
    #[error("Rate limited. Please try again later.")]
    RateLimited,
    #[error("Google API error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("Failed to parse response: {0}")]
    Decode(String),
}

/// Google API HTTP client with OAuth token injection
pub struct GoogleClient {
    client: Client,
    access_token: Option<String>,
}

impl GoogleClient {
    /// Client sending `access_token` as a bearer credential
    pub fn new(client: Client, access_token: String) -> Self {
        Self {
            client,
            access_token: Some(access_token),
        }
    }

    /// Client for key-authenticated APIs (no bearer header)
    pub fn anonymous(client: Client) -> Self {
        Self {
            client,
            access_token: None,
        }
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Make an authenticated GET request
    pub async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Value, GoogleError> {
        let builder = self.authorize(self.client.get(url).query(query));
        self.execute_request(builder).await
    }

    /// Make an authenticated POST request with JSON body
    pub async fn post(&self, url: &str, body: &Value) -> Result<Value, GoogleError> {
        let builder = self.authorize(self.client.post(url).json(body));
        self.execute_request(builder).await
    }

    /// Make an authenticated PUT request with query parameters and JSON body
    pub async fn put(&self, url: &str, query: &[(&str, String)], body: &Value) -> Result<Value, GoogleError> {
        let builder = self.authorize(self.client.put(url).query(query).json(body));
        self.execute_request(builder).await
    }

    /// Make an authenticated PATCH request with JSON body
    pub async fn patch(&self, url: &str, body: &Value) -> Result<Value, GoogleError> {
        let builder = self.authorize(self.client.patch(url).json(body));
        self.execute_request(builder).await
    }

    /// Execute a request and handle Google API response patterns
    async fn execute_request(&self, builder: RequestBuilder) -> Result<Value, GoogleError> {
        let response = builder
            .send()
            .await
            .map_err(|e| GoogleError::Transport(e.to_string()))?;

        let status = response.status();
        debug!("Response status: {}", status);

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Rate limited by Google API");
            return Err(GoogleError::RateLimited);
        }

        let body = response
            .text()
            .await
            .map_err(|e| GoogleError::Transport(format!("Failed to read response body: {}", e)))?;

        // Empty successful responses (e.g., DELETE)
        if status.is_success() && body.trim().is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }

        if !status.is_success() {
            let err = extract_error(&body, status);
            error!("{}", err);
            return Err(err);
        }

        serde_json::from_str(&body).map_err(|e| GoogleError::Decode(format!("{} (body: {})", e, body)))
    }

    /// Follow `nextPageToken` until `max_results` items are collected.
    ///
    /// `items_field` names the list in each page ("messages", "files", ...);
    /// `page_size_param` is the API's page size parameter.
    pub async fn get_paginated(
        &self,
        url: &str,
        base_query: &[(&str, String)],
        items_field: &str,
        page_size_param: &str,
        max_results: Option<usize>,
    ) -> Result<Vec<Value>, GoogleError> {
        let mut all_items = Vec::new();
        let mut page_token: Option<String> = None;
        let remaining = max_results.unwrap_or(usize::MAX);

        loop {
            let mut query = base_query.to_vec();
            if let Some(ref token) = page_token {
                query.push(("pageToken", token.clone()));
            }
            if let Some(max) = max_results {
                query.push((page_size_param, max.to_string()));
            }

            let response = self.get(url, &query).await?;

            if let Some(items) = response.get(items_field).and_then(|v| v.as_array()) {
                all_items.extend(items.iter().cloned());

                if all_items.len() >= remaining {
                    all_items.truncate(remaining);
                    break;
                }
            }

            match response.get("nextPageToken").and_then(|v| v.as_str()) {
                Some(next) => page_token = Some(next.to_string()),
                None => break,
            }
        }

        Ok(all_items)
    }
}

/// Map a Google error body (`{"error": {"code", "message"}}`) to an error.
fn extract_error(body: &str, status: StatusCode) -> GoogleError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    if let Some(error_obj) = parsed.as_ref().and_then(|v| v.get("error")) {
        if let Some(message) = error_obj.get("message").and_then(|v| v.as_str()) {
            let code = error_obj
                .get("code")
                .and_then(|v| v.as_i64())
                .unwrap_or(status.as_u16() as i64);

            return GoogleError::Api {
                code,
                message: message.to_string(),
            };
        }
    }

    GoogleError::Api {
        code: status.as_u16() as i64,
        message: format!("HTTP {} error", status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_message() {
        let body = r#"{"error": {"code": 404, "message": "Requested entity was not found.", "status": "NOT_FOUND"}}"#;

        let err = extract_error(body, StatusCode::NOT_FOUND);
        let msg = err.to_string();
        assert!(msg.contains("404"));
        assert!(msg.contains("Requested entity was not found."));
    }

    #[test]
    fn test_extract_error_without_envelope() {
        let err = extract_error("<html>bad gateway</html>", StatusCode::BAD_GATEWAY);
        assert!(matches!(err, GoogleError::Api { code: 502, .. }));
    }
}
