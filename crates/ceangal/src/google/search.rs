//! Custom Search JSON API Client
//!
//! Key-authenticated web search backing the `web_search` tool.

use super::client::{GoogleClient, GoogleError};
use super::common::extract_array;
use serde_json::Value;
use tracing::info;

pub struct SearchApi {
    client: GoogleClient,
    base_url: String,
}

super::google_api_wrapper!(SearchApi);

impl SearchApi {
    /// Run a query; Custom Search caps `num` at 10.
    pub async fn search(
        &self,
        api_key: &str,
        engine_id: &str,
        query: &str,
        num: usize,
    ) -> Result<Vec<Value>, GoogleError> {
        info!("Web search: {}", query);

        let response = self
            .client
            .get(
                &self.base_url,
                &[
                    ("key", api_key.to_string()),
                    ("cx", engine_id.to_string()),
                    ("q", query.to_string()),
                    ("num", num.clamp(1, 10).to_string()),
                ],
            )
            .await?;

        Ok(extract_array(&response, "items"))
    }
}
