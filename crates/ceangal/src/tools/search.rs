//! Web search tool

use serde::Serialize;

use super::{run, ToolError, ToolOutcome, ToolPayload, ToolResult};
use crate::google::common::extract_str;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

fn configured(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

pub async fn web_search(session: &Session, query: &str, max_results: usize) -> ToolOutcome {
    run("web_search", async {
        if query.trim().is_empty() {
            return Err(ToolError::Validation("Search query is required".into()));
        }

        let settings = &session.config().search;
        let (Some(api_key), Some(engine_id)) = (configured(&settings.api_key), configured(&settings.engine_id)) else {
            return Err(ToolError::NotConfigured(
                "Web search is not configured (set search.api_key and search.engine_id)".into(),
            ));
        };

        let items = session
            .search()
            .search(api_key, engine_id, query, max_results)
            .await?;
        let results: Vec<SearchHit> = items
            .iter()
            .map(|item| SearchHit {
                title: extract_str(item, "title"),
                link: extract_str(item, "link"),
                snippet: extract_str(item, "snippet"),
            })
            .collect();

        Ok(ToolResult::success(
            format!("Found {} results", results.len()),
            ToolPayload::SearchResults { results },
        ))
    })
    .await
}
