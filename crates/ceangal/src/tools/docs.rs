//! Document tools

use serde::Serialize;
use serde_json::Value;

use super::{required_field, run, ToolError, ToolOutcome, ToolPayload, ToolResult};
use crate::auth::scopes::{ScopeSet, DOCUMENTS, DRIVE_FILE};
use crate::google::docs::{body_end_index, delete_range, insert_text};
use crate::session::Session;

/// Index of the first character in a document body
const BODY_START: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    Append,
    Replace,
}

fn document_scopes() -> ScopeSet {
    [DOCUMENTS, DRIVE_FILE].into_iter().collect()
}

fn document_url(document_id: &str) -> String {
    format!("https://docs.google.com/document/d/{}/edit", document_id)
}

/// Update requests for an edit against a body ending at `end_index`.
///
/// Append inserts before the trailing newline. Replace deletes everything
/// between the body start and the trailing newline, then inserts at the
/// start; the delete is omitted when the body is already empty.
pub fn edit_requests(end_index: i64, content: &str, mode: EditMode) -> Vec<Value> {
    let last = (end_index - 1).max(BODY_START);
    match mode {
        EditMode::Append => vec![insert_text(last, content)],
        EditMode::Replace => {
            let mut requests = Vec::with_capacity(2);
            if last > BODY_START {
                requests.push(delete_range(BODY_START, last));
            }
            requests.push(insert_text(BODY_START, content));
            requests
        }
    }
}

/// Create a document, optionally seeded with `content`.
pub async fn create_document(session: &Session, title: &str, content: &str) -> ToolOutcome {
    run("create_document", async {
        if title.trim().is_empty() {
            return Err(ToolError::Validation("Document title is required".into()));
        }
        let docs = session.docs(&document_scopes()).await?;
        let document = docs.create_document(title).await?;
        let document_id = required_field(&document, "documentId")?;

        if !content.is_empty() {
            docs.batch_update(&document_id, vec![insert_text(BODY_START, content)])
                .await?;
        }

        Ok(ToolResult::success(
            format!("Document '{}' created", title),
            ToolPayload::DocumentCreated {
                url: document_url(&document_id),
                document_id,
                title: title.to_string(),
            },
        ))
    })
    .await
}

/// Append to or replace a document's body. The end offset is read fresh on
/// every call.
pub async fn edit_document(session: &Session, document_id: &str, content: &str, replace_all: bool) -> ToolOutcome {
    run("edit_document", async {
        if document_id.trim().is_empty() {
            return Err(ToolError::Validation("Document id is required".into()));
        }
        let mode = if replace_all { EditMode::Replace } else { EditMode::Append };

        let docs = session.docs(&document_scopes()).await?;
        let document = docs.get_document(document_id).await?;
        let requests = edit_requests(body_end_index(&document), content, mode);
        docs.batch_update(document_id, requests).await?;

        let message = match mode {
            EditMode::Append => "Content appended to document",
            EditMode::Replace => "Document content replaced",
        };
        Ok(ToolResult::success(
            message,
            ToolPayload::DocumentEdited {
                document_id: document_id.to_string(),
                mode,
            },
        ))
    })
    .await
}

/// Move a document to the Drive trash.
pub async fn delete_document(session: &Session, document_id: &str) -> ToolOutcome {
    run("delete_document", async {
        if document_id.trim().is_empty() {
            return Err(ToolError::Validation("Document id is required".into()));
        }
        let drive = session.drive(&[DRIVE_FILE].into_iter().collect()).await?;
        drive.trash_file(document_id).await?;

        Ok(ToolResult::success(
            "Document moved to trash",
            ToolPayload::DocumentId {
                document_id: document_id.to_string(),
            },
        ))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_append_inserts_at_prior_end() {
        let requests = edit_requests(57, "More text", EditMode::Append);
        assert_eq!(
            requests,
            vec![json!({"insertText": {"location": {"index": 56}, "text": "More text"}})]
        );
    }

    #[test]
    fn test_replace_deletes_then_inserts() {
        let requests = edit_requests(57, "Fresh", EditMode::Replace);
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0],
            json!({"deleteContentRange": {"range": {"startIndex": 1, "endIndex": 56}}})
        );
        assert_eq!(
            requests[1],
            json!({"insertText": {"location": {"index": 1}, "text": "Fresh"}})
        );
    }

    #[test]
    fn test_replace_on_empty_body_skips_delete() {
        let requests = edit_requests(2, "Fresh", EditMode::Replace);
        assert_eq!(requests.len(), 1);
    }
}
