mod common;

use ceangal::tools::docs;
use common::{authorized_session, success_json};
use serde_json::json;

fn document(end_index: i64) -> serde_json::Value {
    json!({
        "documentId": "doc-1",
        "title": "Plan",
        "body": {"content": [
            {"endIndex": 1, "sectionBreak": {}},
            {"startIndex": 1, "endIndex": end_index, "paragraph": {}}
        ]}
    })
}

#[tokio::test]
async fn create_document_seeds_content() {
    let (_dir, server, session) = authorized_session().await;
    server.route("POST", "/docs/v1/documents", 200, json!({"documentId": "doc-1", "title": "Plan"}));
    server.route("POST", "/docs/v1/documents/doc-1:batchUpdate", 200, json!({"documentId": "doc-1", "replies": [{}]}));

    let result = success_json(docs::create_document(&session, "Plan", "First line").await);
    assert_eq!(result["document_id"], "doc-1");
    assert_eq!(result["title"], "Plan");
    assert_eq!(result["url"], "https://docs.google.com/document/d/doc-1/edit");

    let create = &server.requests_to("POST", "/docs/v1/documents")[0];
    assert_eq!(create.json(), json!({"title": "Plan"}));
    let update = &server.requests_to("POST", "/docs/v1/documents/doc-1:batchUpdate")[0];
    assert_eq!(
        update.json()["requests"],
        json!([{"insertText": {"location": {"index": 1}, "text": "First line"}}])
    );
}

#[tokio::test]
async fn create_document_without_content_makes_one_call() {
    let (_dir, server, session) = authorized_session().await;
    server.route("POST", "/docs/v1/documents", 200, json!({"documentId": "doc-2", "title": "Empty"}));

    success_json(docs::create_document(&session, "Empty", "").await);
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn edit_document_appends_at_current_end() {
    let (_dir, server, session) = authorized_session().await;
    server.route("GET", "/docs/v1/documents/doc-1", 200, document(42));
    server.route("GET", "/docs/v1/documents/doc-1", 200, document(60));
    server.route("POST", "/docs/v1/documents/doc-1:batchUpdate", 200, json!({"replies": [{}]}));

    let first = success_json(docs::edit_document(&session, "doc-1", "More", false).await);
    assert_eq!(first["mode"], "append");
    success_json(docs::edit_document(&session, "doc-1", "Again", false).await);

    // The end offset is fetched again for every edit
    assert_eq!(server.requests_to("GET", "/docs/v1/documents/doc-1").len(), 2);
    let updates = server.requests_to("POST", "/docs/v1/documents/doc-1:batchUpdate");
    assert_eq!(
        updates[0].json()["requests"],
        json!([{"insertText": {"location": {"index": 41}, "text": "More"}}])
    );
    assert_eq!(
        updates[1].json()["requests"],
        json!([{"insertText": {"location": {"index": 59}, "text": "Again"}}])
    );
}

#[tokio::test]
async fn edit_document_replace_deletes_then_inserts() {
    let (_dir, server, session) = authorized_session().await;
    server.route("GET", "/docs/v1/documents/doc-1", 200, document(42));
    server.route("POST", "/docs/v1/documents/doc-1:batchUpdate", 200, json!({"replies": [{}, {}]}));

    let result = success_json(docs::edit_document(&session, "doc-1", "New body", true).await);
    assert_eq!(result["mode"], "replace");

    let update = &server.requests_to("POST", "/docs/v1/documents/doc-1:batchUpdate")[0];
    assert_eq!(
        update.json()["requests"],
        json!([
            {"deleteContentRange": {"range": {"startIndex": 1, "endIndex": 41}}},
            {"insertText": {"location": {"index": 1}, "text": "New body"}}
        ])
    );
}

#[tokio::test]
async fn delete_document_moves_to_trash() {
    let (_dir, server, session) = authorized_session().await;
    server.route("PATCH", "/drive/v3/files/doc-1", 200, json!({"id": "doc-1", "trashed": true}));

    let result = success_json(docs::delete_document(&session, "doc-1").await);
    assert_eq!(result["document_id"], "doc-1");

    let patch = &server.requests_to("PATCH", "/drive/v3/files/doc-1")[0];
    assert_eq!(patch.json(), json!({"trashed": true}));
}

#[tokio::test]
async fn missing_document_is_a_vendor_error() {
    let (_dir, _server, session) = authorized_session().await;

    let result = docs::edit_document(&session, "nope", "text", false).await.unwrap();
    assert_eq!(result.error_kind(), Some(ceangal::ErrorKind::Vendor));
    assert!(result.message().contains("404"));
}
