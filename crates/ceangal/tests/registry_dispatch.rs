mod common;

use std::sync::Arc;
use std::time::Duration;

use ceangal::auth::{GoogleProvider, LoopbackConsent, OAuthProvider};
use ceangal::tools::DispatchError;
use ceangal::{ErrorKind, Session, ToolRegistry};
use common::{authorized_session, config, write_client_secret, FakeGoogle};
use serde_json::json;

#[tokio::test]
async fn unknown_tool_is_a_dispatch_error() {
    let (_dir, _server, session) = authorized_session().await;
    let registry = ToolRegistry::new(session);

    let err = registry.call("delete_everything", json!({})).await.unwrap_err();
    assert!(matches!(err, DispatchError::UnknownTool(name) if name == "delete_everything"));
}

#[tokio::test]
async fn malformed_arguments_become_validation_results() {
    let (_dir, server, session) = authorized_session().await;
    let registry = ToolRegistry::new(session);

    let result = registry
        .call("delete_sheet", json!({"spreadsheet_id": "ss-1", "sheet_id": "not-a-number"}))
        .await
        .unwrap();
    assert_eq!(result.error_kind(), Some(ErrorKind::Validation));
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn call_routes_arguments_to_the_tool() {
    let (_dir, server, session) = authorized_session().await;
    server.route(
        "POST",
        "/gmail/v1/users/me/messages/m9/modify",
        200,
        json!({"id": "m9", "labelIds": ["INBOX"]}),
    );
    let registry = ToolRegistry::new(session);

    // `id` is accepted as an alias for `message_id`
    let result = registry.call("mark_read", json!({"id": "m9"})).await.unwrap();
    assert_eq!(result.to_json()["message_id"], "m9");
}

#[tokio::test]
async fn list_tools_without_arguments() {
    let (_dir, server, session) = authorized_session().await;
    server.route("GET", "/gmail/v1/users/me/labels", 200, json!({"labels": []}));
    let registry = ToolRegistry::new(session);

    let result = registry.call("list_labels", serde_json::Value::Null).await.unwrap();
    assert!(result.is_success());
}

#[tokio::test]
async fn deadline_cuts_off_a_stuck_call() {
    let dir = tempfile::tempdir().unwrap();
    let server = FakeGoogle::start().await;
    write_client_secret(dir.path(), &server);

    let mut config = config(dir.path(), &server);
    config.tool_deadline_secs = Some(1);
    let provider: Arc<dyn OAuthProvider> = Arc::new(GoogleProvider::new(
        reqwest::Client::new(),
        config.endpoints.oauth_authorize.as_str(),
        config.endpoints.oauth_token.as_str(),
    ));
    // Nobody ever answers the consent prompt
    let consent = Arc::new(
        LoopbackConsent::new(provider.clone(), Duration::from_secs(60)).with_launcher(Arc::new(|_: &str| Ok(()))),
    );
    let registry = ToolRegistry::new(Session::with_parts(config, provider, consent).unwrap());

    let result = registry.call("count_unread", json!({})).await.unwrap();
    assert_eq!(result.error_kind(), Some(ErrorKind::Deadline));
}
