//! Mail tools
//!
//! Send, list, read and label-manage Gmail messages.

use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{required_field, run, ToolError, ToolOutcome, ToolPayload, ToolResult};
use crate::auth::scopes::{ScopeSet, GMAIL_MODIFY, GMAIL_READONLY, GMAIL_SEND};
use crate::google::common::{base64_url_decode, extract_array};
use crate::session::Session;

const NO_SUBJECT: &str = "(No Subject)";
const UNKNOWN_SENDER: &str = "(Unknown Sender)";
const UNKNOWN_DATE: &str = "(Unknown Date)";
const PREVIEW_CHARS: usize = 150;
const UNREAD_LABEL: &str = "UNREAD";

fn scopes(scope: &str) -> ScopeSet {
    [scope].into_iter().collect()
}

// ── Query building ──────────────────────────────────────────────────────────

/// Relative date window for message searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
    Today,
    Yesterday,
    Week,
    Month,
}

impl DateFilter {
    /// Unknown names yield `None` (no window applied).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "today" => Some(Self::Today),
            "yesterday" => Some(Self::Yesterday),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            _ => None,
        }
    }

    /// `(after, before)` bounds relative to `today`.
    pub fn window(self, today: NaiveDate) -> (NaiveDate, Option<NaiveDate>) {
        match self {
            Self::Today => (today, None),
            Self::Yesterday => (today - Duration::days(1), Some(today)),
            Self::Week => (today - Duration::days(7), None),
            Self::Month => (today - Duration::days(30), None),
        }
    }
}

/// Filters accepted by `list_messages`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MessageFilter {
    pub max_results: usize,
    pub sender: String,
    pub date_filter: String,
    pub subject_filter: String,
    #[serde(alias = "is_unread")]
    pub unread_only: bool,
}

impl Default for MessageFilter {
    fn default() -> Self {
        Self {
            max_results: 10,
            sender: String::new(),
            date_filter: String::new(),
            subject_filter: String::new(),
            unread_only: false,
        }
    }
}

/// Gmail search query for `filter`, with date windows relative to `today`.
pub fn build_query(filter: &MessageFilter, today: NaiveDate) -> String {
    let mut parts = Vec::new();

    let sender = filter.sender.trim();
    if !sender.is_empty() {
        parts.push(format!("from:{}", sender));
    }

    if let Some(window) = DateFilter::parse(&filter.date_filter) {
        let (after, before) = window.window(today);
        parts.push(format!("after:{}", after.format("%Y/%m/%d")));
        if let Some(before) = before {
            parts.push(format!("before:{}", before.format("%Y/%m/%d")));
        }
    }

    let subject = filter.subject_filter.trim();
    if !subject.is_empty() {
        if subject.contains(char::is_whitespace) {
            parts.push(format!("subject:\"{}\"", subject.replace('"', "")));
        } else {
            parts.push(format!("subject:{}", subject));
        }
    }

    if filter.unread_only {
        parts.push("is:unread".to_string());
    }

    parts.join(" ")
}

// ── Message projection ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailSummary {
    pub id: String,
    pub thread_id: String,
    pub subject: String,
    pub sender: String,
    pub date: String,
    pub preview: String,
    pub has_attachments: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttachmentInfo {
    pub attachment_id: String,
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailDetail {
    pub id: String,
    pub thread_id: String,
    pub subject: String,
    pub sender: String,
    pub to: String,
    pub date: String,
    pub body: String,
    pub attachments: Vec<AttachmentInfo>,
    pub labels: Vec<String>,
}

/// First header named `name` (case-insensitive).
pub fn header_value<'a>(message: &'a Value, name: &str) -> Option<&'a str> {
    message
        .pointer("/payload/headers")
        .and_then(|h| h.as_array())?
        .iter()
        .find(|h| {
            h.get("name")
                .and_then(|n| n.as_str())
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
        .and_then(|h| h.get("value"))
        .and_then(|v| v.as_str())
}

fn header_or(message: &Value, name: &str, placeholder: &str) -> String {
    header_value(message, name).unwrap_or(placeholder).to_string()
}

fn decode_part_data(part: &Value) -> Option<String> {
    let data = part.pointer("/body/data").and_then(|d| d.as_str())?;
    if data.is_empty() {
        return None;
    }
    base64_url_decode(data).map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

fn find_plain_text(parts: &[Value]) -> Option<String> {
    for part in parts {
        let mime = part.get("mimeType").and_then(|m| m.as_str()).unwrap_or_default();
        if mime == "text/plain" {
            if let Some(text) = decode_part_data(part) {
                return Some(text);
            }
        }
        if let Some(nested) = part.get("parts").and_then(|p| p.as_array()) {
            if let Some(text) = find_plain_text(nested) {
                return Some(text);
            }
        }
    }
    None
}

/// Plain-text body: the top-level body, else the first `text/plain` part
/// (depth-first), else the snippet.
pub fn extract_body(message: &Value) -> String {
    let payload = message.get("payload").cloned().unwrap_or(Value::Null);

    decode_part_data(&payload)
        .or_else(|| {
            payload
                .get("parts")
                .and_then(|p| p.as_array())
                .and_then(|parts| find_plain_text(parts))
        })
        .unwrap_or_else(|| {
            message
                .get("snippet")
                .and_then(|s| s.as_str())
                .unwrap_or_default()
                .to_string()
        })
}

/// Top-level parts carrying a filename.
pub fn extract_attachments(message: &Value) -> Vec<AttachmentInfo> {
    message
        .pointer("/payload/parts")
        .and_then(|p| p.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| {
                    let filename = part.get("filename").and_then(|f| f.as_str())?;
                    if filename.is_empty() {
                        return None;
                    }
                    Some(AttachmentInfo {
                        attachment_id: part
                            .pointer("/body/attachmentId")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .to_string(),
                        filename: filename.to_string(),
                        mime_type: part
                            .get("mimeType")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .to_string(),
                        size: part.pointer("/body/size").and_then(|v| v.as_u64()).unwrap_or(0),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn preview(body: &str) -> String {
    if body.chars().count() > PREVIEW_CHARS {
        let head: String = body.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        body.to_string()
    }
}

fn str_field(message: &Value, field: &str) -> String {
    message
        .get(field)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

pub fn summarize(message: &Value) -> EmailSummary {
    EmailSummary {
        id: str_field(message, "id"),
        thread_id: str_field(message, "threadId"),
        subject: header_or(message, "Subject", NO_SUBJECT),
        sender: header_or(message, "From", UNKNOWN_SENDER),
        date: header_or(message, "Date", UNKNOWN_DATE),
        preview: preview(&extract_body(message)),
        has_attachments: !extract_attachments(message).is_empty(),
    }
}

pub fn detail(message: &Value) -> EmailDetail {
    EmailDetail {
        id: str_field(message, "id"),
        thread_id: str_field(message, "threadId"),
        subject: header_or(message, "Subject", NO_SUBJECT),
        sender: header_or(message, "From", UNKNOWN_SENDER),
        to: header_value(message, "To").unwrap_or_default().to_string(),
        date: header_or(message, "Date", UNKNOWN_DATE),
        body: extract_body(message),
        attachments: extract_attachments(message),
        labels: extract_array(message, "labelIds")
            .iter()
            .filter_map(|l| l.as_str().map(String::from))
            .collect(),
    }
}

fn validate_recipient(to: &str) -> Result<&str, ToolError> {
    let to = to.trim();
    if to.is_empty() {
        return Err(ToolError::Validation("Recipient address is required".into()));
    }
    if to.chars().any(char::is_control) {
        return Err(ToolError::Validation(
            "Recipient address must not contain control characters".into(),
        ));
    }
    if to.contains(',') || to.contains(';') {
        return Err(ToolError::Validation(
            "Only a single recipient is supported".into(),
        ));
    }
    Ok(to)
}

/// Header values are single-line; a line break would start a new header.
fn validate_subject(subject: &str) -> Result<&str, ToolError> {
    if subject.contains(['\r', '\n']) {
        return Err(ToolError::Validation(
            "Subject must not contain line breaks".into(),
        ));
    }
    Ok(subject)
}

// ── Tools ───────────────────────────────────────────────────────────────────

/// Send a plain-text email to a single recipient.
pub async fn send_mail(session: &Session, to: &str, subject: &str, body: &str) -> ToolOutcome {
    run("send_mail", async {
        let to = validate_recipient(to)?;
        let subject = validate_subject(subject)?;
        let gmail = session.gmail(&scopes(GMAIL_SEND)).await?;
        let sent = gmail.send_message(to, subject, body).await?;
        let message_id = required_field(&sent, "id")?;

        Ok(ToolResult::success(
            format!("Email sent successfully to {}", to),
            ToolPayload::MessageId { message_id },
        ))
    })
    .await
}

pub async fn list_labels(session: &Session) -> ToolOutcome {
    run("list_labels", async {
        let gmail = session.gmail(&scopes(GMAIL_READONLY)).await?;
        let labels: Vec<String> = gmail
            .list_labels()
            .await?
            .iter()
            .filter_map(|l| l.get("name").and_then(|n| n.as_str()).map(String::from))
            .collect();

        let message = if labels.is_empty() {
            "No labels found".to_string()
        } else {
            format!("Found {} labels", labels.len())
        };
        Ok(ToolResult::success(message, ToolPayload::Labels { labels }))
    })
    .await
}

/// Search messages and summarize each match.
pub async fn list_messages(session: &Session, filter: &MessageFilter) -> ToolOutcome {
    let today = Local::now().date_naive();
    run("list_messages", async {
        if filter.max_results == 0 {
            return Err(ToolError::Validation("max_results must be at least 1".into()));
        }

        let query = build_query(filter, today);
        debug!("Gmail query: {:?}", query);

        let gmail = session.gmail(&scopes(GMAIL_READONLY)).await?;
        let stubs = gmail
            .list_messages(Some(query.as_str()), Some(filter.max_results))
            .await?;

        let mut emails = Vec::with_capacity(stubs.len());
        for stub in &stubs {
            let Some(id) = stub.get("id").and_then(|v| v.as_str()) else {
                continue;
            };
            let message = gmail.get_message(id, Some("full")).await?;
            emails.push(summarize(&message));
        }

        let count = emails.len();
        let message = if count == 0 {
            "No emails found matching the criteria".to_string()
        } else {
            format!("Found {} emails", count)
        };
        Ok(ToolResult::success(
            message,
            ToolPayload::Messages { emails, count, query },
        ))
    })
    .await
}

pub async fn get_message(session: &Session, message_id: &str) -> ToolOutcome {
    run("get_message", async {
        if message_id.trim().is_empty() {
            return Err(ToolError::Validation("Message id is required".into()));
        }
        let gmail = session.gmail(&scopes(GMAIL_READONLY)).await?;
        let message = gmail.get_message(message_id, Some("full")).await?;

        Ok(ToolResult::success(
            "Email retrieved successfully",
            ToolPayload::Message {
                email: detail(&message),
            },
        ))
    })
    .await
}

/// Remove the UNREAD label. Repeating the call is harmless.
pub async fn mark_read(session: &Session, message_id: &str) -> ToolOutcome {
    run("mark_read", async {
        if message_id.trim().is_empty() {
            return Err(ToolError::Validation("Message id is required".into()));
        }
        let gmail = session.gmail(&scopes(GMAIL_MODIFY)).await?;
        gmail.modify_message(message_id, &[], &[UNREAD_LABEL]).await?;

        Ok(ToolResult::success(
            "Email marked as read",
            ToolPayload::MessageId {
                message_id: message_id.to_string(),
            },
        ))
    })
    .await
}

/// Gmail's estimate of unread messages; not an exact count.
pub async fn count_unread(session: &Session) -> ToolOutcome {
    run("count_unread", async {
        let gmail = session.gmail(&scopes(GMAIL_READONLY)).await?;
        let unread_count = gmail.estimate_count("is:unread").await?;

        Ok(ToolResult::success(
            format!("About {} unread emails", unread_count),
            ToolPayload::UnreadCount {
                unread_count,
                estimated: true,
            },
        ))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::common::base64_url_encode;
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn filter(date_filter: &str) -> MessageFilter {
        MessageFilter {
            date_filter: date_filter.into(),
            ..MessageFilter::default()
        }
    }

    #[test]
    fn test_date_windows() {
        let today = day(2024, 3, 1);
        assert_eq!(build_query(&filter("today"), today), "after:2024/03/01");
        assert_eq!(
            build_query(&filter("yesterday"), today),
            "after:2024/02/29 before:2024/03/01"
        );
        assert_eq!(build_query(&filter("week"), today), "after:2024/02/23");
        assert_eq!(build_query(&filter("month"), today), "after:2024/01/31");
    }

    #[test]
    fn test_unknown_date_filter_is_ignored() {
        assert_eq!(build_query(&filter("fortnight"), day(2024, 3, 1)), "");
    }

    #[test]
    fn test_full_query() {
        let filter = MessageFilter {
            sender: "billing@example.com".into(),
            date_filter: "Today".into(),
            subject_filter: "invoice due".into(),
            unread_only: true,
            ..MessageFilter::default()
        };
        assert_eq!(
            build_query(&filter, day(2024, 5, 10)),
            "from:billing@example.com after:2024/05/10 subject:\"invoice due\" is:unread"
        );
    }

    fn encoded(text: &str) -> String {
        base64_url_encode(text.as_bytes())
    }

    #[test]
    fn test_headers_case_insensitive_first_match() {
        let message = json!({
            "payload": {"headers": [
                {"name": "subject", "value": "First"},
                {"name": "Subject", "value": "Second"}
            ]}
        });
        let summary = summarize(&message);
        assert_eq!(summary.subject, "First");
        assert_eq!(summary.sender, UNKNOWN_SENDER);
        assert_eq!(summary.date, UNKNOWN_DATE);
    }

    #[test]
    fn test_body_prefers_top_level() {
        let message = json!({
            "snippet": "snip",
            "payload": {
                "body": {"data": encoded("top level")},
                "parts": [{"mimeType": "text/plain", "body": {"data": encoded("part")}}]
            }
        });
        assert_eq!(extract_body(&message), "top level");
    }

    #[test]
    fn test_body_searches_nested_parts() {
        let message = json!({
            "snippet": "snip",
            "payload": {
                "mimeType": "multipart/mixed",
                "body": {"size": 0},
                "parts": [
                    {"mimeType": "multipart/alternative", "parts": [
                        {"mimeType": "text/html", "body": {"data": encoded("<p>html</p>")}},
                        {"mimeType": "text/plain", "body": {"data": encoded("plain text")}}
                    ]},
                    {"mimeType": "application/pdf", "filename": "q3.pdf",
                     "body": {"attachmentId": "ANGjdJ8", "size": 48213}}
                ]
            }
        });
        assert_eq!(extract_body(&message), "plain text");

        let attachments = extract_attachments(&message);
        assert_eq!(
            attachments,
            vec![AttachmentInfo {
                attachment_id: "ANGjdJ8".into(),
                filename: "q3.pdf".into(),
                mime_type: "application/pdf".into(),
                size: 48213,
            }]
        );
    }

    #[test]
    fn test_body_falls_back_to_snippet() {
        let message = json!({
            "snippet": "Meeting moved to 3pm",
            "payload": {"mimeType": "text/html", "body": {"size": 0}}
        });
        assert_eq!(extract_body(&message), "Meeting moved to 3pm");
    }

    #[test]
    fn test_preview_truncates_on_chars() {
        let long = "é".repeat(200);
        let p = preview(&long);
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 3);
        assert!(p.ends_with("..."));
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn test_recipient_validation() {
        assert!(validate_recipient("a@example.com").is_ok());
        assert!(matches!(validate_recipient("  "), Err(ToolError::Validation(_))));
        assert!(matches!(
            validate_recipient("a@example.com, b@example.com"),
            Err(ToolError::Validation(_))
        ));
        assert!(matches!(
            validate_recipient("a@example.com;b@example.com"),
            Err(ToolError::Validation(_))
        ));
        assert!(matches!(
            validate_recipient("a@example.com\r\nBcc: x@example.com"),
            Err(ToolError::Validation(_))
        ));
        assert!(matches!(
            validate_recipient("a@example.com\tb"),
            Err(ToolError::Validation(_))
        ));
    }

    #[test]
    fn test_subject_must_be_single_line() {
        assert_eq!(validate_subject("Q1 numbers").ok(), Some("Q1 numbers"));
        assert!(matches!(
            validate_subject("Hi\r\nCc: other@example.com"),
            Err(ToolError::Validation(_))
        ));
        assert!(matches!(validate_subject("Hi\nthere"), Err(ToolError::Validation(_))));
    }
}
