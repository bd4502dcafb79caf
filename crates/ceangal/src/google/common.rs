//! Shared utilities for Google API modules

use serde_json::Value;

/// Extract an array field from a JSON response, returning an empty vec if missing.
///
/// Google APIs return lists under varying field names ("messages", "labels",
/// "files", "values"). This helper standardizes extraction.
pub fn extract_array(response: &Value, field: &str) -> Vec<Value> {
    response
        .get(field)
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
}

/// Extract a string field, or an empty string if missing.
pub fn extract_str(response: &Value, field: &str) -> String {
    response
        .get(field)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

/// Base64url encode (no padding) per RFC 4648 §5
pub fn base64_url_encode(data: &[u8]) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    URL_SAFE_NO_PAD.encode(data)
}

/// Decode base64url data, with or without padding.
pub fn base64_url_decode(data: &str) -> Option<Vec<u8>> {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    URL_SAFE_NO_PAD.decode(data.trim_end_matches('=')).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_array_missing_field() {
        assert!(extract_array(&json!({"resultSizeEstimate": 0}), "messages").is_empty());
    }

    #[test]
    fn test_base64_url_round_trips_padded_input() {
        let encoded = base64_url_encode(b"Hello, World!");
        assert!(!encoded.contains('='));
        assert_eq!(base64_url_decode("SGVsbG8sIFdvcmxkIQ==").unwrap(), b"Hello, World!");
        assert_eq!(base64_url_decode(&encoded).unwrap(), b"Hello, World!");
    }
}
