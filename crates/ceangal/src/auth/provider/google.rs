//! Google OAuth2 Provider
//!
//! Implements the PKCE Authorization Code flow for installed applications.
//! Client credentials come from the client secret file; endpoints default to
//! the configured ones unless the client secret or token record names its own.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{error, info};

use super::{OAuthProvider, OAuthTokens};
use crate::auth::client_secret::ClientSecret;
use crate::auth::scopes::ScopeSet;
use crate::auth::CredentialRecord;

/// Google OAuth2 provider.
pub struct GoogleProvider {
    http: reqwest::Client,
    authorize_endpoint: String,
    token_endpoint: String,
}

impl GoogleProvider {
    pub fn new(
        http: reqwest::Client,
        authorize_endpoint: impl Into<String>,
        token_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            http,
            authorize_endpoint: authorize_endpoint.into(),
            token_endpoint: token_endpoint.into(),
        }
    }

    fn token_endpoint_for<'a>(&'a self, preferred: Option<&'a str>) -> &'a str {
        match preferred {
            Some(uri) if !uri.is_empty() => uri,
            _ => self.token_endpoint.as_str(),
        }
    }

    /// POST a form-encoded request and return the response body.
    async fn post_form(&self, url: &str, params: &HashMap<&str, &str>) -> Result<String, String> {
        let response = self
            .http
            .post(url)
            .form(params)
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            error!("HTTP error {}: {}", status, body);
            return Err(format!("HTTP {} error: {}", status, body));
        }

        response
            .text()
            .await
            .map_err(|e| format!("Failed to read response body: {}", e))
    }
}

#[async_trait]
impl OAuthProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn authorize_url(
        &self,
        client: &ClientSecret,
        scopes: &ScopeSet,
        state: &str,
        code_challenge: &str,
        redirect_uri: &str,
    ) -> String {
        let endpoint = client
            .auth_uri
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(self.authorize_endpoint.as_str());

        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&code_challenge={}&code_challenge_method=S256&access_type=offline&prompt=consent",
            endpoint,
            urlencoding::encode(&client.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scopes.to_param()),
            urlencoding::encode(state),
            urlencoding::encode(code_challenge),
        )
    }

    async fn exchange_code(
        &self,
        client: &ClientSecret,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<OAuthTokens, String> {
        info!("Exchanging authorization code for tokens");

        let mut params = HashMap::new();
        params.insert("client_id", client.client_id.as_str());
        params.insert("client_secret", client.client_secret.as_str());
        params.insert("code", code);
        params.insert("code_verifier", code_verifier);
        params.insert("grant_type", "authorization_code");
        params.insert("redirect_uri", redirect_uri);

        let url = self.token_endpoint_for(client.token_uri.as_deref());
        let response = self.post_form(url, &params).await?;
        parse_token_response(&response)
    }

    async fn refresh_token(&self, record: &CredentialRecord) -> Result<OAuthTokens, String> {
        info!("Refreshing access token");

        let mut params = HashMap::new();
        params.insert("client_id", record.client_id.as_str());
        params.insert("client_secret", record.client_secret.as_str());
        params.insert("refresh_token", record.refresh_token.as_str());
        params.insert("grant_type", "refresh_token");

        let url = self.token_endpoint_for(Some(&record.token_uri));
        let response = self.post_form(url, &params).await?;
        parse_token_response(&response)
    }
}

/// Parse a Google OAuth2 token response.
pub(crate) fn parse_token_response(body: &str) -> Result<OAuthTokens, String> {
    let parsed: serde_json::Value =
        serde_json::from_str(body).map_err(|e| format!("Invalid JSON response: {}", e))?;

    if let Some(err) = parsed.get("error").and_then(|v| v.as_str()) {
        let desc = parsed
            .get("error_description")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown error");
        return Err(format!("{}: {}", err, desc));
    }

    let access_token = parsed
        .get("access_token")
        .and_then(|v| v.as_str())
        .ok_or("Missing access_token in response")?
        .to_string();

    let refresh_token = parsed
        .get("refresh_token")
        .and_then(|v| v.as_str())
        .map(String::from);

    let token_type = parsed
        .get("token_type")
        .and_then(|v| v.as_str())
        .unwrap_or("Bearer")
        .to_string();

    let expires_in = parsed
        .get("expires_in")
        .and_then(|v| v.as_u64())
        .unwrap_or(3600);

    let expiry = (chrono::Utc::now() + chrono::Duration::seconds(expires_in as i64)).to_rfc3339();

    let scopes = parsed
        .get("scope")
        .and_then(|v| v.as_str())
        .map(|s| s.split_whitespace().map(String::from).collect())
        .unwrap_or_default();

    Ok(OAuthTokens {
        access_token,
        refresh_token,
        token_type,
        expiry,
        scopes,
    })
}

// ── PKCE Utilities ──────────────────────────────────────────────────────────

/// Generate a PKCE code verifier (43-128 characters of unreserved URI characters).
pub fn generate_code_verifier() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    base64_url_encode(&bytes)
}

/// Derive the PKCE code challenge from a code verifier using S256.
pub fn generate_code_challenge(verifier: &str) -> String {
    use sha2::{Digest, Sha256};
    let hash = Sha256::digest(verifier.as_bytes());
    base64_url_encode(&hash)
}

fn base64_url_encode(data: &[u8]) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    URL_SAFE_NO_PAD.encode(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ClientSecret {
        ClientSecret {
            client_id: "214.apps.googleusercontent.com".to_string(),
            client_secret: "shh".to_string(),
            auth_uri: None,
            token_uri: None,
        }
    }

    #[test]
    fn test_code_verifier_length() {
        let v = generate_code_verifier();
        assert!(v.len() >= 43);
        assert!(v.len() <= 128);
    }

    #[test]
    fn test_code_challenge_is_rfc7636_s256() {
        // Appendix B of RFC 7636
        let challenge = generate_code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn test_authorize_url_requests_offline_access() {
        let provider = GoogleProvider::new(
            reqwest::Client::new(),
            "https://accounts.google.com/o/oauth2/v2/auth",
            "https://oauth2.googleapis.com/token",
        );
        let scopes: ScopeSet = ["https://www.googleapis.com/auth/gmail.send"].into_iter().collect();
        let url = provider.authorize_url(&client(), &scopes, "st4te", "ch4llenge", "http://127.0.0.1:5555");

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("state=st4te"));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A5555"));
        assert!(url.contains("gmail.send"));
    }

    #[test]
    fn test_parse_token_response_success() {
        let body = r#"{
            "access_token": "ya29.test",
            "refresh_token": "1//0e.test",
            "token_type": "Bearer",
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/gmail.send https://www.googleapis.com/auth/documents"
        }"#;

        let tokens = parse_token_response(body).unwrap();
        assert_eq!(tokens.access_token, "ya29.test");
        assert_eq!(tokens.refresh_token.as_deref(), Some("1//0e.test"));
        assert_eq!(tokens.scopes.len(), 2);
    }

    #[test]
    fn test_parse_token_response_error() {
        let body = r#"{"error": "invalid_grant", "error_description": "Token has been expired or revoked."}"#;
        let err = parse_token_response(body).unwrap_err();
        assert!(err.starts_with("invalid_grant"));
    }
}
