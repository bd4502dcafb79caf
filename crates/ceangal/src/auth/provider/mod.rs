//! OAuth Provider Abstraction
//!
//! Trait-based provider so the credential store can be driven by the real
//! Google endpoints or by an in-process fake.

pub mod google;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::client_secret::ClientSecret;
use super::scopes::ScopeSet;
use super::CredentialRecord;

/// Tokens returned from an OAuth token exchange or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expiry: String,
    pub scopes: Vec<String>,
}

/// OAuth provider trait.
///
/// Each provider implements authorization URL construction, code exchange
/// and token refresh.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Provider name (e.g. "google")
    fn name(&self) -> &str;

    /// Build the authorization URL for the PKCE flow.
    fn authorize_url(
        &self,
        client: &ClientSecret,
        scopes: &ScopeSet,
        state: &str,
        code_challenge: &str,
        redirect_uri: &str,
    ) -> String;

    /// Exchange an authorization code for tokens.
    async fn exchange_code(
        &self,
        client: &ClientSecret,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<OAuthTokens, String>;

    /// Refresh the access token held by `record`.
    async fn refresh_token(&self, record: &CredentialRecord) -> Result<OAuthTokens, String>;
}
