//! Credential Store
//!
//! Produces a valid, sufficiently scoped credential for every tool call.
//!
//! Lifecycle: `NoToken → Authorizing → Valid`, `Valid → Expired`,
//! `Expired → Refreshing → Valid`, or `Refreshing → Authorizing` when the
//! refresh fails. Only `Authorizing` involves the user. The whole
//! check-refresh-persist sequence runs under one lock, so concurrent tool
//! calls cannot race to refresh and overwrite the token file.

pub mod client_secret;
pub mod consent;
pub mod provider;
pub mod scopes;
pub mod store;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::common::ConfigurationError;

pub use self::client_secret::ClientSecret;
pub use self::consent::{ConsentFlow, LoopbackConsent};
pub use self::provider::google::GoogleProvider;
pub use self::provider::{OAuthProvider, OAuthTokens};
pub use self::scopes::ScopeSet;
pub use self::store::TokenFile;

/// Seconds before expiry at which a token is already treated as expired
const EXPIRY_SKEW_SECS: i64 = 60;

// ── Public types ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("Authorization failed: {0}")]
    Consent(String),
    #[error("Token exchange failed: {0}")]
    TokenEndpoint(String),
}

/// Persisted OAuth credential (decrypted form)
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct CredentialRecord {
    #[serde(alias = "token")]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    #[zeroize(skip)]
    pub token_type: String,
    #[serde(default)]
    #[zeroize(skip)]
    pub scopes: ScopeSet,
    #[serde(default)]
    #[zeroize(skip)]
    pub expiry: String,
    #[serde(default)]
    #[zeroize(skip)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    #[zeroize(skip)]
    pub token_uri: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

// Custom Debug implementation that redacts sensitive fields
impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("scopes", &self.scopes)
            .field("expiry", &self.expiry)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl CredentialRecord {
    /// Build a record from a fresh token exchange.
    ///
    /// Falls back to the requested scopes when the token endpoint does not
    /// echo the granted ones.
    pub fn from_tokens(tokens: OAuthTokens, client: &ClientSecret, requested: &ScopeSet) -> Self {
        let scopes = if tokens.scopes.is_empty() {
            requested.clone()
        } else {
            tokens.scopes.iter().cloned().collect()
        };

        Self {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone().unwrap_or_default(),
            token_type: tokens.token_type.clone(),
            scopes,
            expiry: tokens.expiry.clone(),
            client_id: client.client_id.clone(),
            client_secret: client.client_secret.clone(),
            token_uri: client.token_uri.clone().unwrap_or_default(),
        }
    }

    /// Valid iff the expiry lies in the future.
    pub fn is_valid(&self) -> bool {
        !is_token_expiring(&self.expiry, EXPIRY_SKEW_SECS)
    }

    pub fn is_refreshable(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    fn apply_refresh(&mut self, tokens: &OAuthTokens) {
        self.access_token = tokens.access_token.clone();
        if let Some(rt) = &tokens.refresh_token {
            self.refresh_token = rt.clone();
        }
        self.token_type = tokens.token_type.clone();
        self.expiry = tokens.expiry.clone();
        if !tokens.scopes.is_empty() {
            self.scopes = tokens.scopes.iter().cloned().collect();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    NoToken,
    Valid,
    Expired,
    Refreshing,
    Authorizing,
}

/// A credential together with the lifecycle states it passed through.
#[derive(Debug, Clone)]
pub struct Acquisition {
    pub record: CredentialRecord,
    pub transitions: Vec<CredentialState>,
}

// ── Credential Store ────────────────────────────────────────────────────────

pub struct CredentialStore {
    token_file: TokenFile,
    client_secret_candidates: Vec<PathBuf>,
    base_scopes: ScopeSet,
    provider: Arc<dyn OAuthProvider>,
    consent: Arc<dyn ConsentFlow>,
    current: Mutex<Option<CredentialRecord>>,
}

impl CredentialStore {
    /// `base_scopes` is the union requested whenever the user must consent,
    /// so one authorization serves every tool in the process.
    pub fn new(
        token_file: TokenFile,
        client_secret_candidates: Vec<PathBuf>,
        base_scopes: ScopeSet,
        provider: Arc<dyn OAuthProvider>,
        consent: Arc<dyn ConsentFlow>,
    ) -> Self {
        Self {
            token_file,
            client_secret_candidates,
            base_scopes,
            provider,
            consent,
            current: Mutex::new(None),
        }
    }

    pub fn token_path(&self) -> &std::path::Path {
        self.token_file.path()
    }

    /// Return a credential that is valid and covers `required`.
    pub async fn acquire(&self, required: &ScopeSet) -> Result<CredentialRecord, AuthError> {
        self.acquire_traced(required).await.map(|a| a.record)
    }

    /// Like [`acquire`](Self::acquire), also reporting the lifecycle path taken.
    pub async fn acquire_traced(&self, required: &ScopeSet) -> Result<Acquisition, AuthError> {
        let mut current = self.current.lock().await;
        let mut transitions = Vec::new();

        if let Some(record) = current.as_ref() {
            if record.is_valid() && record.scopes.covers(required) {
                transitions.push(CredentialState::Valid);
                return Ok(Acquisition {
                    record: record.clone(),
                    transitions,
                });
            }
        }

        let persisted = match self.token_file.load() {
            Ok(record) => record,
            Err(e) => {
                warn!("Ignoring unusable token file: {}", e);
                None
            }
        };

        let record = match persisted.or_else(|| current.take()) {
            None => {
                enter(&mut transitions, CredentialState::NoToken);
                self.authorize(required, &mut transitions).await?
            }
            Some(record) if !record.scopes.covers(required) => {
                warn!(
                    "Stored token lacks scopes: {}",
                    record.scopes.missing(required).join(", ")
                );
                enter(&mut transitions, CredentialState::NoToken);
                self.authorize(required, &mut transitions).await?
            }
            Some(record) if record.is_valid() => {
                enter(&mut transitions, CredentialState::Valid);
                record
            }
            Some(record) => {
                enter(&mut transitions, CredentialState::Expired);
                if record.is_refreshable() {
                    match self.refresh(record, &mut transitions).await {
                        Ok(refreshed) => refreshed,
                        Err(e) => {
                            warn!("Error refreshing token: {}", e);
                            self.authorize(required, &mut transitions).await?
                        }
                    }
                } else {
                    info!("Token expired and cannot be refreshed");
                    self.authorize(required, &mut transitions).await?
                }
            }
        };

        *current = Some(record.clone());
        Ok(Acquisition { record, transitions })
    }

    /// Delete the persisted token and forget the cached one.
    pub async fn reset(&self) -> Result<bool, String> {
        let mut current = self.current.lock().await;
        *current = None;
        self.token_file.remove()
    }

    // ── Internal ────────────────────────────────────────────────────────────

    async fn refresh(
        &self,
        mut record: CredentialRecord,
        transitions: &mut Vec<CredentialState>,
    ) -> Result<CredentialRecord, String> {
        enter(transitions, CredentialState::Refreshing);
        let tokens = self.provider.refresh_token(&record).await?;
        record.apply_refresh(&tokens);

        info!("Token refreshed successfully");
        self.persist(&record);
        enter(transitions, CredentialState::Valid);
        Ok(record)
    }

    async fn authorize(
        &self,
        required: &ScopeSet,
        transitions: &mut Vec<CredentialState>,
    ) -> Result<CredentialRecord, AuthError> {
        enter(transitions, CredentialState::Authorizing);

        let client = ClientSecret::locate(&self.client_secret_candidates)?;
        let scopes = self.base_scopes.union(required);
        let tokens = self.consent.obtain(&client, &scopes).await?;
        let record = CredentialRecord::from_tokens(tokens, &client, &scopes);

        self.persist(&record);
        enter(transitions, CredentialState::Valid);
        Ok(record)
    }

    /// A write failure only costs the next process a re-authorization.
    fn persist(&self, record: &CredentialRecord) {
        if let Err(e) = self.token_file.save(record) {
            error!("Failed to persist credentials: {}", e);
        }
    }
}

fn enter(transitions: &mut Vec<CredentialState>, state: CredentialState) {
    info!(state = ?state, "Credential state");
    transitions.push(state);
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Check whether a token's expiry (RFC 3339) is within `margin_secs` of now.
fn is_token_expiring(expiry: &str, margin_secs: i64) -> bool {
    match chrono::DateTime::parse_from_rfc3339(expiry) {
        Ok(exp) => {
            let remaining = exp.signed_duration_since(chrono::Utc::now()).num_seconds();
            remaining < margin_secs
        }
        Err(_) => true, // unparseable ⇒ treat as expired
    }
}
