//! Google API Client Module
//!
//! Authenticated REST access to Gmail, Docs, Drive, Sheets and Custom
//! Search, plus the factory that binds a credential to each API surface.

pub mod client;
pub mod common;
pub mod docs;
pub mod drive;
pub mod gmail;
pub mod search;
pub mod sheets;

pub use client::{GoogleClient, GoogleError};
pub use docs::DocsApi;
pub use drive::DriveApi;
pub use gmail::GmailApi;
pub use search::SearchApi;
pub use sheets::SheetsApi;

use crate::auth::CredentialRecord;
use crate::common::create_http_client;
use crate::config::{Config, Endpoints};

/// Macro to implement the standard Google API wrapper constructor pattern.
/// Each API struct wraps a `GoogleClient` and the base URL of its surface.
macro_rules! google_api_wrapper {
    ($name:ident) => {
        impl $name {
            /// Bind an API handle to a client and base URL
            pub fn new(client: crate::google::client::GoogleClient, base_url: impl Into<String>) -> Self {
                Self {
                    client,
                    base_url: base_url.into().trim_end_matches('/').to_string(),
                }
            }
        }
    };
}

pub(crate) use google_api_wrapper;

/// Builds per-API handles from a credential. Performs no network I/O.
#[derive(Clone)]
pub struct ServiceFactory {
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl ServiceFactory {
    pub fn new(config: &Config) -> Result<Self, String> {
        let http = create_http_client(config.request_timeout(), config.connect_timeout())?;
        Ok(Self::with_client(http, config.endpoints.clone()))
    }

    pub fn with_client(http: reqwest::Client, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }

    /// HTTP client shared by every handle (also used for token requests)
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn bearer(&self, record: &CredentialRecord) -> GoogleClient {
        GoogleClient::new(self.http.clone(), record.access_token.clone())
    }

    pub fn gmail(&self, record: &CredentialRecord) -> GmailApi {
        GmailApi::new(self.bearer(record), self.endpoints.gmail.as_str())
    }

    pub fn docs(&self, record: &CredentialRecord) -> DocsApi {
        DocsApi::new(self.bearer(record), self.endpoints.docs.as_str())
    }

    pub fn drive(&self, record: &CredentialRecord) -> DriveApi {
        DriveApi::new(self.bearer(record), self.endpoints.drive.as_str())
    }

    pub fn sheets(&self, record: &CredentialRecord) -> SheetsApi {
        SheetsApi::new(self.bearer(record), self.endpoints.sheets.as_str())
    }

    /// Custom Search is key-authenticated; no credential involved.
    pub fn search(&self) -> SearchApi {
        SearchApi::new(GoogleClient::anonymous(self.http.clone()), self.endpoints.search.as_str())
    }
}
