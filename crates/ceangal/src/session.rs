//! Session
//!
//! Explicit context handed to every tool: configuration, the credential
//! store and the service factory. Nothing here is process-global.

use std::sync::Arc;
use tracing::debug;

use crate::auth::scopes::{self, ScopeSet};
use crate::auth::{AuthError, ConsentFlow, CredentialStore, GoogleProvider, LoopbackConsent, OAuthProvider, TokenFile};
use crate::config::Config;
use crate::google::{DocsApi, DriveApi, GmailApi, SearchApi, ServiceFactory, SheetsApi};

#[derive(Clone)]
pub struct Session {
    config: Arc<Config>,
    credentials: Arc<CredentialStore>,
    factory: ServiceFactory,
}

impl Session {
    /// Production wiring: Google OAuth with browser consent on a loopback port.
    pub fn from_config(config: Config) -> Result<Self, String> {
        let factory = ServiceFactory::new(&config)?;
        let provider: Arc<dyn OAuthProvider> = Arc::new(GoogleProvider::new(
            factory.http().clone(),
            config.endpoints.oauth_authorize.as_str(),
            config.endpoints.oauth_token.as_str(),
        ));
        let consent: Arc<dyn ConsentFlow> =
            Arc::new(LoopbackConsent::new(provider.clone(), config.consent_timeout()));

        Ok(Self::assemble(config, factory, provider, consent))
    }

    /// Wire arbitrary provider and consent implementations.
    pub fn with_parts(
        config: Config,
        provider: Arc<dyn OAuthProvider>,
        consent: Arc<dyn ConsentFlow>,
    ) -> Result<Self, String> {
        let factory = ServiceFactory::new(&config)?;
        Ok(Self::assemble(config, factory, provider, consent))
    }

    fn assemble(
        config: Config,
        factory: ServiceFactory,
        provider: Arc<dyn OAuthProvider>,
        consent: Arc<dyn ConsentFlow>,
    ) -> Self {
        let credentials = CredentialStore::new(
            TokenFile::new(config.token_path()),
            config.client_secret_paths(),
            scopes::ALL.into_iter().collect(),
            provider,
            consent,
        );
        debug!("Session ready (token file: {:?})", credentials.token_path());

        Self {
            config: Arc::new(config),
            credentials: Arc::new(credentials),
            factory,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub async fn gmail(&self, scopes: &ScopeSet) -> Result<GmailApi, AuthError> {
        let record = self.credentials.acquire(scopes).await?;
        Ok(self.factory.gmail(&record))
    }

    pub async fn docs(&self, scopes: &ScopeSet) -> Result<DocsApi, AuthError> {
        let record = self.credentials.acquire(scopes).await?;
        Ok(self.factory.docs(&record))
    }

    pub async fn drive(&self, scopes: &ScopeSet) -> Result<DriveApi, AuthError> {
        let record = self.credentials.acquire(scopes).await?;
        Ok(self.factory.drive(&record))
    }

    pub async fn sheets(&self, scopes: &ScopeSet) -> Result<SheetsApi, AuthError> {
        let record = self.credentials.acquire(scopes).await?;
        Ok(self.factory.sheets(&record))
    }

    pub fn search(&self) -> SearchApi {
        self.factory.search()
    }
}
