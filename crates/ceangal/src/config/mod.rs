//! Configuration management
//!
//! Reads `ceangal.json` from the project root. Every field has a default, so
//! a missing file is a valid (default) configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::common::{ceangal_dir, resolve_path};

/// Environment variable overriding the project root
pub const ROOT_ENV: &str = "CEANGAL_ROOT";
/// Config file name inside the project root
pub const CONFIG_FILE: &str = "ceangal.json";

const SEARCH_KEY_ENV: &str = "GOOGLE_SEARCH_API_KEY";
const SEARCH_ENGINE_ENV: &str = "GOOGLE_SEARCH_ENGINE_ID";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Could not determine project root: {0}")]
    NoRoot(String),
    #[error("Failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Base URLs of every remote endpoint the tools talk to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub gmail: String,
    pub docs: String,
    pub drive: String,
    pub sheets: String,
    pub search: String,
    pub oauth_authorize: String,
    pub oauth_token: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            gmail: "https://gmail.googleapis.com/gmail/v1".to_string(),
            docs: "https://docs.googleapis.com/v1".to_string(),
            drive: "https://www.googleapis.com/drive/v3".to_string(),
            sheets: "https://sheets.googleapis.com/v4".to_string(),
            search: "https://www.googleapis.com/customsearch/v1".to_string(),
            oauth_authorize: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            oauth_token: "https://oauth2.googleapis.com/token".to_string(),
        }
    }
}

/// Custom Search credentials for the web search tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub api_key: Option<String>,
    pub engine_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project root; not read from the file, set by [`Config::load`]
    #[serde(skip)]
    pub root: PathBuf,
    pub token_file: PathBuf,
    pub client_secret_candidates: Vec<PathBuf>,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub consent_timeout_secs: u64,
    pub tool_deadline_secs: Option<u64>,
    pub endpoints: Endpoints,
    pub search: SearchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            token_file: PathBuf::from("token.json"),
            client_secret_candidates: vec![
                PathBuf::from("credentials.json"),
                PathBuf::from("static").join("credentials.json"),
            ],
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            consent_timeout_secs: 120,
            tool_deadline_secs: None,
            endpoints: Endpoints::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// Root precedence: `root` argument, then `CEANGAL_ROOT`, then `~/.ceangal`.
    pub fn load(root: Option<PathBuf>) -> Result<Self, ConfigLoadError> {
        let root = match root.or_else(|| std::env::var_os(ROOT_ENV).map(PathBuf::from)) {
            Some(r) => r,
            None => ceangal_dir().map_err(ConfigLoadError::NoRoot)?,
        };

        let mut config = Self::load_file(&root)?;
        config.root = root;
        config.apply_env();

        info!("Configuration loaded (root: {:?})", config.root);
        Ok(config)
    }

    /// Defaults rooted at `root`, ignoring any file or environment.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    fn load_file(root: &Path) -> Result<Self, ConfigLoadError> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigLoadError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigLoadError::Parse { path, source })
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(SEARCH_KEY_ENV) {
            self.search.api_key = Some(key);
        }
        if let Ok(engine) = std::env::var(SEARCH_ENGINE_ENV) {
            self.search.engine_id = Some(engine);
        }
    }

    /// Absolute path of the persisted token file
    pub fn token_path(&self) -> PathBuf {
        resolve_path(&self.root, &self.token_file)
    }

    /// Client secret candidates in lookup order, resolved against the root
    pub fn client_secret_paths(&self) -> Vec<PathBuf> {
        self.client_secret_candidates
            .iter()
            .map(|p| resolve_path(&self.root, p))
            .collect()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn consent_timeout(&self) -> Duration {
        Duration::from_secs(self.consent_timeout_secs)
    }

    pub fn tool_deadline(&self) -> Option<Duration> {
        self.tool_deadline_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_resolve_against_root() {
        let config = Config::with_root("/var/lib/ceangal");
        assert_eq!(config.token_path(), PathBuf::from("/var/lib/ceangal/token.json"));
        assert_eq!(
            config.client_secret_paths(),
            vec![
                PathBuf::from("/var/lib/ceangal/credentials.json"),
                PathBuf::from("/var/lib/ceangal/static/credentials.json"),
            ]
        );
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"token_file": "auth/token.json", "endpoints": {"gmail": "http://127.0.0.1:9/gmail"}}"#,
        )
        .unwrap();

        let config = Config::load(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(config.token_path(), dir.path().join("auth/token.json"));
        assert_eq!(config.endpoints.gmail, "http://127.0.0.1:9/gmail");
        assert_eq!(config.endpoints.docs, Endpoints::default().docs);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();

        let err = Config::load(Some(dir.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Parse { .. }));
    }
}
