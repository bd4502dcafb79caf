//! Client Secret File
//!
//! The vendor-issued OAuth client JSON, needed only for interactive
//! authorization. Google wraps the fields in an `installed` (desktop) or
//! `web` section.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::common::ConfigurationError;

#[derive(Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub auth_uri: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecret")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ClientSecret {
    /// Use the first candidate that exists.
    pub fn locate(candidates: &[PathBuf]) -> Result<Self, ConfigurationError> {
        let path = candidates
            .iter()
            .find(|p| p.exists())
            .ok_or_else(|| ConfigurationError::ClientSecretNotFound {
                searched: candidates.to_vec(),
            })?;

        info!("Using client secret from {:?}", path);
        Self::from_file(path)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::ClientSecretInvalid {
            path: path.to_path_buf(),
            reason,
        };

        let data = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        Self::parse(&data).map_err(invalid)
    }

    fn parse(data: &str) -> Result<Self, String> {
        let file: ClientSecretFile =
            serde_json::from_str(data).map_err(|e| format!("invalid JSON: {}", e))?;
        let secret = file
            .installed
            .or(file.web)
            .ok_or("expected an \"installed\" or \"web\" section")?;

        if secret.client_id.is_empty() {
            return Err("client_id is empty".to_string());
        }
        Ok(secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESKTOP: &str = r#"{
        "installed": {
            "client_id": "214.apps.googleusercontent.com",
            "project_id": "agent",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_secret": "GOCSPX-test",
            "redirect_uris": ["http://localhost"]
        }
    }"#;

    #[test]
    fn test_parse_installed_section() {
        let secret = ClientSecret::parse(DESKTOP).unwrap();
        assert_eq!(secret.client_id, "214.apps.googleusercontent.com");
        assert_eq!(secret.token_uri.as_deref(), Some("https://oauth2.googleapis.com/token"));
    }

    #[test]
    fn test_parse_rejects_unknown_shape() {
        assert!(ClientSecret::parse(r#"{"client_id": "x"}"#).is_err());
    }

    #[test]
    fn test_locate_checks_candidates_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("credentials.json");
        let second = dir.path().join("static").join("credentials.json");
        std::fs::create_dir_all(second.parent().unwrap()).unwrap();
        std::fs::write(&second, DESKTOP).unwrap();

        let secret = ClientSecret::locate(&[first, second]).unwrap();
        assert_eq!(secret.client_secret, "GOCSPX-test");
    }

    #[test]
    fn test_locate_fails_when_nothing_exists() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientSecret::locate(&[dir.path().join("credentials.json")]).unwrap_err();
        assert!(matches!(err, ConfigurationError::ClientSecretNotFound { .. }));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let secret = ClientSecret::parse(DESKTOP).unwrap();
        assert!(!format!("{:?}", secret).contains("GOCSPX-test"));
    }
}
