//! Common Error Types
//!
//! `ConfigurationError` is the one failure allowed to cross the tool
//! boundary: without a client secret no tool can ever obtain credentials.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("No client secret file found in any of the expected locations: {}", join_paths(.searched))]
    ClientSecretNotFound { searched: Vec<PathBuf> },

    #[error("Client secret file {path:?} is unusable: {reason}")]
    ClientSecretInvalid { path: PathBuf, reason: String },
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
