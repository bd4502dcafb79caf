//! Scope sets
//!
//! Append-only: scopes can be added or merged, never removed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub const GMAIL_SEND: &str = "https://www.googleapis.com/auth/gmail.send";
pub const GMAIL_READONLY: &str = "https://www.googleapis.com/auth/gmail.readonly";
pub const GMAIL_MODIFY: &str = "https://www.googleapis.com/auth/gmail.modify";
pub const DOCUMENTS: &str = "https://www.googleapis.com/auth/documents";
pub const DRIVE_FILE: &str = "https://www.googleapis.com/auth/drive.file";
pub const DRIVE_READONLY: &str = "https://www.googleapis.com/auth/drive.readonly";
pub const SPREADSHEETS: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Every scope any tool can require. Consent always asks for all of them,
/// so a single authorization serves the whole tool surface.
pub const ALL: [&str; 7] = [
    GMAIL_SEND,
    GMAIL_READONLY,
    GMAIL_MODIFY,
    DOCUMENTS,
    DRIVE_FILE,
    DRIVE_READONLY,
    SPREADSHEETS,
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeSet(BTreeSet<String>);

impl ScopeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, scope: impl Into<String>) {
        self.0.insert(scope.into());
    }

    pub fn extend(&mut self, other: &ScopeSet) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn union(&self, other: &ScopeSet) -> ScopeSet {
        let mut merged = self.clone();
        merged.extend(other);
        merged
    }

    /// True when every scope in `required` is present here.
    pub fn covers(&self, required: &ScopeSet) -> bool {
        required.0.is_subset(&self.0)
    }

    /// Scopes in `required` that are absent here
    pub fn missing<'a>(&self, required: &'a ScopeSet) -> Vec<&'a str> {
        required
            .0
            .iter()
            .filter(|s| !self.0.contains(*s))
            .map(String::as_str)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Space-separated form used by OAuth authorize URLs
    pub fn to_param(&self) -> String {
        self.iter().collect::<Vec<_>>().join(" ")
    }
}

impl<S: Into<String>> FromIterator<S> for ScopeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_param())
    }
}
