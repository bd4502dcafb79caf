//! Token File
//!
//! Plain JSON credential record at a fixed path under the project root.
//! Written after every authorization or refresh; never deleted implicitly.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::CredentialRecord;

pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted record.
    ///
    /// `Ok(None)` when no file exists; `Err` when it exists but cannot be
    /// read or parsed.
    pub fn load(&self) -> Result<Option<CredentialRecord>, String> {
        if !self.path.exists() {
            debug!("No token file at {:?}", self.path);
            return Ok(None);
        }

        let data = fs::read_to_string(&self.path)
            .map_err(|e| format!("Failed to read token file: {}", e))?;
        let record: CredentialRecord = serde_json::from_str(&data)
            .map_err(|e| format!("Failed to parse token file: {}", e))?;

        debug!("Loaded token from {:?}", self.path);
        Ok(Some(record))
    }

    /// Persist a record, creating the parent directory if needed.
    pub fn save(&self, record: &CredentialRecord) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create token directory: {}", e))?;
        }

        let json = serde_json::to_string_pretty(record)
            .map_err(|e| format!("Failed to serialize token: {}", e))?;
        write_private(&self.path, json.as_bytes())
            .map_err(|e| format!("Failed to write token file: {}", e))?;

        info!("Credentials saved to {:?}", self.path);
        Ok(())
    }

    /// Remove the persisted record, if any.
    pub fn remove(&self) -> Result<bool, String> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path).map_err(|e| format!("Failed to remove token file: {}", e))?;
        info!("Removed token file {:?}", self.path);
        Ok(true)
    }
}

/// Write `data` to a file only the owner can read. New files are created
/// 0600; an existing file is narrowed before any byte is written.
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    restrict_permissions(&file)?;
    file.write_all(data)?;
    file.sync_all()
}

#[cfg(unix)]
fn restrict_permissions(file: &File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &File) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let file = TokenFile::new(dir.path().join("token.json"));
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_garbage_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, "not a token").unwrap();
        assert!(TokenFile::new(path).load().is_err());
    }

    #[test]
    fn test_accepts_legacy_token_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(
            &path,
            r#"{
                "token": "ya29.legacy",
                "refresh_token": "1//0e.legacy",
                "token_uri": "https://oauth2.googleapis.com/token",
                "client_id": "123.apps.googleusercontent.com",
                "client_secret": "shh",
                "scopes": ["https://www.googleapis.com/auth/gmail.send"],
                "expiry": "2031-05-01T10:00:00.000000Z"
            }"#,
        )
        .unwrap();

        let record = TokenFile::new(path).load().unwrap().unwrap();
        assert_eq!(record.access_token, "ya29.legacy");
        assert!(record.is_refreshable());
        assert_eq!(record.scopes.len(), 1);
    }

    fn sample_record() -> CredentialRecord {
        CredentialRecord {
            access_token: "a".into(),
            refresh_token: "r".into(),
            token_type: "Bearer".into(),
            scopes: Default::default(),
            expiry: "2031-01-01T00:00:00Z".into(),
            client_id: String::new(),
            client_secret: String::new(),
            token_uri: String::new(),
        }
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let file = TokenFile::new(dir.path().join("nested/auth/token.json"));
        file.save(&sample_record()).unwrap();
        assert_eq!(file.load().unwrap().unwrap().access_token, "a");
    }

    #[cfg(unix)]
    #[test]
    fn test_token_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        TokenFile::new(&path).save(&sample_record()).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o600);

        // A pre-existing world-readable file is narrowed on overwrite
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        TokenFile::new(&path).save(&sample_record()).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o600);
    }
}
