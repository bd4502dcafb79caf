//! Path Utilities
//!
//! Resolution of the project root and files relative to it.

use std::path::{Path, PathBuf};

/// Get the default project root (`~/.ceangal/`)
pub fn ceangal_dir() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Could not determine home directory")?;
    Ok(home.join(".ceangal"))
}

/// Resolve `path` against `root` unless it is already absolute
pub fn resolve_path(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_paths_join_root() {
        let root = Path::new("/opt/agent");
        assert_eq!(
            resolve_path(root, Path::new("static/credentials.json")),
            PathBuf::from("/opt/agent/static/credentials.json")
        );
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let root = Path::new("/opt/agent");
        assert_eq!(
            resolve_path(root, Path::new("/etc/ceangal/credentials.json")),
            PathBuf::from("/etc/ceangal/credentials.json")
        );
    }
}
