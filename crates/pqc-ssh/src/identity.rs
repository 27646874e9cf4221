// ABOUTME: Discovery of identity key files in an SSH directory.
// ABOUTME: Matches the `id_*` naming convention used by ssh-keygen defaults.

use crate::error::{Result, SshError};
use std::path::{Path, PathBuf};

/// Conventional prefix of identity key files (`id_rsa`, `id_ed25519.pub`, ...).
pub const IDENTITY_PREFIX: &str = "id_";

/// List every entry in `dir` whose file name starts with `prefix`, sorted by name.
///
/// This is the shell glob `<dir>/<prefix>*`: hidden files are not special-cased
/// and directories that match are included. Names that are not valid UTF-8
/// never match.
///
/// # Errors
/// Returns an error if the directory cannot be read.
pub fn identity_entries(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let read_dir = std::fs::read_dir(dir).map_err(|e| SshError::ReadDirectory {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| SshError::ReadDirectory {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(prefix));
        if matches {
            entries.push(entry.path());
        }
    }

    entries.sort();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_matches_identity_files_only() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        for name in ["id_rsa", "id_rsa.pub", "id_ed25519", "authorized_keys", "config"] {
            std::fs::write(temp_dir.path().join(name), name).expect("should write");
        }
        std::fs::create_dir(temp_dir.path().join("backup_keys")).expect("should mkdir");

        let found = identity_entries(temp_dir.path(), IDENTITY_PREFIX).expect("should list");
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["id_ed25519", "id_rsa", "id_rsa.pub"]);
    }

    #[test]
    fn test_empty_directory() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        let found = identity_entries(temp_dir.path(), IDENTITY_PREFIX).expect("should list");
        assert!(found.is_empty());
    }

    #[test]
    fn test_missing_directory_is_error() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        let result = identity_entries(&temp_dir.path().join("nope"), IDENTITY_PREFIX);
        assert!(matches!(result, Err(SshError::ReadDirectory { .. })));
    }
}
