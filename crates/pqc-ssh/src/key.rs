// ABOUTME: SSH key path helpers and public key loading.
// ABOUTME: Derives .pub paths and prepares private directories with 0700 permissions.

use crate::error::{Result, SshError};
use ssh_key::PublicKey;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Path of the public half of a key pair: the private key path with `.pub` appended.
///
/// Unlike `Path::with_extension`, this never replaces an existing extension,
/// so `id_oqs` maps to `id_oqs.pub` and `host.key` maps to `host.key.pub`.
pub fn public_key_path(private_key_path: &Path) -> PathBuf {
    let mut name: OsString = private_key_path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".pub");
    private_key_path.with_file_name(name)
}

/// Load an OpenSSH public key (`<algorithm> <base64> [comment]`) from disk.
///
/// # Errors
/// Returns an error if the file cannot be read or its algorithm is unknown to `ssh-key`.
pub fn load_public_key(path: &Path) -> Result<PublicKey> {
    let data = std::fs::read_to_string(path).map_err(|e| SshError::ReadKey {
        path: path.to_path_buf(),
        source: e,
    })?;

    PublicKey::from_openssh(data.trim()).map_err(|e| SshError::ParseKey {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Create a directory (and parents) if missing, restricting it to the owner.
///
/// Returns `true` when the directory was created by this call. An existing
/// directory is left exactly as it is, permissions included.
///
/// # Errors
/// Returns an error if creation or the permission change fails.
pub fn ensure_private_dir(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    std::fs::create_dir_all(path).map_err(|e| SshError::CreateDirectory {
        path: path.to_path_buf(),
        source: e,
    })?;

    // Restrict to owner on Unix (0700 = rwx------)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700)).map_err(|e| {
            SshError::SetPermissions {
                path: path.to_path_buf(),
                source: e,
            }
        })?;
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssh_key::{Algorithm, LineEnding, PrivateKey};
    use tempfile::TempDir;

    #[test]
    fn test_public_key_path_appends_suffix() {
        assert_eq!(
            public_key_path(Path::new("/home/u/.ssh/id_oqs")),
            PathBuf::from("/home/u/.ssh/id_oqs.pub")
        );
        assert_eq!(
            public_key_path(Path::new("/etc/ssh/host.key")),
            PathBuf::from("/etc/ssh/host.key.pub")
        );
    }

    #[test]
    fn test_load_public_key_round_trip() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        let key = PrivateKey::random(&mut rand::thread_rng(), Algorithm::Ed25519)
            .expect("should generate key");
        let pub_path = temp_dir.path().join("id_ed25519.pub");
        let line = key.public_key().to_openssh().expect("should serialize");
        std::fs::write(&pub_path, format!("{line}\n")).expect("should write");

        let loaded = load_public_key(&pub_path).expect("should load key");
        assert_eq!(loaded.key_data(), key.public_key().key_data());

        // Private keys are not public keys
        let priv_path = temp_dir.path().join("id_ed25519");
        let priv_str = key.to_openssh(LineEnding::LF).expect("should serialize");
        std::fs::write(&priv_path, priv_str.as_bytes()).expect("should write");
        assert!(matches!(
            load_public_key(&priv_path),
            Err(SshError::ParseKey { .. })
        ));
    }

    #[test]
    fn test_load_public_key_missing_file() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        let result = load_public_key(&temp_dir.path().join("missing.pub"));
        assert!(matches!(result, Err(SshError::ReadKey { .. })));
    }

    #[test]
    fn test_ensure_private_dir_creates_once() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        let dir = temp_dir.path().join("nested").join("backup_keys");

        assert!(ensure_private_dir(&dir).expect("should create"));
        assert!(dir.is_dir());
        assert!(!ensure_private_dir(&dir).expect("should be idempotent"));
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_private_dir_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().expect("should create temp dir");
        let dir = temp_dir.path().join("private");
        ensure_private_dir(&dir).expect("should create");

        let mode = std::fs::metadata(&dir)
            .expect("should read metadata")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o700, "directory should have 0700 permissions");
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_private_dir_leaves_existing_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().expect("should create temp dir");
        let dir = temp_dir.path().join(".ssh");
        std::fs::create_dir(&dir).expect("should create dir");
        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o755))
            .expect("should set permissions");

        assert!(!ensure_private_dir(&dir).expect("existing dir is fine"));

        let mode = std::fs::metadata(&dir)
            .expect("should read metadata")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o755, "existing directory keeps its permissions");
    }
}
