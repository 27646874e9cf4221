// ABOUTME: Append-only writer for the authorized_keys store.
// ABOUTME: Copies a public key file verbatim onto the end of authorized_keys.

use crate::error::{Result, SshError};
use std::io::Write;
use std::path::Path;

/// Result of an append attempt that did not hit an I/O error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The public key file was appended; `bytes` is how much was written.
    Appended { bytes: usize },
    /// The public key file does not exist; authorized_keys was not touched.
    MissingPublicKey,
}

/// Append the full contents of `public_key_path` to `authorized_keys_path`.
///
/// The bytes are written exactly as read: no trimming, no newline fix-up, and
/// no check for an existing identical entry. Appending the same key twice
/// yields two entries. The store is created if it does not exist.
///
/// # Errors
/// Returns an error if the public key cannot be read or the store cannot be
/// opened or written.
pub fn append_public_key(
    public_key_path: &Path,
    authorized_keys_path: &Path,
) -> Result<AppendOutcome> {
    if !public_key_path.exists() {
        return Ok(AppendOutcome::MissingPublicKey);
    }

    let entry = std::fs::read(public_key_path).map_err(|e| SshError::ReadKey {
        path: public_key_path.to_path_buf(),
        source: e,
    })?;

    let mut store = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(authorized_keys_path)
        .map_err(|e| SshError::WriteFile {
            path: authorized_keys_path.to_path_buf(),
            source: e,
        })?;

    store.write_all(&entry).map_err(|e| SshError::WriteFile {
        path: authorized_keys_path.to_path_buf(),
        source: e,
    })?;

    Ok(AppendOutcome::Appended { bytes: entry.len() })
}
