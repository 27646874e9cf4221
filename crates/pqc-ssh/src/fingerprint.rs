// ABOUTME: SSH public key fingerprint computation.
// ABOUTME: Produces OpenSSH-style SHA256 fingerprints for audit logging.

use crate::error::Result;
use crate::key::load_public_key;
use ssh_key::{HashAlg, PublicKey};
use std::path::Path;

/// Compute the SHA256 fingerprint of a public key in OpenSSH notation.
///
/// # Returns
/// A string of the form `SHA256:<unpadded base64>`, identical to what
/// `ssh-keygen -lf` prints.
pub fn compute_fingerprint(public_key: &PublicKey) -> String {
    public_key.fingerprint(HashAlg::Sha256).to_string()
}

/// Load a public key file and fingerprint it.
///
/// # Errors
/// Returns an error if the file is unreadable or holds a key type `ssh-key`
/// does not know (hybrid PQC keys included).
pub fn fingerprint_file(path: &Path) -> Result<String> {
    let key = load_public_key(path)?;
    Ok(compute_fingerprint(&key))
}
