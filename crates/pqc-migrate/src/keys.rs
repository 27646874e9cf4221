// ABOUTME: Generates the local PQC key pair with ssh-keygen and authorizes its public half.
// ABOUTME: Generation failures are fatal; authorization failures are reported as false.

use crate::config::MigrationPaths;
use crate::error::KeyError;
use crate::process::{CommandRunner, CommandSpec};
use pqc_ssh::{append_public_key, ensure_private_dir, AppendOutcome};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

pub struct KeyMaterialManager {
    runner: Arc<dyn CommandRunner>,
    keygen_binary: String,
    algorithm: String,
    ssh_dir: PathBuf,
    key_path: PathBuf,
    public_key_path: PathBuf,
    authorized_keys: PathBuf,
}

impl KeyMaterialManager {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        keygen_binary: impl Into<String>,
        algorithm: impl Into<String>,
        paths: &MigrationPaths,
    ) -> Self {
        Self {
            runner,
            keygen_binary: keygen_binary.into(),
            algorithm: algorithm.into(),
            ssh_dir: paths.ssh_dir.clone(),
            key_path: paths.key_path.clone(),
            public_key_path: paths.public_key_path.clone(),
            authorized_keys: paths.authorized_keys.clone(),
        }
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    /// Run `ssh-keygen -t <algorithm> -f <key> -N ''` with no passphrase.
    ///
    /// ssh-keygen refuses to overwrite an existing key when stdin is closed,
    /// so a second generation at the same path fails.
    ///
    /// # Errors
    /// Returns an error if the SSH directory cannot be prepared, ssh-keygen
    /// cannot be started, or it exits non-zero.
    pub async fn generate_key_pair(&self) -> Result<(), KeyError> {
        if ensure_private_dir(&self.ssh_dir)? {
            info!(path = %self.ssh_dir.display(), "Created SSH directory");
        }

        info!(algorithm = %self.algorithm, "Generating new SSH key");
        let spec = CommandSpec::new(&self.keygen_binary)
            .args(["-t", self.algorithm.as_str(), "-f"])
            .arg(self.key_path.to_string_lossy())
            .args(["-N", ""]);

        let output = self
            .runner
            .run(&spec)
            .await
            .map_err(|e| KeyError::Generate {
                path: self.key_path.clone(),
                reason: e.to_string(),
            })?;

        if !output.success() {
            let detail = output.stderr.trim();
            let reason = if detail.is_empty() {
                output.describe_exit()
            } else {
                format!("{}: {}", output.describe_exit(), detail)
            };
            return Err(KeyError::Generate {
                path: self.key_path.clone(),
                reason,
            });
        }

        info!(path = %self.key_path.display(), "New SSH key generated");
        Ok(())
    }

    /// Append the generated public key to authorized_keys, verbatim.
    ///
    /// Returns false (without touching authorized_keys) when the public key
    /// file is missing, and false on any I/O error.
    pub fn append_public_key_to_authorized_keys(&self) -> bool {
        match append_public_key(&self.public_key_path, &self.authorized_keys) {
            Ok(AppendOutcome::Appended { bytes }) => {
                info!(path = %self.authorized_keys.display(), bytes, "Added new key to authorized_keys");
                true
            }
            Ok(AppendOutcome::MissingPublicKey) => {
                error!(path = %self.public_key_path.display(), "Public key file not found");
                false
            }
            Err(e) => {
                error!(error = %e, "Failed to update authorized_keys");
                false
            }
        }
    }
}
