// ABOUTME: Trust-on-first-use host key store backed by an OpenSSH known_hosts file.
// ABOUTME: Unknown hosts are learned and appended; a changed key for a known host is refused.

use crate::error::{Result, SshError};
use crate::fingerprint::compute_fingerprint;
use crate::key::ensure_private_dir;
use ssh_key::PublicKey;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// How a presented host key relates to what the store has recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKeyStatus {
    /// An entry for this host holds exactly this key.
    Known,
    /// No entry for this host with this key type.
    Unknown,
    /// An entry for this host and key type holds a different key.
    Changed,
}

/// A known_hosts file used with a trust-on-first-use policy.
///
/// Only plain host patterns are matched. Hashed (`|1|...`) entries, wildcard
/// patterns and `@marker` lines are ignored, as are lines whose key type
/// `ssh-key` cannot parse.
#[derive(Debug, Clone)]
pub struct KnownHostsStore {
    path: PathBuf,
}

impl KnownHostsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The host field OpenSSH writes: `host` on port 22, `[host]:port` otherwise.
    pub fn host_pattern(host: &str, port: u16) -> String {
        if port == 22 {
            host.to_string()
        } else {
            format!("[{}]:{}", host, port)
        }
    }

    /// Compare a presented key against the store.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read.
    pub fn check(&self, host: &str, port: u16, key: &PublicKey) -> Result<HostKeyStatus> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(HostKeyStatus::Unknown)
            }
            Err(e) => {
                return Err(SshError::ReadFile {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        let pattern = Self::host_pattern(host, port);
        let mut status = HostKeyStatus::Unknown;

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('@') {
                continue;
            }
            let Some((hosts, rest)) = line.split_once(char::is_whitespace) else {
                continue;
            };
            if !hosts.split(',').any(|h| h == pattern) {
                continue;
            }
            let recorded = match PublicKey::from_openssh(rest.trim()) {
                Ok(recorded) => recorded,
                Err(e) => {
                    debug!(host = %pattern, error = %e, "Skipping unparseable known_hosts entry");
                    continue;
                }
            };

            if recorded.key_data() == key.key_data() {
                return Ok(HostKeyStatus::Known);
            }
            if recorded.algorithm() == key.algorithm() {
                status = HostKeyStatus::Changed;
            }
        }

        Ok(status)
    }

    /// Append an entry for `host` holding `key`.
    ///
    /// Creates the parent directory (0700) and the file if needed.
    ///
    /// # Errors
    /// Returns an error if the key cannot be serialized or the file cannot be written.
    pub fn learn(&self, host: &str, port: u16, key: &PublicKey) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                ensure_private_dir(parent)?;
            }
        }

        let key_str = key.to_openssh().map_err(SshError::SerializeKey)?;
        let mut line = format!("{} {}\n", Self::host_pattern(host, port), key_str);

        // Keep the new entry on its own line when the file lacks a trailing newline
        let needs_separator = std::fs::read(&self.path)
            .map(|existing| !existing.is_empty() && !existing.ends_with(b"\n"))
            .unwrap_or(false);
        if needs_separator {
            line.insert(0, '\n');
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| SshError::WriteFile {
                path: self.path.clone(),
                source: e,
            })?;
        file.write_all(line.as_bytes())
            .map_err(|e| SshError::WriteFile {
                path: self.path.clone(),
                source: e,
            })
    }

    /// Apply trust-on-first-use: accept known keys, learn unknown ones, refuse changed ones.
    ///
    /// A failure to persist a newly learned key is logged and the key is still
    /// accepted for this connection.
    pub fn verify_or_learn(&self, host: &str, port: u16, key: &PublicKey) -> bool {
        let fingerprint = compute_fingerprint(key);
        let status = match self.check(host, port, key) {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "Could not read known_hosts, treating host as unknown");
                HostKeyStatus::Unknown
            }
        };

        match status {
            HostKeyStatus::Known => {
                debug!(host = %host, %fingerprint, "Host key matches known_hosts");
                true
            }
            HostKeyStatus::Unknown => {
                info!(host = %host, %fingerprint, "Accepting new host key");
                if let Err(e) = self.learn(host, port, key) {
                    warn!(host = %host, error = %e, "Failed to record host key");
                }
                true
            }
            HostKeyStatus::Changed => {
                warn!(
                    host = %host,
                    %fingerprint,
                    known_hosts = %self.path.display(),
                    "Host key differs from the recorded key, refusing connection"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssh_key::{Algorithm, PrivateKey};
    use tempfile::TempDir;

    fn host_key() -> PublicKey {
        PrivateKey::random(&mut rand::thread_rng(), Algorithm::Ed25519)
            .expect("should generate ed25519 key")
            .public_key()
            .clone()
    }

    #[test]
    fn test_host_pattern() {
        assert_eq!(KnownHostsStore::host_pattern("10.0.0.5", 22), "10.0.0.5");
        assert_eq!(KnownHostsStore::host_pattern("10.0.0.5", 2222), "[10.0.0.5]:2222");
    }

    #[test]
    fn test_missing_file_is_unknown() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        let store = KnownHostsStore::new(temp_dir.path().join("known_hosts"));
        let status = store.check("client", 22, &host_key()).expect("should check");
        assert_eq!(status, HostKeyStatus::Unknown);
    }

    #[test]
    fn test_learn_then_known() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        let store = KnownHostsStore::new(temp_dir.path().join("ssh").join("known_hosts"));
        let key = host_key();

        store.learn("client", 22, &key).expect("should learn");

        assert_eq!(store.check("client", 22, &key).unwrap(), HostKeyStatus::Known);
        // Same host on another port is a different entry
        assert_eq!(store.check("client", 2222, &key).unwrap(), HostKeyStatus::Unknown);
    }

    #[test]
    fn test_changed_key_is_detected() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        let store = KnownHostsStore::new(temp_dir.path().join("known_hosts"));

        store.learn("client", 22, &host_key()).expect("should learn");

        let status = store.check("client", 22, &host_key()).expect("should check");
        assert_eq!(status, HostKeyStatus::Changed);
    }

    #[test]
    fn test_verify_or_learn_is_trust_on_first_use() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        let path = temp_dir.path().join("known_hosts");
        let store = KnownHostsStore::new(&path);
        let key = host_key();

        assert!(store.verify_or_learn("client", 22, &key), "first contact accepted");
        assert!(store.verify_or_learn("client", 22, &key), "same key accepted");
        assert!(!store.verify_or_learn("client", 22, &host_key()), "changed key refused");

        let contents = std::fs::read_to_string(&path).expect("should read");
        assert_eq!(contents.lines().count(), 1, "key persisted exactly once");
    }

    #[test]
    fn test_ignores_foreign_and_unparseable_lines() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        let path = temp_dir.path().join("known_hosts");
        std::fs::write(
            &path,
            "# comment\n\
             |1|c2FsdA==|aGFzaA== ssh-ed25519 AAAA\n\
             client ecdsa-p256+kyber512 AAAAnotparseable\n\
             @cert-authority * ssh-ed25519 AAAA\n\
             other-host,another ssh-ed25519 AAAA",
        )
        .expect("should write");
        let store = KnownHostsStore::new(&path);
        let key = host_key();

        assert_eq!(store.check("client", 22, &key).unwrap(), HostKeyStatus::Unknown);

        store.learn("client", 22, &key).expect("should learn");
        let contents = std::fs::read_to_string(&path).expect("should read");
        assert!(contents.lines().last().unwrap().starts_with("client ssh-ed25519 "));
        assert_eq!(store.check("client", 22, &key).unwrap(), HostKeyStatus::Known);
    }
}
