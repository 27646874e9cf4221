// ABOUTME: Immutable migration configuration, loaded from TOML with defaults for every field.
// ABOUTME: Resolves ~-relative settings into the concrete paths each component works on.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Hybrid algorithm the migration moves to.
pub const DEFAULT_ALGORITHM: &str = "ecdsa-p256+kyber512";

/// Placeholder in remote command templates replaced by the algorithm identifier.
pub const ALGORITHM_PLACEHOLDER: &str = "{algorithm}";

/// Which SSH client implementation opens remote sessions.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Password sessions through russh, key-file sessions through the local OpenSSH client.
    #[default]
    Auto,
    /// Always use the pure-Rust russh client.
    Russh,
    /// Always drive the local `ssh` binary.
    Openssh,
}

/// How the local SSH client is asked whether it supports the algorithm.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CapabilityQuery {
    /// `ssh -Q key`, algorithm identifier searched in stdout.
    #[default]
    KeyTypes,
    /// `ssh -V`, banner marker searched in stderr.
    VersionBanner,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CapabilityConfig {
    pub query: CapabilityQuery,
    /// Substring that marks an OQS build in `ssh -V` output.
    pub banner_marker: String,
    pub ssh_binary: String,
    pub keygen_binary: String,
    /// Build and install OQS OpenSSH when the algorithm is missing.
    pub auto_install: bool,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            query: CapabilityQuery::default(),
            banner_marker: "OQS".to_string(),
            ssh_binary: "ssh".to_string(),
            keygen_binary: "ssh-keygen".to_string(),
            auto_install: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InstallConfig {
    /// Prefix package-manager and `make install` steps with `sudo`.
    pub use_sudo: bool,
    pub packages: Vec<String>,
    pub repository: String,
    /// Checkout directory, relative to the working directory unless absolute.
    pub source_dir: String,
    pub configure_args: Vec<String>,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            use_sudo: true,
            packages: ["build-essential", "libssl-dev", "zlib1g-dev", "git"]
                .into_iter()
                .map(String::from)
                .collect(),
            repository: "https://github.com/open-quantum-safe/openssh.git".to_string(),
            source_dir: "openssh".to_string(),
            configure_args: vec!["--with-ssl-dir=/usr/local/ssl".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RemoteConfig {
    /// Commands run on the client, in order. `{algorithm}` is substituted.
    pub commands: Vec<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            commands: vec![
                "sudo apt update".to_string(),
                "sudo apt install -y oqs-openssh-client".to_string(),
                format!("ssh-keygen -t {ALGORITHM_PLACEHOLDER} -f ~/.ssh/id_oqs -N ''"),
            ],
        }
    }
}

/// Everything a migration run needs to know, fixed before the run starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MigrationConfig {
    pub algorithm: String,
    /// Local SSH directory (`~` is expanded)
    pub ssh_dir: String,
    /// File name of the generated private key inside `ssh_dir`
    pub key_name: String,
    /// Identity files are the entries of `ssh_dir` starting with this prefix
    pub identity_prefix: String,
    /// Backup directory name inside `ssh_dir`
    pub backup_dir_name: String,
    pub authorized_keys_name: String,
    /// Known hosts file used for trust-on-first-use (`~` is expanded)
    pub known_hosts: String,
    /// Daemon configuration copied on backup and restored on rollback
    pub sshd_config: String,
    pub sshd_config_backup_name: String,
    /// Remote SSH port
    pub port: u16,
    pub transport: TransportKind,
    pub capability: CapabilityConfig,
    pub install: InstallConfig,
    pub remote: RemoteConfig,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            algorithm: DEFAULT_ALGORITHM.to_string(),
            ssh_dir: "~/.ssh".to_string(),
            key_name: "id_oqs".to_string(),
            identity_prefix: pqc_ssh::IDENTITY_PREFIX.to_string(),
            backup_dir_name: "backup_keys".to_string(),
            authorized_keys_name: "authorized_keys".to_string(),
            known_hosts: "~/.ssh/known_hosts".to_string(),
            sshd_config: "/etc/ssh/sshd_config".to_string(),
            sshd_config_backup_name: "sshd_config.backup".to_string(),
            port: 22,
            transport: TransportKind::default(),
            capability: CapabilityConfig::default(),
            install: InstallConfig::default(),
            remote: RemoteConfig::default(),
        }
    }
}

/// Concrete filesystem locations derived from a `MigrationConfig`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPaths {
    pub ssh_dir: PathBuf,
    pub key_path: PathBuf,
    pub public_key_path: PathBuf,
    pub authorized_keys: PathBuf,
    pub backup_dir: PathBuf,
    pub sshd_config: PathBuf,
    pub sshd_config_backup: PathBuf,
    pub known_hosts: PathBuf,
}

impl MigrationConfig {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: MigrationConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        Ok(config)
    }

    /// Save config to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory {}", parent.display())
            })?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    /// Get the default config file path (~/.config/pqc-migrate/config.toml)
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|_| {
                dirs::home_dir()
                    .map(|h| h.join(".config"))
                    .context("Could not determine home directory")
            })?
            .join("pqc-migrate");
        Ok(config_dir.join("config.toml"))
    }

    /// Load an explicit config file, or the default one if it exists, or built-in defaults.
    ///
    /// An explicit path that cannot be read is an error; a missing default file is not.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let path = Self::default_path()?;
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Remote command list with the algorithm identifier substituted.
    pub fn remote_commands(&self) -> Vec<String> {
        self.remote
            .commands
            .iter()
            .map(|c| c.replace(ALGORITHM_PLACEHOLDER, &self.algorithm))
            .collect()
    }

    /// Derive every concrete path, expanding `~`.
    pub fn paths(&self) -> MigrationPaths {
        let ssh_dir = expand(&self.ssh_dir);
        let key_path = ssh_dir.join(&self.key_name);
        let public_key_path = pqc_ssh::public_key_path(&key_path);
        let backup_dir = ssh_dir.join(&self.backup_dir_name);

        MigrationPaths {
            authorized_keys: ssh_dir.join(&self.authorized_keys_name),
            sshd_config_backup: backup_dir.join(&self.sshd_config_backup_name),
            sshd_config: expand(&self.sshd_config),
            known_hosts: expand(&self.known_hosts),
            ssh_dir,
            key_path,
            public_key_path,
            backup_dir,
        }
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_match_documented_layout() {
        let config = MigrationConfig::default();
        assert_eq!(config.algorithm, "ecdsa-p256+kyber512");
        assert_eq!(config.port, 22);
        assert_eq!(config.transport, TransportKind::Auto);
        assert_eq!(config.capability.query, CapabilityQuery::KeyTypes);
        assert!(config.capability.auto_install);
    }

    #[test]
    fn test_remote_commands_substitute_algorithm() {
        let config = MigrationConfig::default();
        assert_eq!(
            config.remote_commands(),
            vec![
                "sudo apt update".to_string(),
                "sudo apt install -y oqs-openssh-client".to_string(),
                "ssh-keygen -t ecdsa-p256+kyber512 -f ~/.ssh/id_oqs -N ''".to_string(),
            ]
        );
    }

    #[test]
    fn test_paths_derive_from_ssh_dir() {
        let config = MigrationConfig {
            ssh_dir: "/home/me/.ssh".to_string(),
            known_hosts: "/home/me/.ssh/known_hosts".to_string(),
            ..MigrationConfig::default()
        };
        let paths = config.paths();

        assert_eq!(paths.key_path, PathBuf::from("/home/me/.ssh/id_oqs"));
        assert_eq!(paths.public_key_path, PathBuf::from("/home/me/.ssh/id_oqs.pub"));
        assert_eq!(paths.authorized_keys, PathBuf::from("/home/me/.ssh/authorized_keys"));
        assert_eq!(paths.backup_dir, PathBuf::from("/home/me/.ssh/backup_keys"));
        assert_eq!(
            paths.sshd_config_backup,
            PathBuf::from("/home/me/.ssh/backup_keys/sshd_config.backup")
        );
        assert_eq!(paths.sshd_config, PathBuf::from("/etc/ssh/sshd_config"));
    }

    #[test]
    fn test_tilde_expansion() {
        let paths = MigrationConfig::default().paths();
        assert!(!paths.ssh_dir.to_string_lossy().contains('~'));

        let home = std::env::var("HOME").unwrap();
        assert!(paths.ssh_dir.starts_with(&home));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            algorithm = "ssh-mldsa65"
            port = 2222
            transport = "openssh"

            [capability]
            query = "version-banner"
            auto_install = false
        "#
        )
        .unwrap();

        let config = MigrationConfig::load(file.path()).unwrap();
        assert_eq!(config.algorithm, "ssh-mldsa65");
        assert_eq!(config.port, 2222);
        assert_eq!(config.transport, TransportKind::Openssh);
        assert_eq!(config.capability.query, CapabilityQuery::VersionBanner);
        assert!(!config.capability.auto_install);
        assert_eq!(config.capability.banner_marker, "OQS");
        assert_eq!(config.key_name, "id_oqs");
        assert_eq!(config.install, InstallConfig::default());
    }

    #[test]
    fn test_save_and_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = MigrationConfig {
            ssh_dir: "/srv/ssh".to_string(),
            remote: RemoteConfig {
                commands: vec!["true".to_string()],
            },
            ..MigrationConfig::default()
        };

        config.save(&path).unwrap();
        let loaded = MigrationConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_or_default_explicit_missing_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(MigrationConfig::load_or_default(Some(&missing)).is_err());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();
        let err = MigrationConfig::load(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config"));
    }
}
