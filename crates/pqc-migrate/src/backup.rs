// ABOUTME: Moves identity keys and copies the sshd configuration into a backup area.
// ABOUTME: Also performs the best-effort rollback that puts them back.

use crate::config::MigrationPaths;
use pqc_ssh::{ensure_private_dir, fingerprint_file, identity_entries};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// What `backup_existing_state` managed to do before finishing or failing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BackupReport {
    /// Entries now in the backup directory (destination paths).
    pub moved: Vec<PathBuf>,
    pub config_copied: bool,
    /// The error that stopped the backup early, if any.
    pub error: Option<String>,
}

impl BackupReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// What the rollback attempted. Nothing here is verified afterwards.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub config_restored: bool,
    /// Entries moved back into the SSH directory (destination paths).
    pub restored: Vec<PathBuf>,
    /// Backup entries left in place because the destination already existed.
    pub skipped: Vec<PathBuf>,
    pub errors: Vec<String>,
}

pub struct BackupManager {
    ssh_dir: PathBuf,
    backup_dir: PathBuf,
    identity_prefix: String,
    sshd_config: PathBuf,
    sshd_config_backup: PathBuf,
}

impl BackupManager {
    pub fn new(paths: &MigrationPaths, identity_prefix: impl Into<String>) -> Self {
        Self {
            ssh_dir: paths.ssh_dir.clone(),
            backup_dir: paths.backup_dir.clone(),
            identity_prefix: identity_prefix.into(),
            sshd_config: paths.sshd_config.clone(),
            sshd_config_backup: paths.sshd_config_backup.clone(),
        }
    }

    /// Move identity keys out of the SSH directory and copy the daemon config.
    ///
    /// Never fails: the first error is logged, stops the remaining sub-steps,
    /// and is recorded in the report. The caller carries on regardless.
    pub fn backup_existing_state(&self) -> BackupReport {
        let mut report = BackupReport::default();
        if let Err(e) = self.try_backup(&mut report) {
            error!(error = %e, "Failed to back up SSH keys/configuration");
            report.error = Some(e.to_string());
        }
        report
    }

    fn try_backup(&self, report: &mut BackupReport) -> anyhow::Result<()> {
        if ensure_private_dir(&self.backup_dir)? {
            info!(path = %self.backup_dir.display(), "Created backup directory");
        }

        info!("Backing up old SSH keys");
        for source in identity_entries(&self.ssh_dir, &self.identity_prefix)? {
            let Some(name) = source.file_name() else {
                continue;
            };
            log_fingerprint(&source);
            let dest = self.backup_dir.join(name);
            move_entry(&source, &dest)?;
            info!(from = %source.display(), to = %self.backup_dir.display(), "Backed up key file");
            report.moved.push(dest);
        }

        if self.sshd_config.exists() {
            std::fs::copy(&self.sshd_config, &self.sshd_config_backup)?;
            info!(path = %self.sshd_config.display(), "Backed up SSHD configuration");
            report.config_copied = true;
        } else {
            debug!(path = %self.sshd_config.display(), "No SSHD configuration to back up");
        }

        Ok(())
    }

    /// Put the backed-up state back: copy the config, move the keys.
    ///
    /// The config backup stays in the backup directory; the keys leave it.
    /// An entry whose destination already exists is skipped so that keys
    /// generated during this run are never overwritten. Each sub-step runs
    /// even if the previous one failed.
    pub fn restore(&self) -> RestoreReport {
        let mut report = RestoreReport::default();

        match std::fs::copy(&self.sshd_config_backup, &self.sshd_config) {
            Ok(_) => {
                info!(path = %self.sshd_config.display(), "Restored SSHD configuration");
                report.config_restored = true;
            }
            Err(e) => {
                error!(
                    from = %self.sshd_config_backup.display(),
                    error = %e,
                    "Failed to restore SSHD configuration"
                );
                report.errors.push(format!(
                    "restore {}: {}",
                    self.sshd_config.display(),
                    e
                ));
            }
        }

        let entries = match identity_entries(&self.backup_dir, &self.identity_prefix) {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, "Failed to list backed-up keys");
                report.errors.push(e.to_string());
                return report;
            }
        };

        for source in entries {
            let Some(name) = source.file_name() else {
                continue;
            };
            let dest = self.ssh_dir.join(name);
            if dest.exists() {
                warn!(path = %dest.display(), "Key file already present, leaving backup in place");
                report.skipped.push(source);
                continue;
            }
            match move_entry(&source, &dest) {
                Ok(()) => {
                    info!(path = %dest.display(), "Restored key file");
                    report.restored.push(dest);
                }
                Err(e) => {
                    error!(path = %source.display(), error = %e, "Failed to restore key file");
                    report.errors.push(format!("restore {}: {}", dest.display(), e));
                }
            }
        }

        report
    }
}

fn log_fingerprint(path: &Path) {
    let is_public = path.extension().is_some_and(|ext| ext == "pub");
    if !is_public {
        return;
    }
    match fingerprint_file(path) {
        Ok(fingerprint) => info!(path = %path.display(), %fingerprint, "Backing up public key"),
        Err(e) => debug!(path = %path.display(), error = %e, "Could not fingerprint public key"),
    }
}

/// Rename, falling back to copy-and-delete when the rename crosses filesystems.
fn move_entry(source: &Path, dest: &Path) -> io::Result<()> {
    match std::fs::rename(source, dest) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if source.is_dir() {
                return Err(rename_err);
            }
            debug!(error = %rename_err, "Rename failed, copying instead");
            std::fs::copy(source, dest)?;
            std::fs::remove_file(source)
        }
    }
}
