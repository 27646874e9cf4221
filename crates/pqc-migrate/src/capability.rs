// ABOUTME: Detects whether the local SSH client supports the target PQC algorithm.
// ABOUTME: Builds and installs OQS OpenSSH from source when it does not.

use crate::config::{CapabilityConfig, CapabilityQuery, InstallConfig};
use crate::error::{CapabilityError, ProcessError};
use crate::process::{CommandRunner, CommandSpec};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Result of asking the local SSH client about the algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityStatus {
    Supported,
    AlgorithmMissing,
    /// The SSH client program itself could not be found.
    ToolingMissing,
}

pub struct CapabilityChecker {
    runner: Arc<dyn CommandRunner>,
    algorithm: String,
    capability: CapabilityConfig,
    install: InstallConfig,
}

impl CapabilityChecker {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        algorithm: impl Into<String>,
        capability: CapabilityConfig,
        install: InstallConfig,
    ) -> Self {
        Self {
            runner,
            algorithm: algorithm.into(),
            capability,
            install,
        }
    }

    /// Query the local SSH client once. No retries.
    pub async fn query(&self) -> CapabilityStatus {
        let (spec, needle) = match self.capability.query {
            CapabilityQuery::KeyTypes => (
                CommandSpec::new(&self.capability.ssh_binary).args(["-Q", "key"]),
                self.algorithm.as_str(),
            ),
            CapabilityQuery::VersionBanner => (
                CommandSpec::new(&self.capability.ssh_binary).arg("-V"),
                self.capability.banner_marker.as_str(),
            ),
        };

        let output = match self.runner.run(&spec).await {
            Ok(output) => output,
            Err(ProcessError::NotFound { program }) => {
                error!(program = %program, "SSH is not installed on this system");
                return CapabilityStatus::ToolingMissing;
            }
            Err(e) => {
                error!(error = %e, "Failed to query SSH capabilities");
                return CapabilityStatus::AlgorithmMissing;
            }
        };

        // `ssh -Q` lists on stdout, `ssh -V` prints its banner on stderr
        let haystack = match self.capability.query {
            CapabilityQuery::KeyTypes => &output.stdout,
            CapabilityQuery::VersionBanner => &output.stderr,
        };

        if haystack.contains(needle) {
            info!(algorithm = %self.algorithm, "OQS-enabled OpenSSH is installed");
            CapabilityStatus::Supported
        } else {
            info!(algorithm = %self.algorithm, "OQS-enabled OpenSSH is not installed");
            CapabilityStatus::AlgorithmMissing
        }
    }

    /// True iff the local SSH client reports the algorithm.
    pub async fn probe_capability(&self) -> bool {
        self.query().await == CapabilityStatus::Supported
    }

    /// Make sure the algorithm is available, installing OQS OpenSSH if allowed.
    ///
    /// # Errors
    /// Every error is fatal to a migration run: missing SSH tooling, a
    /// disabled installer, or any installation step exiting non-zero.
    pub async fn ensure_capability(&self) -> Result<(), CapabilityError> {
        match self.query().await {
            CapabilityStatus::Supported => Ok(()),
            CapabilityStatus::ToolingMissing => Err(CapabilityError::ToolingMissing {
                binary: self.capability.ssh_binary.clone(),
            }),
            CapabilityStatus::AlgorithmMissing if !self.capability.auto_install => {
                Err(CapabilityError::NotInstalled)
            }
            CapabilityStatus::AlgorithmMissing => {
                info!("OQS-enabled OpenSSH not found, installing");
                self.install().await
            }
        }
    }

    /// Update packages, fetch the OQS OpenSSH sources, then configure, build and install.
    async fn install(&self) -> Result<(), CapabilityError> {
        info!(repository = %self.install.repository, "Installing OQS-enabled OpenSSH");

        self.run_step(self.privileged("apt").arg("update")).await?;
        self.run_step(
            self.privileged("apt")
                .args(["install", "-y"])
                .args(self.install.packages.iter().cloned()),
        )
        .await?;

        let source_dir = PathBuf::from(&self.install.source_dir);
        if source_dir.exists() {
            info!(path = %source_dir.display(), "Reusing existing OQS OpenSSH checkout");
        } else {
            self.run_step(
                CommandSpec::new("git")
                    .args(["clone", self.install.repository.as_str()])
                    .arg(self.install.source_dir.as_str()),
            )
            .await?;
        }

        self.run_step(
            CommandSpec::new("./configure")
                .args(self.install.configure_args.iter().cloned())
                .current_dir(&source_dir),
        )
        .await?;
        self.run_step(CommandSpec::new("make").current_dir(&source_dir))
            .await?;
        self.run_step(
            self.privileged("make")
                .arg("install")
                .current_dir(&source_dir),
        )
        .await?;

        info!("OQS-enabled OpenSSH installed successfully");
        Ok(())
    }

    /// A command that needs root, prefixed with sudo when configured.
    fn privileged(&self, program: &str) -> CommandSpec {
        if self.install.use_sudo {
            CommandSpec::new("sudo").arg(program)
        } else {
            CommandSpec::new(program)
        }
    }

    async fn run_step(&self, spec: CommandSpec) -> Result<(), CapabilityError> {
        let spec = spec.inherit_output();
        info!(step = %spec, "Running installation step");

        let output = self
            .runner
            .run(&spec)
            .await
            .map_err(|e| CapabilityError::InstallStep {
                step: spec.to_string(),
                reason: e.to_string(),
            })?;

        if output.success() {
            Ok(())
        } else {
            Err(CapabilityError::InstallStep {
                step: spec.to_string(),
                reason: output.describe_exit(),
            })
        }
    }
}
