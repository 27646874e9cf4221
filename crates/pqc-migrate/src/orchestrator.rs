// ABOUTME: The seven-step migration state machine and its terminal outcomes.
// ABOUTME: Each step reports success, failure or fatal; the loop dispatches only on that.

use crate::backup::{BackupManager, BackupReport, RestoreReport};
use crate::capability::CapabilityChecker;
use crate::config::MigrationConfig;
use crate::keys::KeyMaterialManager;
use crate::probe::probe;
use crate::process::CommandRunner;
use crate::prompt::ClientCredentials;
use crate::remote::{run_remote_commands, Credential, RemoteTarget, RemoteTransport};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Steps of a migration, in the only order they can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationState {
    CheckCapability,
    ProbeClientPassword,
    UpdateClient,
    BackupLocal,
    GenerateLocalKey,
    AppendAuthorizedKey,
    VerifyNewKey,
}

impl MigrationState {
    pub const ALL: [MigrationState; 7] = [
        MigrationState::CheckCapability,
        MigrationState::ProbeClientPassword,
        MigrationState::UpdateClient,
        MigrationState::BackupLocal,
        MigrationState::GenerateLocalKey,
        MigrationState::AppendAuthorizedKey,
        MigrationState::VerifyNewKey,
    ];

    /// The step after this one, `None` after VerifyNewKey.
    pub fn next(self) -> Option<Self> {
        let index = Self::ALL.iter().position(|s| *s == self)?;
        Self::ALL.get(index + 1).copied()
    }

    pub fn description(self) -> &'static str {
        match self {
            MigrationState::CheckCapability => "check local PQC support",
            MigrationState::ProbeClientPassword => "connect to client with password",
            MigrationState::UpdateClient => "update client SSH",
            MigrationState::BackupLocal => "back up local keys and configuration",
            MigrationState::GenerateLocalKey => "generate PQC key pair",
            MigrationState::AppendAuthorizedKey => "authorize new public key",
            MigrationState::VerifyNewKey => "connect to client with new key",
        }
    }
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a single step reports back to the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    /// Ends the run (or triggers rollback at VerifyNewKey).
    Failure(String),
    /// Ends the run with a non-zero exit.
    Fatal(String),
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    Complete,
    /// Verification with the new key failed and the backup was put back.
    RollbackAttempted {
        reason: String,
        restore: RestoreReport,
    },
    Aborted {
        state: MigrationState,
        reason: String,
    },
    Fatal {
        state: MigrationState,
        reason: String,
    },
}

impl MigrationOutcome {
    /// Process exit code for this outcome: 1 for fatal, 0 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            MigrationOutcome::Fatal { .. } => 1,
            _ => 0,
        }
    }
}

/// The terminal outcome plus the steps entered on the way.
#[derive(Debug, Clone)]
pub struct MigrationReport {
    pub outcome: MigrationOutcome,
    pub visited: Vec<MigrationState>,
    /// Present once BackupLocal has run.
    pub backup: Option<BackupReport>,
}

pub struct Orchestrator {
    config: MigrationConfig,
    runner: Arc<dyn CommandRunner>,
    transport: Arc<dyn RemoteTransport>,
}

impl Orchestrator {
    pub fn new(
        config: MigrationConfig,
        runner: Arc<dyn CommandRunner>,
        transport: Arc<dyn RemoteTransport>,
    ) -> Self {
        Self {
            config,
            runner,
            transport,
        }
    }

    /// Run every step in order against the client in `credentials`.
    ///
    /// Never returns an error; every way a run can end is a `MigrationOutcome`.
    pub async fn run(&self, credentials: &ClientCredentials) -> MigrationReport {
        let mut run = Run::new(self, credentials);
        let mut visited = Vec::new();
        let mut state = MigrationState::CheckCapability;

        let outcome = loop {
            visited.push(state);
            info!(step = %state, "Starting: {}", state.description());

            match run.execute(state).await {
                StepOutcome::Success => match state.next() {
                    Some(next) => state = next,
                    None => {
                        info!("Migration complete");
                        break MigrationOutcome::Complete;
                    }
                },
                StepOutcome::Failure(reason) if state == MigrationState::VerifyNewKey => {
                    warn!(reason = %reason, "New key verification failed, restoring backup");
                    let restore = run.backup.restore();
                    break MigrationOutcome::RollbackAttempted { reason, restore };
                }
                StepOutcome::Failure(reason) => {
                    error!(step = %state, reason = %reason, "Migration aborted");
                    break MigrationOutcome::Aborted { state, reason };
                }
                StepOutcome::Fatal(reason) => {
                    error!(step = %state, reason = %reason, "Migration failed");
                    break MigrationOutcome::Fatal { state, reason };
                }
            }
        };

        MigrationReport {
            outcome,
            visited,
            backup: run.backup_report,
        }
    }
}

/// Components wired for a single run.
struct Run<'a> {
    transport: &'a dyn RemoteTransport,
    target: RemoteTarget,
    password: Credential,
    remote_commands: Vec<String>,
    capability: CapabilityChecker,
    backup: BackupManager,
    keys: KeyMaterialManager,
    backup_report: Option<BackupReport>,
}

impl<'a> Run<'a> {
    fn new(orchestrator: &'a Orchestrator, credentials: &ClientCredentials) -> Self {
        let config = &orchestrator.config;
        let paths = config.paths();
        Self {
            transport: orchestrator.transport.as_ref(),
            target: RemoteTarget::new(&credentials.host, config.port, &credentials.user),
            password: Credential::Password(credentials.password.clone()),
            remote_commands: config.remote_commands(),
            capability: CapabilityChecker::new(
                orchestrator.runner.clone(),
                config.algorithm.clone(),
                config.capability.clone(),
                config.install.clone(),
            ),
            backup: BackupManager::new(&paths, config.identity_prefix.clone()),
            keys: KeyMaterialManager::new(
                orchestrator.runner.clone(),
                config.capability.keygen_binary.clone(),
                config.algorithm.clone(),
                &paths,
            ),
            backup_report: None,
        }
    }

    async fn execute(&mut self, state: MigrationState) -> StepOutcome {
        match state {
            MigrationState::CheckCapability => match self.capability.ensure_capability().await {
                Ok(()) => StepOutcome::Success,
                Err(e) => StepOutcome::Fatal(e.to_string()),
            },
            MigrationState::ProbeClientPassword => {
                if probe(self.transport, &self.target, &self.password).await {
                    StepOutcome::Success
                } else {
                    StepOutcome::Failure(format!("could not connect to {}", self.target))
                }
            }
            MigrationState::UpdateClient => {
                let ok = run_remote_commands(
                    self.transport,
                    &self.target,
                    &self.password,
                    &self.remote_commands,
                )
                .await;
                if ok {
                    StepOutcome::Success
                } else {
                    StepOutcome::Failure(format!("failed to update SSH on {}", self.target))
                }
            }
            MigrationState::BackupLocal => {
                self.backup_report = Some(self.backup.backup_existing_state());
                StepOutcome::Success
            }
            MigrationState::GenerateLocalKey => match self.keys.generate_key_pair().await {
                Ok(()) => StepOutcome::Success,
                Err(e) => StepOutcome::Fatal(e.to_string()),
            },
            MigrationState::AppendAuthorizedKey => {
                if self.keys.append_public_key_to_authorized_keys() {
                    StepOutcome::Success
                } else {
                    StepOutcome::Failure("failed to add new key to authorized_keys".to_string())
                }
            }
            MigrationState::VerifyNewKey => {
                let credential = Credential::KeyFile(self.keys.key_path().to_path_buf());
                if probe(self.transport, &self.target, &credential).await {
                    StepOutcome::Success
                } else {
                    StepOutcome::Failure(format!(
                        "could not connect to {} with the new key",
                        self.target
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states_advance_in_order() {
        let mut state = MigrationState::CheckCapability;
        let mut seen = vec![state];
        while let Some(next) = state.next() {
            seen.push(next);
            state = next;
        }
        assert_eq!(seen, MigrationState::ALL.to_vec());
        assert_eq!(MigrationState::VerifyNewKey.next(), None);
    }

    #[test]
    fn test_only_fatal_exits_non_zero() {
        assert_eq!(MigrationOutcome::Complete.exit_code(), 0);
        assert_eq!(
            MigrationOutcome::Aborted {
                state: MigrationState::UpdateClient,
                reason: "x".to_string()
            }
            .exit_code(),
            0
        );
        assert_eq!(
            MigrationOutcome::RollbackAttempted {
                reason: "x".to_string(),
                restore: RestoreReport::default()
            }
            .exit_code(),
            0
        );
        assert_eq!(
            MigrationOutcome::Fatal {
                state: MigrationState::GenerateLocalKey,
                reason: "x".to_string()
            }
            .exit_code(),
            1
        );
    }

    #[test]
    fn test_state_display_is_name() {
        assert_eq!(MigrationState::VerifyNewKey.to_string(), "VerifyNewKey");
    }
}
