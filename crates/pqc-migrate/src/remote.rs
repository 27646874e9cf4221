// ABOUTME: Remote session abstraction and the remote command executor.
// ABOUTME: RemoteTransport opens sessions; run_remote_commands stops at the first stderr output.

use crate::error::TransportError;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// The remote account a session authenticates as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub host: String,
    pub port: u16,
    pub user: String,
}

impl RemoteTarget {
    pub fn new(host: impl Into<String>, port: u16, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
        }
    }
}

impl fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.port == 22 {
            write!(f, "{}@{}", self.user, self.host)
        } else {
            write!(f, "{}@{}:{}", self.user, self.host, self.port)
        }
    }
}

/// How a session authenticates. Exactly one form is used per session.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Password(String),
    KeyFile(PathBuf),
}

impl Credential {
    /// Pick the credential to use when both forms may be available.
    /// A key file takes precedence over a password.
    pub fn preferred(password: Option<String>, key_file: Option<PathBuf>) -> Option<Self> {
        key_file
            .map(Credential::KeyFile)
            .or_else(|| password.map(Credential::Password))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Credential::Password(_) => "password",
            Credential::KeyFile(_) => "key-file",
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Password(_) => f.write_str("Password(<redacted>)"),
            Credential::KeyFile(path) => f.debug_tuple("KeyFile").field(path).finish(),
        }
    }
}

/// Output of one remote command, streams kept separate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit status if the server reported one.
    pub exit_status: Option<u32>,
}

/// An authenticated connection to one host.
#[async_trait]
pub trait RemoteSession: Send {
    /// Run a shell command and collect its output. Blocks until the command finishes.
    async fn exec(&mut self, command: &str) -> Result<RemoteOutput, TransportError>;

    /// Tear the connection down.
    async fn close(self: Box<Self>) -> Result<(), TransportError>;
}

/// An SSH client implementation able to open sessions.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Unique name for this transport
    fn name(&self) -> &'static str;

    /// Connect and authenticate. Unknown host keys are trusted on first use.
    async fn open(
        &self,
        target: &RemoteTarget,
        credential: &Credential,
    ) -> Result<Box<dyn RemoteSession>, TransportError>;
}

/// Run `commands` in order over one session, stopping at the first failure.
///
/// A command fails when its stderr is non-empty, whatever its exit status.
/// Commands after a failure are not run, and commands already run are not
/// undone. Returns true only if every command produced empty stderr.
pub async fn run_remote_commands(
    transport: &dyn RemoteTransport,
    target: &RemoteTarget,
    credential: &Credential,
    commands: &[String],
) -> bool {
    let mut session = match transport.open(target, credential).await {
        Ok(session) => session,
        Err(e) => {
            error!(target = %target, error = %e, "Failed to connect");
            return false;
        }
    };

    let mut all_ok = true;
    for command in commands {
        info!(target = %target, command = %command, "Running remote command");
        match session.exec(command).await {
            Ok(output) if output.stderr.is_empty() => {
                debug!(
                    command = %command,
                    exit_status = ?output.exit_status,
                    stdout = %output.stdout.trim_end(),
                    "Remote command succeeded"
                );
            }
            Ok(output) => {
                error!(
                    target = %target,
                    command = %command,
                    exit_status = ?output.exit_status,
                    stderr = %output.stderr.trim_end(),
                    "Command failed on client"
                );
                all_ok = false;
                break;
            }
            Err(e) => {
                error!(target = %target, command = %command, error = %e, "Command failed on client");
                all_ok = false;
                break;
            }
        }
    }

    if let Err(e) = session.close().await {
        warn!(target = %target, error = %e, "Failed to close remote session");
    }
    all_ok
}
