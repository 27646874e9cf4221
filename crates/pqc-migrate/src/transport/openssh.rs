// ABOUTME: SSH transport that drives the local OpenSSH client through a control master.
// ABOUTME: Works with OQS hybrid keys; passwords are fed through `sshpass -e`.

use crate::error::{ProcessError, TransportError};
use crate::process::{CommandRunner, CommandSpec};
use crate::remote::{Credential, RemoteOutput, RemoteSession, RemoteTarget, RemoteTransport};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

const SSHPASS: &str = "sshpass";
const CHECK_INTERVAL: Duration = Duration::from_millis(100);

pub struct OpenSshTransport {
    runner: Arc<dyn CommandRunner>,
    ssh_binary: String,
    known_hosts: PathBuf,
}

impl OpenSshTransport {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        ssh_binary: impl Into<String>,
        known_hosts: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            ssh_binary: ssh_binary.into(),
            known_hosts: known_hosts.into(),
        }
    }

    /// Arguments for the control master: connect, authenticate, then idle.
    fn master_args(&self, target: &RemoteTarget, credential: &Credential, socket: &Path) -> Vec<String> {
        let mut args = vec![
            "-M".to_string(),
            "-S".to_string(),
            socket.to_string_lossy().into_owned(),
            "-N".to_string(),
            "-p".to_string(),
            target.port.to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            format!("UserKnownHostsFile={}", self.known_hosts.display()),
        ];
        match credential {
            Credential::KeyFile(path) => {
                args.extend([
                    "-i".to_string(),
                    path.to_string_lossy().into_owned(),
                    "-o".to_string(),
                    "IdentitiesOnly=yes".to_string(),
                    "-o".to_string(),
                    "BatchMode=yes".to_string(),
                ]);
            }
            Credential::Password(_) => {
                args.extend([
                    "-o".to_string(),
                    "PubkeyAuthentication=no".to_string(),
                    "-o".to_string(),
                    "PreferredAuthentications=password,keyboard-interactive".to_string(),
                    "-o".to_string(),
                    "NumberOfPasswordPrompts=1".to_string(),
                ]);
            }
        }
        args.push(destination(target));
        args
    }

    fn spawn_master(
        &self,
        target: &RemoteTarget,
        credential: &Credential,
        socket: &Path,
    ) -> Result<Child, TransportError> {
        let args = self.master_args(target, credential, socket);
        let (program, mut cmd) = match credential {
            Credential::Password(password) => {
                let mut cmd = Command::new(SSHPASS);
                cmd.arg("-e").arg(&self.ssh_binary).env("SSHPASS", password);
                (SSHPASS, cmd)
            }
            Credential::KeyFile(_) => (self.ssh_binary.as_str(), Command::new(&self.ssh_binary)),
        };
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProcessError::NotFound {
                    program: program.to_string(),
                }
                .into()
            } else {
                ProcessError::Spawn {
                    program: program.to_string(),
                    source: e,
                }
                .into()
            }
        })
    }

    fn control_spec(&self, socket: &Path, operation: &str, target: &RemoteTarget) -> CommandSpec {
        CommandSpec::new(&self.ssh_binary)
            .arg("-S")
            .arg(socket.to_string_lossy())
            .args(["-O", operation])
            .arg(destination(target))
    }
}

#[async_trait]
impl RemoteTransport for OpenSshTransport {
    fn name(&self) -> &'static str {
        "openssh"
    }

    async fn open(
        &self,
        target: &RemoteTarget,
        credential: &Credential,
    ) -> Result<Box<dyn RemoteSession>, TransportError> {
        info!(target = %target, auth = credential.kind(), "Starting SSH control master");

        let dir = tempfile::Builder::new().prefix("pqc-migrate-").tempdir()?;
        let socket = dir.path().join("control");
        let mut master = self.spawn_master(target, credential, &socket)?;

        // The master either comes up (check succeeds) or exits with an error.
        loop {
            if let Some(status) = master.try_wait()? {
                let mut stderr = String::new();
                if let Some(mut pipe) = master.stderr.take() {
                    pipe.read_to_string(&mut stderr).await?;
                }
                let message = if stderr.trim().is_empty() {
                    format!("ssh {}", status)
                } else {
                    stderr.trim().to_string()
                };
                return Err(classify_failure(target, message));
            }

            let check = self
                .runner
                .run(&self.control_spec(&socket, "check", target))
                .await?;
            if check.success() {
                break;
            }
            tokio::time::sleep(CHECK_INTERVAL).await;
        }

        debug!(target = %target, socket = %socket.display(), "Control master ready");
        Ok(Box::new(OpenSshSession {
            runner: self.runner.clone(),
            ssh_binary: self.ssh_binary.clone(),
            target: target.clone(),
            socket,
            master,
            _dir: dir,
        }))
    }
}

struct OpenSshSession {
    runner: Arc<dyn CommandRunner>,
    ssh_binary: String,
    target: RemoteTarget,
    socket: PathBuf,
    master: Child,
    _dir: TempDir,
}

impl OpenSshSession {
    fn exec_spec(&self, command: &str) -> CommandSpec {
        CommandSpec::new(&self.ssh_binary)
            .arg("-S")
            .arg(self.socket.to_string_lossy())
            .args(["-o", "ControlMaster=no", "-o", "LogLevel=ERROR", "-p"])
            .arg(self.target.port.to_string())
            .arg(destination(&self.target))
            .arg(command)
    }
}

#[async_trait]
impl RemoteSession for OpenSshSession {
    async fn exec(&mut self, command: &str) -> Result<RemoteOutput, TransportError> {
        let output = self.runner.run(&self.exec_spec(command)).await?;
        Ok(RemoteOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_status: output.code.and_then(|code| u32::try_from(code).ok()),
        })
    }

    async fn close(self: Box<Self>) -> Result<(), TransportError> {
        let mut this = self;
        let exit = CommandSpec::new(&this.ssh_binary)
            .arg("-S")
            .arg(this.socket.to_string_lossy())
            .args(["-O", "exit"])
            .arg(destination(&this.target));
        match this.runner.run(&exit).await {
            Ok(output) if output.success() => debug!("Control master asked to exit"),
            Ok(output) => debug!(status = %output.describe_exit(), "Control master exit request failed"),
            Err(e) => warn!(error = %e, "Could not ask control master to exit"),
        }

        if this.master.try_wait()?.is_none() {
            this.master.kill().await?;
        }
        Ok(())
    }
}

fn destination(target: &RemoteTarget) -> String {
    format!("{}@{}", target.user, target.host)
}

fn classify_failure(target: &RemoteTarget, message: String) -> TransportError {
    if message.contains("Permission denied") {
        TransportError::Auth {
            target: target.to_string(),
            message,
        }
    } else {
        TransportError::Connect {
            target: target.to_string(),
            message,
        }
    }
}
