// ABOUTME: Pure-Rust SSH transport built on russh.
// ABOUTME: Verifies host keys trust-on-first-use against known_hosts.

use crate::error::TransportError;
use crate::remote::{Credential, RemoteOutput, RemoteSession, RemoteTarget, RemoteTransport};
use async_trait::async_trait;
use pqc_ssh::{KnownHostsStore, PublicKey};
use russh::client::{self, AuthResult, Handle};
use russh::keys::PrivateKeyWithHashAlg;
use russh::{ChannelMsg, Disconnect};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct RusshTransport {
    known_hosts: PathBuf,
}

impl RusshTransport {
    pub fn new(known_hosts: impl Into<PathBuf>) -> Self {
        Self {
            known_hosts: known_hosts.into(),
        }
    }
}

#[async_trait]
impl RemoteTransport for RusshTransport {
    fn name(&self) -> &'static str {
        "russh"
    }

    async fn open(
        &self,
        target: &RemoteTarget,
        credential: &Credential,
    ) -> Result<Box<dyn RemoteSession>, TransportError> {
        info!(target = %target, auth = credential.kind(), "Connecting to SSH server");

        let config = Arc::new(client::Config::default());
        let handler = HostKeyVerifier {
            store: KnownHostsStore::new(self.known_hosts.clone()),
            host: target.host.clone(),
            port: target.port,
        };

        let mut handle = client::connect(config, (target.host.as_str(), target.port), handler)
            .await
            .map_err(|e| TransportError::Connect {
                target: target.to_string(),
                message: e.to_string(),
            })?;

        let auth_error = |e: russh::Error| TransportError::Auth {
            target: target.to_string(),
            message: e.to_string(),
        };

        let result = match credential {
            Credential::Password(password) => handle
                .authenticate_password(&target.user, password.as_str())
                .await
                .map_err(auth_error)?,
            Credential::KeyFile(path) => {
                let key = russh::keys::load_secret_key(path, None).map_err(|e| {
                    TransportError::Key {
                        path: path.clone(),
                        message: e.to_string(),
                    }
                })?;
                handle
                    .authenticate_publickey(
                        &target.user,
                        PrivateKeyWithHashAlg::new(Arc::new(key), None),
                    )
                    .await
                    .map_err(auth_error)?
            }
        };

        if let AuthResult::Failure {
            remaining_methods, ..
        } = result
        {
            return Err(TransportError::Auth {
                target: target.to_string(),
                message: format!("rejected, remaining methods: {:?}", remaining_methods),
            });
        }

        debug!(target = %target, "Authenticated");
        Ok(Box::new(RusshSession { handle }))
    }
}

struct RusshSession {
    handle: Handle<HostKeyVerifier>,
}

#[async_trait]
impl RemoteSession for RusshSession {
    async fn exec(&mut self, command: &str) -> Result<RemoteOutput, TransportError> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| TransportError::Channel(e.to_string()))?;
        channel
            .exec(true, command)
            .await
            .map_err(|e| TransportError::Channel(e.to_string()))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_status = None;

        // Exit status may arrive after EOF, so drain until the channel closes.
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { data } => stdout.extend_from_slice(&data),
                ChannelMsg::ExtendedData { data, ext: 1 } => stderr.extend_from_slice(&data),
                ChannelMsg::ExitStatus { exit_status: status } => exit_status = Some(status),
                ChannelMsg::ExitSignal { signal_name, .. } => {
                    warn!(signal = ?signal_name, "Remote command killed by signal");
                }
                ChannelMsg::Close => break,
                _ => {}
            }
        }

        Ok(RemoteOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_status,
        })
    }

    async fn close(self: Box<Self>) -> Result<(), TransportError> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(|e| TransportError::Channel(e.to_string()))
    }
}

struct HostKeyVerifier {
    store: KnownHostsStore,
    host: String,
    port: u16,
}

impl client::Handler for HostKeyVerifier {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        let key = match server_public_key
            .to_openssh()
            .ok()
            .and_then(|encoded| PublicKey::from_openssh(&encoded).ok())
        {
            Some(key) => key,
            None => {
                warn!(host = %self.host, "Could not decode server host key");
                return Ok(false);
            }
        };
        Ok(self.store.verify_or_learn(&self.host, self.port, &key))
    }
}
