// ABOUTME: Concrete RemoteTransport implementations and selection by TransportKind.
// ABOUTME: Auto routes password sessions to russh and key-file sessions to the OpenSSH client.

mod openssh;
mod russh_client;

pub use openssh::OpenSshTransport;
pub use russh_client::RusshTransport;

use crate::config::{MigrationConfig, TransportKind};
use crate::error::TransportError;
use crate::process::CommandRunner;
use crate::remote::{Credential, RemoteSession, RemoteTarget, RemoteTransport};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Picks a transport per credential.
///
/// russh cannot load OQS hybrid private keys, so key-file sessions (the
/// verification of the newly generated key) go through the local OQS-enabled
/// `ssh` binary, while password sessions use russh.
pub struct AutoTransport {
    password: Arc<dyn RemoteTransport>,
    key_file: Arc<dyn RemoteTransport>,
}

impl AutoTransport {
    pub fn new(password: Arc<dyn RemoteTransport>, key_file: Arc<dyn RemoteTransport>) -> Self {
        Self { password, key_file }
    }

    fn route(&self, credential: &Credential) -> &dyn RemoteTransport {
        match credential {
            Credential::Password(_) => self.password.as_ref(),
            Credential::KeyFile(_) => self.key_file.as_ref(),
        }
    }
}

#[async_trait]
impl RemoteTransport for AutoTransport {
    fn name(&self) -> &'static str {
        "auto"
    }

    async fn open(
        &self,
        target: &RemoteTarget,
        credential: &Credential,
    ) -> Result<Box<dyn RemoteSession>, TransportError> {
        let transport = self.route(credential);
        debug!(transport = transport.name(), auth = credential.kind(), "Selected transport");
        transport.open(target, credential).await
    }
}

/// Build the transport named in the configuration.
pub fn build_transport(
    config: &MigrationConfig,
    runner: Arc<dyn CommandRunner>,
) -> Arc<dyn RemoteTransport> {
    let known_hosts = config.paths().known_hosts;
    let russh: Arc<dyn RemoteTransport> = Arc::new(RusshTransport::new(known_hosts.clone()));
    let openssh: Arc<dyn RemoteTransport> = Arc::new(OpenSshTransport::new(
        runner,
        config.capability.ssh_binary.clone(),
        known_hosts,
    ));

    match config.transport {
        TransportKind::Auto => Arc::new(AutoTransport::new(russh, openssh)),
        TransportKind::Russh => russh,
        TransportKind::Openssh => openssh,
    }
}
