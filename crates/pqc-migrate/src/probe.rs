// ABOUTME: Connectivity prober: opens and immediately closes one session.
// ABOUTME: Every failure cause folds into a plain false for the caller.

use crate::remote::{Credential, RemoteTarget, RemoteTransport};
use tracing::{error, info, warn};

/// Try to establish a session with `credential`, run nothing, close it.
///
/// Returns true iff the session was established. Network, authentication,
/// host key and key-file problems all yield false; the cause is only logged.
pub async fn probe(
    transport: &dyn RemoteTransport,
    target: &RemoteTarget,
    credential: &Credential,
) -> bool {
    match transport.open(target, credential).await {
        Ok(session) => {
            if let Err(e) = session.close().await {
                warn!(target = %target, error = %e, "Failed to close probe session");
            }
            info!(
                host = %target.host,
                user = %target.user,
                auth = credential.kind(),
                transport = transport.name(),
                "Successfully connected"
            );
            true
        }
        Err(e) => {
            error!(
                host = %target.host,
                auth = credential.kind(),
                transport = transport.name(),
                error = %e,
                "Failed to connect"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::remote::{RemoteOutput, RemoteSession};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSession {
        execs: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RemoteSession for CountingSession {
        async fn exec(&mut self, _command: &str) -> Result<RemoteOutput, TransportError> {
            self.execs.fetch_add(1, Ordering::SeqCst);
            Ok(RemoteOutput::default())
        }

        async fn close(self: Box<Self>) -> Result<(), TransportError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct KeyOnlyTransport {
        execs: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RemoteTransport for KeyOnlyTransport {
        fn name(&self) -> &'static str {
            "key-only"
        }

        async fn open(
            &self,
            target: &RemoteTarget,
            credential: &Credential,
        ) -> Result<Box<dyn RemoteSession>, TransportError> {
            match credential {
                Credential::KeyFile(_) => Ok(Box::new(CountingSession {
                    execs: self.execs.clone(),
                    closes: self.closes.clone(),
                })),
                Credential::Password(_) => Err(TransportError::Auth {
                    target: target.to_string(),
                    message: "password authentication disabled".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_probe_success_runs_nothing_and_closes() {
        let transport = KeyOnlyTransport::default();
        let target = RemoteTarget::new("client", 22, "bob");

        let ok = probe(&transport, &target, &Credential::KeyFile("/k".into())).await;

        assert!(ok);
        assert_eq!(transport.execs.load(Ordering::SeqCst), 0);
        assert_eq!(transport.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_probe_failure_is_false() {
        let transport = KeyOnlyTransport::default();
        let target = RemoteTarget::new("client", 22, "bob");

        let ok = probe(&transport, &target, &Credential::Password("pw".into())).await;

        assert!(!ok);
    }
}
