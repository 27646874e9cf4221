// ABOUTME: Error types for pqc-migrate components.
// ABOUTME: Separates process, capability, key generation, and transport failures.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to run a local program at all (as opposed to it exiting non-zero).
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("command not found: {program}")]
    NotFound { program: String },

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Reasons the local host cannot be brought to a PQC-capable SSH state.
/// Every variant is fatal to a migration run.
#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("SSH is not installed on this system (`{binary}` not found)")]
    ToolingMissing { binary: String },

    #[error("OQS-enabled OpenSSH is not installed and automatic installation is disabled; please install it")]
    NotInstalled,

    #[error("installing OQS-enabled OpenSSH failed at `{step}`: {reason}")]
    InstallStep { step: String, reason: String },
}

/// Local key generation failures. Fatal to a migration run.
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("failed to prepare SSH directory: {0}")]
    SshDir(#[from] pqc_ssh::SshError),

    #[error("failed to generate SSH key at {path}: {reason}")]
    Generate { path: PathBuf, reason: String },
}

/// Failures opening or using a remote session.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to connect to {target}: {message}")]
    Connect { target: String, message: String },

    #[error("authentication as {target} rejected: {message}")]
    Auth { target: String, message: String },

    #[error("failed to load private key {path}: {message}")]
    Key { path: PathBuf, message: String },

    #[error("remote channel error: {0}")]
    Channel(String),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("session I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_not_found_display() {
        let err = ProcessError::NotFound {
            program: "ssh".to_string(),
        };
        assert_eq!(err.to_string(), "command not found: ssh");
    }

    #[test]
    fn test_spawn_has_source() {
        let err = ProcessError::Spawn {
            program: "make".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("make"));
    }

    #[test]
    fn test_install_step_display() {
        let err = CapabilityError::InstallStep {
            step: "make".to_string(),
            reason: "exited with status 2".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("`make`"));
        assert!(display.contains("status 2"));
    }

    #[test]
    fn test_key_error_from_ssh_error() {
        let err: KeyError = pqc_ssh::SshError::CreateDirectory {
            path: PathBuf::from("/root/.ssh"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        }
        .into();
        assert!(matches!(err, KeyError::SshDir(_)));
        assert!(err.to_string().contains("/root/.ssh"));
    }

    #[test]
    fn test_transport_error_transparent_process() {
        let err: TransportError = ProcessError::NotFound {
            program: "sshpass".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "command not found: sshpass");
    }
}
