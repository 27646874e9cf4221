// ABOUTME: Library for migrating a server and one client to post-quantum hybrid SSH keys.
// ABOUTME: Exposes the components and the state machine the pqc-migrate binary drives.

//! # pqc-migrate
//!
//! Moves a server and one remote client over to an OQS hybrid SSH key
//! algorithm (`ecdsa-p256+kyber512` by default):
//!
//! ```text
//! CheckCapability      ssh -Q key, build OQS OpenSSH if missing
//! ProbeClientPassword  connect to the client with its password
//! UpdateClient         install OQS OpenSSH and generate a key on the client
//! BackupLocal          move ~/.ssh/id_* and copy sshd_config aside
//! GenerateLocalKey     ssh-keygen -t <algorithm> -f ~/.ssh/id_oqs
//! AppendAuthorizedKey  append id_oqs.pub to authorized_keys
//! VerifyNewKey         connect to the client with id_oqs, restore on failure
//! ```
//!
//! Local programs run through [`process::CommandRunner`] and remote sessions
//! through [`remote::RemoteTransport`], so the whole run can be driven by
//! in-process fakes.

pub mod backup;
pub mod capability;
pub mod config;
pub mod error;
pub mod keys;
pub mod orchestrator;
pub mod probe;
pub mod process;
pub mod prompt;
pub mod remote;
pub mod summary;
pub mod transport;

pub use config::{MigrationConfig, MigrationPaths, TransportKind};
pub use orchestrator::{MigrationOutcome, MigrationReport, MigrationState, Orchestrator, StepOutcome};
pub use process::{CommandRunner, SystemRunner};
pub use prompt::ClientCredentials;
pub use remote::{Credential, RemoteTarget, RemoteTransport};
