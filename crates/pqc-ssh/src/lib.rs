// ABOUTME: Shared SSH file-format utilities for pqc-migrate.
// ABOUTME: Provides identity discovery, authorized_keys appends, fingerprints, and known_hosts TOFU.

//! # pqc-ssh
//!
//! Small, synchronous helpers for the files OpenSSH keeps under `~/.ssh`.
//!
//! ## Features
//!
//! - **Identities**: find `id_*` key files in a directory
//! - **Authorized keys**: append a public key file verbatim, never deduplicating
//! - **Fingerprints**: OpenSSH-style `SHA256:` fingerprints for audit logs
//! - **Known hosts**: trust-on-first-use host key store
//!
//! ## Example
//!
//! ```no_run
//! use pqc_ssh::{append_public_key, public_key_path, AppendOutcome};
//! use std::path::Path;
//!
//! let key = Path::new("/home/me/.ssh/id_oqs");
//! let store = Path::new("/home/me/.ssh/authorized_keys");
//! match append_public_key(&public_key_path(key), store).expect("append should work") {
//!     AppendOutcome::Appended { bytes } => println!("appended {bytes} bytes"),
//!     AppendOutcome::MissingPublicKey => println!("no public key yet"),
//! }
//! ```

mod authorized_keys;
mod error;
mod fingerprint;
mod identity;
mod key;
mod known_hosts;

// Re-export primary types and functions
pub use authorized_keys::{append_public_key, AppendOutcome};
pub use error::{Result, SshError};
pub use fingerprint::{compute_fingerprint, fingerprint_file};
pub use identity::{identity_entries, IDENTITY_PREFIX};
pub use key::{ensure_private_dir, load_public_key, public_key_path};
pub use known_hosts::{HostKeyStatus, KnownHostsStore};

// Re-export ssh_key types for convenience
pub use ssh_key::PublicKey;
