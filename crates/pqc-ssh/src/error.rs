// ABOUTME: Error types for SSH file operations using thiserror.
// ABOUTME: Provides typed errors for key parsing, file I/O, and directory setup.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing SSH files.
#[derive(Error, Debug)]
pub enum SshError {
    /// Failed to read a key file from disk.
    #[error("failed to read SSH key from {path}: {source}")]
    ReadKey {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse an SSH key.
    #[error("failed to parse SSH key from {path}: {source}")]
    ParseKey {
        path: PathBuf,
        #[source]
        source: ssh_key::Error,
    },

    /// Failed to serialize a key.
    #[error("failed to serialize key: {0}")]
    SerializeKey(#[source] ssh_key::Error),

    /// Failed to read a plain file (authorized_keys, known_hosts).
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write or append to a file.
    #[error("failed to write {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to list a directory.
    #[error("failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a directory.
    #[error("failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to set file permissions.
    #[error("failed to set permissions on {path}: {source}")]
    SetPermissions {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias using SshError.
pub type Result<T> = std::result::Result<T, SshError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_read_key_error_display() {
        let err = SshError::ReadKey {
            path: PathBuf::from("/path/to/key"),
            source: io::Error::new(io::ErrorKind::NotFound, "file not found"),
        };
        let display = format!("{}", err);
        assert!(display.contains("failed to read SSH key"));
        assert!(display.contains("/path/to/key"));
    }

    #[test]
    fn test_parse_key_error_display() {
        let err = SshError::ParseKey {
            path: PathBuf::from("/path/to/invalid_key"),
            source: ssh_key::Error::AlgorithmUnknown,
        };
        let display = format!("{}", err);
        assert!(display.contains("failed to parse SSH key"));
        assert!(display.contains("/path/to/invalid_key"));
    }

    #[test]
    fn test_write_file_error_display() {
        let err = SshError::WriteFile {
            path: PathBuf::from("/home/u/.ssh/authorized_keys"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "access denied"),
        };
        let display = format!("{}", err);
        assert!(display.contains("failed to write"));
        assert!(display.contains("authorized_keys"));
    }

    #[test]
    fn test_create_directory_error_display() {
        let err = SshError::CreateDirectory {
            path: PathBuf::from("/path/to/dir"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "access denied"),
        };
        let display = format!("{}", err);
        assert!(display.contains("failed to create directory"));
        assert!(display.contains("/path/to/dir"));
    }

    #[test]
    fn test_error_source_read_directory() {
        use std::error::Error;

        let err = SshError::ReadDirectory {
            path: PathBuf::from("/path"),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_source_serialize_key() {
        use std::error::Error;

        let err = SshError::SerializeKey(ssh_key::Error::AlgorithmUnknown);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_debug() {
        let err = SshError::SetPermissions {
            path: PathBuf::from("/path"),
            source: io::Error::new(io::ErrorKind::Other, "error"),
        };
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("SetPermissions"));
    }
}
