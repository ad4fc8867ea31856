//! Error types for SkipKV operations
//!
//! Structural problems of the index are never reported here; those are bugs.
//! What callers can get back is an I/O failure while dumping or loading a
//! snapshot, or a configuration that does not validate.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// SkipKV error types with detailed context
#[derive(Debug, Clone)]
pub enum KvError {
    /// I/O operation failed
    Io {
        /// The file path where the error occurred
        path: Option<PathBuf>,
        /// The underlying I/O error kind
        kind: std::io::ErrorKind,
        /// Human-readable description
        message: String,
    },

    /// Configuration rejected by `Config::validate`
    InvalidConfig {
        /// Which constraint failed
        reason: String,
    },
}

impl KvError {
    /// Wrap an I/O error together with the file it happened on.
    pub(crate) fn io_at(path: &std::path::Path, what: &str, err: std::io::Error) -> Self {
        KvError::Io {
            path: Some(path.to_path_buf()),
            kind: err.kind(),
            message: format!("{}: {}", what, err),
        }
    }
}

impl fmt::Display for KvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KvError::Io { path, kind, message } => {
                if let Some(path) = path {
                    write!(f, "I/O error in {}: {} ({})", path.display(), message, kind)
                } else {
                    write!(f, "I/O error: {} ({})", message, kind)
                }
            }

            KvError::InvalidConfig { reason } => {
                write!(f, "Invalid configuration: {}", reason)
            }
        }
    }
}

impl Error for KvError {}

/// Convert std::io::Error to KvError::Io
impl From<std::io::Error> for KvError {
    fn from(err: std::io::Error) -> Self {
        KvError::Io {
            path: None,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for SkipKV operations
pub type KvResult<T> = Result<T, KvError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KvError::io_at(
            std::path::Path::new("/tmp/data_file"),
            "Failed to open snapshot",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );

        let display = format!("{}", err);
        assert!(display.contains("/tmp/data_file"));
        assert!(display.contains("Failed to open snapshot"));
    }

    #[test]
    fn test_config_error_display() {
        let err = KvError::InvalidConfig { reason: "max_height must be in [1, 64]".into() };
        assert_eq!(format!("{}", err), "Invalid configuration: max_height must be in [1, 64]");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let kv_err: KvError = io_err.into();

        match kv_err {
            KvError::Io { kind, path, .. } => {
                assert_eq!(kind, std::io::ErrorKind::NotFound);
                assert!(path.is_none());
            }
            _ => panic!("Expected Io error"),
        }
    }
}
