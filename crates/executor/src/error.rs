//! Error types for the cacherun-executor crate

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for cacherun-executor operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The command cannot be run: relative path or not found on PATH
    #[error("Bad command: {reason}")]
    #[diagnostic(
        code(cacherun::command::bad),
        help("Use an absolute path or a command name found on PATH")
    )]
    BadCommand {
        /// Why the command was rejected
        reason: String,
    },

    /// The command line could not be hashed into a cache key
    #[error("Unable to hash command: {message}")]
    #[diagnostic(code(cacherun::key::hash_failure))]
    HashFailure {
        /// Description of the text that could not be hashed
        message: String,
    },

    /// OS-level failure with path context
    #[error("I/O error during {operation}: {source}")]
    #[diagnostic(code(cacherun::io::error))]
    SystemError {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// The path where the I/O error occurred, if applicable
        path: Option<Box<std::path::Path>>,
        /// Description of the operation that failed
        operation: String,
    },

    /// A cache management operation found nothing to act on
    #[error("{message}")]
    #[diagnostic(
        code(cacherun::cache::not_found),
        help("Run 'cacherun --list-caches' to see cached commands")
    )]
    FileError {
        /// The error message
        message: String,
    },
}

impl Error {
    /// Create a bad command error with a reason
    pub fn bad_command(reason: impl Into<String>) -> Self {
        Self::BadCommand {
            reason: reason.into(),
        }
    }

    /// Create a hash failure error
    pub fn hash_failure(message: impl Into<String>) -> Self {
        Self::HashFailure {
            message: message.into(),
        }
    }

    /// Create an I/O error with context
    pub fn io(source: std::io::Error, path: Option<PathBuf>, operation: impl Into<String>) -> Self {
        Self::SystemError {
            source,
            path: path.map(|p| p.into_boxed_path()),
            operation: operation.into(),
        }
    }

    /// Create a file error with a message
    pub fn file(message: impl Into<String>) -> Self {
        Self::FileError {
            message: message.into(),
        }
    }
}

/// Result type for cacherun-executor operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_keeps_operation_and_path() {
        let err = Error::io(
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            Some(PathBuf::from("/tmp/abc.data")),
            "read cache data",
        );
        assert!(err.to_string().contains("read cache data"));
        match err {
            Error::SystemError { path, .. } => {
                assert_eq!(path.as_deref(), Some(std::path::Path::new("/tmp/abc.data")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_file_error_displays_message_verbatim() {
        let err = Error::file("no cache file found with identifier: abc");
        assert_eq!(err.to_string(), "no cache file found with identifier: abc");
    }
}
