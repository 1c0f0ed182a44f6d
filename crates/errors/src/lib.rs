#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for imgkit
//!
//! This crate provides fine-grained error types organized by domain.
//! All error types implement Clone so they can be stored and re-reported.

use std::borrow::Cow;
use std::path::PathBuf;

use thiserror::Error;

pub mod config;
pub mod platform;

// Re-export all error types at the root
pub use config::ConfigError;
pub use platform::PlatformError;

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("internal error: {0}")]
    Internal(String),

    /// A scoped operation failed and restoring the previous process state
    /// failed as well. The body's error is kept as the source.
    #[error("{original} (restoring {operation} also failed: {cleanup})")]
    Cleanup {
        operation: String,
        #[source]
        original: Box<Error>,
        cleanup: Box<Error>,
    },

    #[error("I/O error: {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
        path: Option<PathBuf>,
    },
}

impl Error {
    /// Create an internal error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an Io error with an associated path
    pub fn io_with_path(err: &std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: Some(path.into()),
        }
    }

    /// Chain a failed cleanup step onto the error that was already propagating
    #[must_use]
    pub fn with_cleanup(self, operation: impl Into<String>, cleanup: Error) -> Self {
        Self::Cleanup {
            operation: operation.into(),
            original: Box::new(self),
            cleanup: Box::new(cleanup),
        }
    }

    /// Whether this error (or the error it wraps) means "does not exist"
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Platform(err) => err.is_not_found(),
            Error::Config(ConfigError::NotFound { .. }) => true,
            Error::Io { kind, .. } => *kind == std::io::ErrorKind::NotFound,
            Error::Cleanup { original, .. } => original.is_not_found(),
            _ => false,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {err}"))
    }
}

/// Result type alias for imgkit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Minimal interface for rendering user-facing error information without
/// requiring heavyweight envelopes.
pub trait UserFacingError {
    /// Short message suitable for CLI output.
    fn user_message(&self) -> Cow<'_, str>;

    /// Optional remediation hint.
    fn user_hint(&self) -> Option<&'static str> {
        None
    }

    /// Whether retrying the same operation is likely to succeed.
    fn is_retryable(&self) -> bool {
        false
    }

    /// Stable error code for analytics / structured reporting.
    fn user_code(&self) -> Option<&'static str> {
        None
    }
}

impl UserFacingError for Error {
    fn user_message(&self) -> Cow<'_, str> {
        match self {
            Error::Platform(err) => err.user_message(),
            Error::Config(err) => err.user_message(),
            Error::Io { message, .. } => Cow::Owned(message.clone()),
            _ => Cow::Owned(self.to_string()),
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Error::Platform(err) => err.user_hint(),
            Error::Config(err) => err.user_hint(),
            Error::Cleanup { .. } => {
                Some("The process state may not have been fully restored; restart the command.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Error::Platform(err) => err.is_retryable(),
            Error::Io { .. } => true,
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Error::Config(err) => err.user_code(),
            Error::Platform(err) => err.user_code(),
            Error::Internal(_) => Some("error.internal"),
            Error::Cleanup { .. } => Some("error.cleanup"),
            Error::Io { .. } => Some("error.io"),
        }
    }
}
