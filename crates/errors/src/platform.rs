//! Platform-specific operation errors

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

/// Errors that can occur while touching process or OS state
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum PlatformError {
    #[error("{operation}: no such file or directory: {path}")]
    PathNotFound { operation: String, path: String },

    #[error("no user database entry for {user}")]
    UserNotFound { user: String },

    #[error("permission denied: {operation} on {path} - {message}")]
    PermissionDenied {
        operation: String,
        path: String,
        message: String,
    },

    #[error("process state operation failed: {operation} - {message}")]
    ProcessStateFailed { operation: String, message: String },

    #[error("failed to lock {path}: {message}")]
    LockFailed { path: String, message: String },

    #[error("invalid path {path}: {message}")]
    InvalidPath { path: String, message: String },

    #[error("invalid environment variable name {key:?}")]
    InvalidEnvVar { key: String },
}

impl PlatformError {
    /// Map an I/O error from `operation` on `path` to the matching variant
    pub fn from_io(operation: &str, path: &std::path::Path, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::PathNotFound {
                operation: operation.to_string(),
                path: path.display().to_string(),
            },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                operation: operation.to_string(),
                path: path.display().to_string(),
                message: err.to_string(),
            },
            _ => Self::ProcessStateFailed {
                operation: format!("{operation} {}", path.display()),
                message: err.to_string(),
            },
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PathNotFound { .. } | Self::UserNotFound { .. })
    }
}

impl UserFacingError for PlatformError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::PathNotFound { .. } => Some("Check that the path exists and retry."),
            Self::UserNotFound { .. } => {
                Some("Check SUDO_UID/PKEXEC_UID; the resolved uid has no passwd entry.")
            }
            Self::PermissionDenied { .. } => {
                Some("Run the command with sufficient privileges or adjust file permissions.")
            }
            Self::InvalidPath { .. } => Some("Paths must not contain NUL bytes."),
            Self::InvalidEnvVar { .. } => {
                Some("Variable names must be non-empty and contain neither '=' nor NUL.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::LockFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::PathNotFound { .. } => "platform.path_not_found",
            Self::UserNotFound { .. } => "platform.user_not_found",
            Self::PermissionDenied { .. } => "platform.permission_denied",
            Self::ProcessStateFailed { .. } => "platform.process_state_failed",
            Self::LockFailed { .. } => "platform.lock_failed",
            Self::InvalidPath { .. } => "platform.invalid_path",
            Self::InvalidEnvVar { .. } => "platform.invalid_env_var",
        };
        Some(code)
    }
}
