//! CLI error handling

use std::fmt;

use imgkit_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration error
    Config(imgkit_errors::ConfigError),
    /// Error from a platform helper
    Platform(imgkit_errors::Error),
    /// I/O error
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "Configuration error: {e}"),
            CliError::Platform(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Platform(e) => Some(e),
            CliError::Io(e) => Some(e),
        }
    }
}

impl From<imgkit_errors::ConfigError> for CliError {
    fn from(e: imgkit_errors::ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<imgkit_errors::Error> for CliError {
    fn from(e: imgkit_errors::Error) -> Self {
        match e {
            imgkit_errors::Error::Config(e) => CliError::Config(e),
            other => CliError::Platform(other),
        }
    }
}

impl From<imgkit_errors::PlatformError> for CliError {
    fn from(e: imgkit_errors::PlatformError) -> Self {
        CliError::Platform(e.into())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}
