//! Scoped changes to process state
//!
//! Each helper captures the previous value of some process-global state,
//! mutates it, and puts the old value back when the scope ends. Two styles
//! are offered:
//!
//! - RAII guards ([`DirGuard`], [`UmaskGuard`], [`EnvGuard`], [`FileLock`])
//!   restore on drop. Call `restore()`/`release()` explicitly to observe a
//!   failing restore; a failure during drop is only logged.
//! - Closure helpers ([`with_chdir`], [`with_umask`], [`with_scoped_env`],
//!   [`with_flock`]) run a body and always restore afterwards. When both the
//!   body and the restore fail, the body's error is returned with the restore
//!   failure chained onto it.
//!
//! The working directory, umask and environment are shared by every thread
//! of the process. These helpers are not reentrant and not thread-safe.

mod dir;
mod env;
mod lock;
mod umask;

use imgkit_errors::{Error, PlatformError};

use crate::implementations::unix::UnixProcessState;

pub use dir::{chdir, chdir_in, with_chdir, DirGuard};
pub use env::{scoped_env, scoped_env_in, with_scoped_env, EnvGuard};
pub use lock::{flock, flock_async, with_flock, FileLock};
pub use umask::{umask, umask_in, with_umask, UmaskGuard};

/// The real process state used by the convenience entry points
pub(crate) static SYSTEM: UnixProcessState = UnixProcessState::new();

/// Combine the outcome of a scope body with the outcome of its cleanup
pub(crate) fn finish_scope<T>(
    operation: &str,
    body: Result<T, Error>,
    cleanup: Result<(), PlatformError>,
) -> Result<T, Error> {
    match (body, cleanup) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(cleanup)) => Err(cleanup.into()),
        (Err(original), Ok(())) => Err(original),
        (Err(original), Err(cleanup)) => Err(original.with_cleanup(operation, cleanup.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleanup_error() -> PlatformError {
        PlatformError::ProcessStateFailed {
            operation: "chdir /old".to_string(),
            message: "gone".to_string(),
        }
    }

    #[test]
    fn test_finish_scope_prefers_body_error() {
        let body: Result<(), Error> = Err(Error::internal("body failed"));
        let err = finish_scope("working directory", body, Ok(())).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn test_finish_scope_reports_cleanup_failure_after_success() {
        let err = finish_scope("working directory", Ok(1), Err(cleanup_error())).unwrap_err();
        assert!(matches!(
            err,
            Error::Platform(PlatformError::ProcessStateFailed { .. })
        ));
    }

    #[test]
    fn test_finish_scope_chains_both_failures() {
        let body: Result<(), Error> = Err(Error::internal("body failed"));
        let err = finish_scope("working directory", body, Err(cleanup_error())).unwrap_err();
        match err {
            Error::Cleanup {
                operation,
                original,
                cleanup,
            } => {
                assert_eq!(operation, "working directory");
                assert!(matches!(*original, Error::Internal(_)));
                assert!(matches!(*cleanup, Error::Platform(_)));
            }
            other => panic!("expected cleanup error, got {other:?}"),
        }
    }
}
