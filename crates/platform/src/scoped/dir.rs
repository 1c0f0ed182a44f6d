//! Scoped working directory changes

use imgkit_errors::{Error, PlatformError};
use std::path::{Path, PathBuf};
use tracing::warn;

use super::{finish_scope, SYSTEM};
use crate::implementations::unix::UnixProcessState;
use crate::state::ProcessState;

/// Restores the previous working directory when dropped
#[must_use = "the previous directory is restored as soon as the guard is dropped"]
pub struct DirGuard<'a, S: ProcessState + ?Sized = UnixProcessState> {
    state: &'a S,
    previous: Option<PathBuf>,
}

impl<S: ProcessState + ?Sized> DirGuard<'_, S> {
    /// Directory that will be restored, or `None` if entering was a no-op
    pub fn previous(&self) -> Option<&Path> {
        self.previous.as_deref()
    }

    /// Change back to the previous directory, reporting failure
    ///
    /// # Errors
    ///
    /// Returns an error if the previous directory can no longer be entered.
    pub fn restore(mut self) -> Result<(), PlatformError> {
        self.restore_inner()
    }

    fn restore_inner(&mut self) -> Result<(), PlatformError> {
        match self.previous.take() {
            Some(previous) => self.state.set_current_dir(&previous),
            None => Ok(()),
        }
    }
}

impl<S: ProcessState + ?Sized> Drop for DirGuard<'_, S> {
    fn drop(&mut self) {
        if let Err(e) = self.restore_inner() {
            warn!("failed to restore working directory: {e}");
        }
    }
}

/// Change into `target` for the lifetime of the returned guard
///
/// If `target` already is the working directory nothing is changed and
/// nothing is restored.
///
/// # Errors
///
/// Returns `PathNotFound` or `PermissionDenied` if `target` cannot be
/// entered, or an error if the current directory cannot be determined.
pub fn chdir(target: impl AsRef<Path>) -> Result<DirGuard<'static>, PlatformError> {
    chdir_in(&SYSTEM, target)
}

/// [`chdir`] against an explicit [`ProcessState`]
///
/// # Errors
///
/// See [`chdir`].
pub fn chdir_in<S: ProcessState + ?Sized>(
    state: &S,
    target: impl AsRef<Path>,
) -> Result<DirGuard<'_, S>, PlatformError> {
    let target = target.as_ref();
    let current = state.current_dir()?;

    if current == target {
        return Ok(DirGuard {
            state,
            previous: None,
        });
    }

    state.set_current_dir(target)?;
    Ok(DirGuard {
        state,
        previous: Some(current),
    })
}

/// Run `body` inside `target`, restoring the working directory afterwards
///
/// # Errors
///
/// Returns the error from entering `target`, from `body`, or from restoring
/// the previous directory. A restore failure after a failing body is chained
/// onto the body's error.
pub fn with_chdir<T>(
    target: impl AsRef<Path>,
    body: impl FnOnce() -> Result<T, Error>,
) -> Result<T, Error> {
    let guard = chdir(target)?;
    let result = body();
    finish_scope("working directory", result, guard.restore())
}
