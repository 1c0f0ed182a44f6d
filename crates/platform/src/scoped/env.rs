//! Scoped environment overrides

use imgkit_errors::{Error, PlatformError};
use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;

use super::{finish_scope, SYSTEM};
use crate::implementations::unix::UnixProcessState;
use crate::state::{EnvSnapshot, ProcessState};

/// Restores the full pre-override environment when dropped
#[must_use = "the environment is restored as soon as the guard is dropped"]
pub struct EnvGuard<'a, S: ProcessState + ?Sized = UnixProcessState> {
    state: &'a S,
    snapshot: Option<EnvSnapshot>,
}

impl<S: ProcessState + ?Sized> EnvGuard<'_, S> {
    /// The environment as it was before the overrides were applied
    pub fn snapshot(&self) -> Option<&EnvSnapshot> {
        self.snapshot.as_ref()
    }

    /// Replace the environment with the snapshot now
    pub fn restore(mut self) {
        self.restore_inner();
    }

    fn restore_inner(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.state.replace_env(&snapshot);
        }
    }
}

impl<S: ProcessState + ?Sized> Drop for EnvGuard<'_, S> {
    fn drop(&mut self) {
        self.restore_inner();
    }
}

fn validate_key(key: &OsStr) -> Result<(), PlatformError> {
    let bytes = key.as_bytes();
    if bytes.is_empty() || bytes.contains(&b'=') || bytes.contains(&0) {
        return Err(PlatformError::InvalidEnvVar {
            key: key.to_string_lossy().into_owned(),
        });
    }
    Ok(())
}

fn validate_value(key: &OsStr, value: &OsStr) -> Result<(), PlatformError> {
    if value.as_bytes().contains(&0) {
        return Err(PlatformError::InvalidEnvVar {
            key: key.to_string_lossy().into_owned(),
        });
    }
    Ok(())
}

/// Merge `overrides` into the environment until the returned guard is dropped
///
/// Overrides win over existing values; unrelated variables are kept. On
/// restore the environment is replaced wholesale by the snapshot taken here,
/// which also removes variables that only the overrides introduced.
///
/// # Errors
///
/// Returns `InvalidEnvVar` if a name is empty or contains `=` or NUL, or a
/// value contains NUL. Nothing is modified in that case.
///
/// The process-wide [`invoking_user`](crate::invoking_user) is resolved
/// before the overrides are applied.
pub fn scoped_env<I, K, V>(overrides: I) -> Result<EnvGuard<'static>, PlatformError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    // The identity is read from the environment and must not see overrides
    crate::identity::invoking_user();
    scoped_env_in(&SYSTEM, overrides)
}

/// [`scoped_env`] against an explicit [`ProcessState`]
///
/// # Errors
///
/// See [`scoped_env`].
pub fn scoped_env_in<S, I, K, V>(state: &S, overrides: I) -> Result<EnvGuard<'_, S>, PlatformError>
where
    S: ProcessState + ?Sized,
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    let overrides: Vec<(OsString, OsString)> = overrides
        .into_iter()
        .map(|(k, v)| (k.as_ref().to_os_string(), v.as_ref().to_os_string()))
        .collect();

    for (key, value) in &overrides {
        validate_key(key)?;
        validate_value(key, value)?;
    }

    let snapshot = state.env_snapshot();
    for (key, value) in &overrides {
        state.set_env(key, value);
    }

    Ok(EnvGuard {
        state,
        snapshot: Some(snapshot),
    })
}

/// Run `body` with `overrides` merged into the environment
///
/// # Errors
///
/// Returns `InvalidEnvVar` for bad overrides, otherwise whatever `body`
/// returns.
pub fn with_scoped_env<T, I, K, V>(
    overrides: I,
    body: impl FnOnce() -> Result<T, Error>,
) -> Result<T, Error>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    let guard = scoped_env(overrides)?;
    let result = body();
    guard.restore();
    finish_scope("environment", result, Ok(()))
}
