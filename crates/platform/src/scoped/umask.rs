//! Scoped file-creation mask changes

use imgkit_errors::Error;

use super::{finish_scope, SYSTEM};
use crate::implementations::unix::UnixProcessState;
use crate::state::ProcessState;

/// Restores the previous umask when dropped
#[must_use = "the previous umask is restored as soon as the guard is dropped"]
pub struct UmaskGuard<'a, S: ProcessState + ?Sized = UnixProcessState> {
    state: &'a S,
    previous: Option<u32>,
}

impl<S: ProcessState + ?Sized> UmaskGuard<'_, S> {
    /// The mask that was active before the guard was created
    pub fn previous(&self) -> Option<u32> {
        self.previous
    }

    /// Put the previous mask back now
    pub fn restore(mut self) {
        self.restore_inner();
    }

    fn restore_inner(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.state.swap_umask(previous);
        }
    }
}

impl<S: ProcessState + ?Sized> Drop for UmaskGuard<'_, S> {
    fn drop(&mut self) {
        self.restore_inner();
    }
}

/// Set the process umask to `mask` until the returned guard is dropped
///
/// `mask` is handed to the OS unvalidated; bits outside `0o777` are ignored
/// by the kernel.
pub fn umask(mask: u32) -> UmaskGuard<'static> {
    umask_in(&SYSTEM, mask)
}

/// [`umask`] against an explicit [`ProcessState`]
pub fn umask_in<S: ProcessState + ?Sized>(state: &S, mask: u32) -> UmaskGuard<'_, S> {
    let previous = state.swap_umask(mask);
    UmaskGuard {
        state,
        previous: Some(previous),
    }
}

/// Run `body` with the umask set to `mask`, restoring it afterwards
///
/// # Errors
///
/// Returns whatever `body` returns.
pub fn with_umask<T>(mask: u32, body: impl FnOnce() -> Result<T, Error>) -> Result<T, Error> {
    let guard = umask(mask);
    let result = body();
    guard.restore();
    finish_scope("umask", result, Ok(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ProcessState;
    use crate::test_support::{lock_process_state, SpyState};
    use proptest::prelude::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn effective_umask() -> u32 {
        let current = SYSTEM.swap_umask(0o022);
        SYSTEM.swap_umask(current);
        current
    }

    proptest! {
        #[test]
        fn prop_umask_is_effective_inside_and_restored_after(mask in 0u32..=0o777) {
            let _lock = lock_process_state();
            let before = effective_umask();

            {
                let guard = umask(mask);
                prop_assert_eq!(guard.previous(), Some(before));
                prop_assert_eq!(effective_umask(), mask);
            }

            prop_assert_eq!(effective_umask(), before);
        }
    }

    #[test]
    fn test_umask_applies_to_created_files() {
        let _lock = lock_process_state();
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("masked");

        with_umask(0o077, || {
            std::fs::write(&path, b"x")?;
            Ok(())
        })
        .unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0);
    }

    #[test]
    fn test_with_umask_restores_when_body_fails() {
        let _lock = lock_process_state();
        let before = effective_umask();

        let result: Result<(), Error> = with_umask(0o027, || Err(Error::internal("body failed")));

        assert!(result.is_err());
        assert_eq!(effective_umask(), before);
    }

    #[test]
    fn test_umask_in_uses_given_state() {
        let spy = SpyState::with_cwd("/");
        spy.swap_umask(0o022);

        {
            let _guard = umask_in(&spy, 0o077);
            assert_eq!(spy.umask(), 0o077);
        }

        assert_eq!(spy.umask(), 0o022);
    }
}
