//! Unix implementation of process state access

use imgkit_errors::PlatformError;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::state::{EnvSnapshot, ProcessState};

/// Process state backed by the real OS primitives
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixProcessState;

impl UnixProcessState {
    pub const fn new() -> Self {
        Self
    }
}

impl ProcessState for UnixProcessState {
    fn current_dir(&self) -> Result<PathBuf, PlatformError> {
        std::env::current_dir().map_err(|e| PlatformError::ProcessStateFailed {
            operation: "getcwd".to_string(),
            message: e.to_string(),
        })
    }

    fn set_current_dir(&self, path: &Path) -> Result<(), PlatformError> {
        std::env::set_current_dir(path).map_err(|e| PlatformError::from_io("chdir", path, &e))
    }

    fn swap_umask(&self, mask: u32) -> u32 {
        #[allow(unsafe_code, clippy::cast_possible_truncation)]
        // SAFETY: umask cannot fail and only touches the calling process
        let previous = unsafe { libc::umask(mask as libc::mode_t) };
        u32::from(previous)
    }

    fn env_snapshot(&self) -> EnvSnapshot {
        std::env::vars_os().collect()
    }

    fn set_env(&self, key: &OsStr, value: &OsStr) {
        std::env::set_var(key, value);
    }

    fn remove_env(&self, key: &OsStr) {
        std::env::remove_var(key);
    }
}

/// Real user id of the calling process
#[allow(unsafe_code)]
pub fn real_uid() -> u32 {
    // SAFETY: getuid is always successful
    unsafe { libc::getuid() }
}

/// Real group id of the calling process
#[allow(unsafe_code)]
pub fn real_gid() -> u32 {
    // SAFETY: getgid is always successful
    unsafe { libc::getgid() }
}
