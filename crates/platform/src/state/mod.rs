//! Process-wide mutable state (working directory, umask, environment)
//!
//! Every call here reads or mutates state shared by all threads of the
//! process. Nothing in this module is thread-safe; callers that run helpers
//! concurrently must serialize them.

use imgkit_errors::PlatformError;
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Full copy of the environment table at one point in time
pub type EnvSnapshot = BTreeMap<OsString, OsString>;

/// Trait for the process-global state the scoped guards snapshot and restore
pub trait ProcessState {
    /// Current working directory
    fn current_dir(&self) -> Result<PathBuf, PlatformError>;

    /// Change the working directory
    fn set_current_dir(&self, path: &Path) -> Result<(), PlatformError>;

    /// Install `mask` as the file-creation mask and return the previous one
    fn swap_umask(&self, mask: u32) -> u32;

    /// Deep copy of the environment table
    fn env_snapshot(&self) -> EnvSnapshot;

    /// Set a single environment variable
    fn set_env(&self, key: &OsStr, value: &OsStr);

    /// Remove a single environment variable
    fn remove_env(&self, key: &OsStr);

    /// Make the environment table equal to `snapshot`
    ///
    /// Keys absent from the snapshot are removed and every snapshot entry is
    /// written back, so the result is a full replace rather than an undo of
    /// individual changes.
    fn replace_env(&self, snapshot: &EnvSnapshot) {
        let current = self.env_snapshot();
        for key in current.keys() {
            if !snapshot.contains_key(key) {
                self.remove_env(key);
            }
        }
        for (key, value) in snapshot {
            if current.get(key) != Some(value) {
                self.set_env(key, value);
            }
        }
    }
}
