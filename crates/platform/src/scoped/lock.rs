//! Exclusive advisory file locks
//!
//! The lock is tied to the open file description, so it is held for as long
//! as the [`FileLock`] (and its descriptor) lives and released by closing it.

use imgkit_errors::{Error, PlatformError};
use std::fs::{File, OpenOptions};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, IntoRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::finish_scope;

/// An open, exclusively locked, read-only descriptor
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Path the lock was taken on
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the descriptor, releasing the lock, and report close errors
    ///
    /// # Errors
    ///
    /// Returns an error if `close(2)` fails.
    pub fn release(self) -> Result<(), PlatformError> {
        let fd = self.file.into_raw_fd();
        #[allow(unsafe_code)]
        // SAFETY: fd was just detached from its owning File and is closed exactly once
        let rc = unsafe { libc::close(fd) };
        if rc != 0 {
            return Err(PlatformError::LockFailed {
                path: self.path.display().to_string(),
                message: format!("close failed: {}", std::io::Error::last_os_error()),
            });
        }

        debug!("released lock on {}", self.path.display());
        Ok(())
    }
}

impl AsRawFd for FileLock {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl AsFd for FileLock {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

fn lock_error(path: &Path, what: &str) -> PlatformError {
    PlatformError::LockFailed {
        path: path.display().to_string(),
        message: format!("{what}: {}", std::io::Error::last_os_error()),
    }
}

/// Open `path` read-only and take an exclusive `flock` on it
///
/// The descriptor is opened with `O_CLOEXEC` and `FD_CLOEXEC` is set again
/// with `fcntl`, since some platforms honour only one of the two. Waiting for
/// the lock blocks indefinitely.
///
/// # Errors
///
/// Returns `PathNotFound` if `path` does not exist, `PermissionDenied` if it
/// cannot be read, and `LockFailed` if `fcntl` or `flock` fail.
pub fn flock(path: impl AsRef<Path>) -> Result<FileLock, PlatformError> {
    let path = path.as_ref();
    let file = OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_CLOEXEC)
        .open(path)
        .map_err(|e| PlatformError::from_io("flock", path, &e))?;
    let fd = file.as_raw_fd();

    #[allow(unsafe_code)]
    // SAFETY: fd is a valid descriptor owned by `file`
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) };
    if rc == -1 {
        return Err(lock_error(path, "fcntl(F_SETFD)"));
    }

    debug!("waiting for lock on {}", path.display());
    loop {
        #[allow(unsafe_code)]
        // SAFETY: fd is a valid descriptor owned by `file`
        let rc = unsafe { libc::flock(fd, libc::LOCK_EX) };
        if rc == 0 {
            break;
        }
        if std::io::Error::last_os_error().kind() != std::io::ErrorKind::Interrupted {
            return Err(lock_error(path, "flock(LOCK_EX)"));
        }
    }
    debug!("acquired lock on {}", path.display());

    Ok(FileLock {
        file,
        path: path.to_path_buf(),
    })
}

/// [`flock`] on tokio's blocking pool
///
/// # Errors
///
/// See [`flock`]; additionally fails if the blocking task panics.
pub async fn flock_async(path: impl Into<PathBuf>) -> Result<FileLock, PlatformError> {
    let path = path.into();
    let display = path.display().to_string();
    tokio::task::spawn_blocking(move || flock(&path))
        .await
        .map_err(|e| PlatformError::LockFailed {
            path: display,
            message: format!("lock task failed: {e}"),
        })?
}

/// Run `body` while holding an exclusive lock on `path`
///
/// # Errors
///
/// Returns the acquisition error, the body's error, or a failure to close
/// the descriptor (chained onto the body's error if both fail).
pub fn with_flock<T>(
    path: impl AsRef<Path>,
    body: impl FnOnce(&FileLock) -> Result<T, Error>,
) -> Result<T, Error> {
    let lock = flock(path)?;
    let result = body(&lock);
    finish_scope("file lock", result, lock.release())
}
