//! User database lookups via the reentrant `getpw*_r` family

use imgkit_errors::PlatformError;
use std::ffi::{CStr, CString, OsStr};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

const FALLBACK_BUFFER_SIZE: usize = 1024;
const MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// The parts of a passwd entry imgkit cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswdEntry {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub dir: PathBuf,
}

/// Look up the account for `uid`; `Ok(None)` when there is none
#[allow(unsafe_code)]
pub fn lookup_uid(uid: u32) -> Result<Option<PasswdEntry>, PlatformError> {
    lookup(&format!("uid {uid}"), |pwd, buf, len, result| {
        // SAFETY: all pointers come from `lookup` and stay valid for the call
        unsafe { libc::getpwuid_r(uid, pwd, buf, len, result) }
    })
}

/// Look up the account called `name`; `Ok(None)` when there is none
#[allow(unsafe_code)]
pub fn lookup_name(name: &str) -> Result<Option<PasswdEntry>, PlatformError> {
    let c_name = CString::new(name).map_err(|_| PlatformError::InvalidPath {
        path: name.to_string(),
        message: "user name contains a NUL byte".to_string(),
    })?;

    lookup(name, |pwd, buf, len, result| {
        // SAFETY: c_name is NUL terminated and outlives the call
        unsafe { libc::getpwnam_r(c_name.as_ptr(), pwd, buf, len, result) }
    })
}

fn initial_buffer_size() -> usize {
    #[allow(unsafe_code)]
    // SAFETY: sysconf has no preconditions
    let size = unsafe { libc::sysconf(libc::_SC_GETPW_R_SIZE_MAX) };
    usize::try_from(size)
        .ok()
        .filter(|size| *size > 0)
        .unwrap_or(FALLBACK_BUFFER_SIZE)
}

fn lookup<F>(what: &str, mut call: F) -> Result<Option<PasswdEntry>, PlatformError>
where
    F: FnMut(
        *mut libc::passwd,
        *mut libc::c_char,
        libc::size_t,
        *mut *mut libc::passwd,
    ) -> libc::c_int,
{
    let mut buf_len = initial_buffer_size();

    loop {
        let mut buf: Vec<libc::c_char> = vec![0; buf_len];
        #[allow(unsafe_code)]
        // SAFETY: passwd is a plain C struct for which all-zero is a valid value
        let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
        let mut result: *mut libc::passwd = std::ptr::null_mut();

        let rc = call(
            &mut pwd as *mut libc::passwd,
            buf.as_mut_ptr(),
            buf.len(),
            &mut result as *mut *mut libc::passwd,
        );

        if rc == libc::ERANGE && buf_len < MAX_BUFFER_SIZE {
            buf_len *= 2;
            continue;
        }

        if result.is_null() {
            // POSIX allows several errnos to mean "no such entry"
            return match rc {
                0 | libc::ENOENT | libc::ESRCH | libc::EBADF | libc::EPERM => Ok(None),
                _ => Err(PlatformError::ProcessStateFailed {
                    operation: format!("user database lookup for {what}"),
                    message: std::io::Error::from_raw_os_error(rc).to_string(),
                }),
            };
        }

        #[allow(unsafe_code)]
        // SAFETY: on success pw_name and pw_dir point into `buf`, which is still alive
        let (name, dir) = unsafe {
            (
                CStr::from_ptr(pwd.pw_name).to_string_lossy().into_owned(),
                PathBuf::from(OsStr::from_bytes(CStr::from_ptr(pwd.pw_dir).to_bytes())),
            )
        };

        return Ok(Some(PasswdEntry {
            name,
            uid: pwd.pw_uid,
            gid: pwd.pw_gid,
            dir,
        }));
    }
}
