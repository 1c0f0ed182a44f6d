//! OS interaction helpers for imgkit.
//!
//! This crate provides the small pieces of process plumbing an image build
//! needs:
//! - Invoking-user resolution under `sudo`/`pkexec` ([`identity`])
//! - Scoped working directory, umask and environment changes, and exclusive
//!   advisory file locks ([`scoped`])
//! - `KEY=value` environment file and `os-release` parsing ([`envfile`])
//! - Resource limits and assorted helpers ([`rlimit`], [`util`])
//!
//! Only unix targets are supported.

#[cfg(not(unix))]
compile_error!("imgkit-platform only supports unix targets");

pub mod envfile;
pub mod identity;
pub mod implementations;
pub mod rlimit;
pub mod scoped;
pub mod state;
pub mod util;

pub use envfile::{parse_env_pairs, read_env_file, read_os_release, EnvEntry};
pub use identity::{expand_user, invoking_user, IdentitySources, InvokingUser};
pub use implementations::unix::UnixProcessState;
pub use rlimit::{format_rlimit, get_rlimit, Limits, Resource};
pub use scoped::{
    chdir, flock, flock_async, scoped_env, umask, with_chdir, with_flock, with_scoped_env,
    with_umask, DirGuard, EnvGuard, FileLock, UmaskGuard,
};
pub use state::{EnvSnapshot, ProcessState};
pub use util::{is_power_of_2, make_executable, one_zero, probe_tool, sort_packages};
