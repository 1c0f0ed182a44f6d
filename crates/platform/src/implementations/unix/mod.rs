//! Unix-specific platform implementation

pub mod passwd;
pub mod state;

pub use passwd::{lookup_name, lookup_uid, PasswdEntry};
pub use state::{real_gid, real_uid, UnixProcessState};
