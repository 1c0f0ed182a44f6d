//! OS-specific implementations of the platform traits

#[cfg(unix)]
pub mod unix;
