//! Small helpers shared by image build steps

use imgkit_errors::Error;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Sort key group: plain names, then paths, then conditionals
fn package_group(name: &str) -> u8 {
    match name.as_bytes().first() {
        Some(b'(') => 2,
        Some(b'/') => 1,
        _ => 0,
    }
}

/// Sort packages: plain names first, paths second, conditionals third
///
/// Within each group names are ordered lexicographically.
pub fn sort_packages<I, S>(packages: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut packages: Vec<String> = packages.into_iter().map(Into::into).collect();
    packages.sort_by(|a, b| (package_group(a), a).cmp(&(package_group(b), b)));
    packages
}

/// Whether `x` is a positive power of two
pub fn is_power_of_2(x: i64) -> bool {
    x > 0 && x & (x - 1) == 0
}

/// `"1"` or `"0"`, for config files and kernel command lines
pub fn one_zero(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}

/// Add the owner-execute bit to `path`
///
/// # Errors
///
/// Returns an error if the file cannot be stat'ed or chmod'ed.
pub fn make_executable(path: impl AsRef<Path>) -> Result<(), Error> {
    let path = path.as_ref();
    let mut permissions = std::fs::metadata(path)
        .map_err(|e| Error::io_with_path(&e, path))?
        .permissions();
    permissions.set_mode(permissions.mode() | 0o100);
    std::fs::set_permissions(path, permissions).map_err(|e| Error::io_with_path(&e, path))
}

/// Locate an optional tool on `PATH`; `None` when it is not installed
pub fn probe_tool(name: &str) -> Option<PathBuf> {
    match which::which(name) {
        Ok(path) => {
            debug!("found optional tool {name} at {}", path.display());
            Some(path)
        }
        Err(e) => {
            debug!("optional tool {name} not available: {e}");
            None
        }
    }
}
