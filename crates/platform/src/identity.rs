//! Invoking-user resolution
//!
//! When imgkit runs under `sudo` or `pkexec` the process uid is 0, but files
//! handed back to the user should be owned by whoever started the command.
//! [`invoking_user`] resolves that identity once per process from
//! `SUDO_UID`/`PKEXEC_UID`/`SUDO_GID`, falling back to the real ids.

use imgkit_errors::PlatformError;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::implementations::unix::{lookup_name, lookup_uid, real_gid, real_uid};

/// Raw inputs the identity is resolved from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentitySources {
    pub sudo_uid: Option<String>,
    pub pkexec_uid: Option<String>,
    pub sudo_gid: Option<String>,
    pub real_uid: u32,
    pub real_gid: u32,
}

impl IdentitySources {
    /// Read the sources from the current process
    pub fn from_process() -> Self {
        Self {
            sudo_uid: std::env::var("SUDO_UID").ok(),
            pkexec_uid: std::env::var("PKEXEC_UID").ok(),
            sudo_gid: std::env::var("SUDO_GID").ok(),
            real_uid: real_uid(),
            real_gid: real_gid(),
        }
    }
}

/// The user that started the process, as opposed to the one it runs as
#[derive(Debug)]
pub struct InvokingUser {
    uid: u32,
    gid: u32,
    invoked_as_root: bool,
    name: OnceLock<String>,
    home: OnceLock<PathBuf>,
}

/// Parse an id from an environment value; empty and unparseable values count as unset
fn parse_id(var: &str, value: Option<&str>) -> Option<u32> {
    let value = value.filter(|v| !v.is_empty())?;
    match value.trim().parse() {
        Ok(id) => Some(id),
        Err(_) => {
            warn!("ignoring {var}={value:?}: not a numeric id");
            None
        }
    }
}

impl InvokingUser {
    /// Resolve an identity from explicit sources
    pub fn from_sources(sources: &IdentitySources) -> Self {
        let uid = parse_id("SUDO_UID", sources.sudo_uid.as_deref())
            .or_else(|| parse_id("PKEXEC_UID", sources.pkexec_uid.as_deref()))
            .unwrap_or(sources.real_uid);
        let gid = parse_id("SUDO_GID", sources.sudo_gid.as_deref()).unwrap_or(sources.real_gid);

        Self {
            uid,
            gid,
            invoked_as_root: uid == 0,
            name: OnceLock::new(),
            home: OnceLock::new(),
        }
    }

    pub fn uid(&self) -> u32 {
        self.uid
    }

    pub fn gid(&self) -> u32 {
        self.gid
    }

    /// Whether the invoking user is root
    pub fn invoked_as_root(&self) -> bool {
        self.invoked_as_root
    }

    /// Whether the process actually runs as the invoking user
    pub fn is_running_user(&self) -> bool {
        self.uid == real_uid()
    }

    /// Login name of the invoking user, looked up once and then cached
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the uid has no user database entry.
    pub fn name(&self) -> Result<&str, PlatformError> {
        if let Some(name) = self.name.get() {
            return Ok(name);
        }

        let entry = lookup_uid(self.uid)?.ok_or_else(|| PlatformError::UserNotFound {
            user: format!("uid {}", self.uid),
        })?;
        Ok(self.name.get_or_init(|| entry.name))
    }

    /// Home directory of the invoking user, resolved once via `~name`
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the user cannot be resolved.
    pub fn home(&self) -> Result<&Path, PlatformError> {
        if let Some(home) = self.home.get() {
            return Ok(home);
        }

        let name = self.name()?;
        let entry = lookup_name(name)?.ok_or_else(|| PlatformError::UserNotFound {
            user: name.to_string(),
        })?;
        Ok(self.home.get_or_init(|| entry.dir))
    }

    /// Resolve name and home and log the identity
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the user cannot be resolved.
    pub fn init(&self) -> Result<(), PlatformError> {
        let name = self.name()?;
        let home = self.home()?;
        debug!(
            "Running as user '{name}' ({}:{}) with home {}.",
            self.uid,
            self.gid,
            home.display()
        );
        Ok(())
    }
}

static INVOKING_USER: OnceLock<InvokingUser> = OnceLock::new();

/// The process-wide invoking user
///
/// Resolved from the environment on first access and fixed afterwards.
/// Call this at startup, before anything changes `SUDO_UID`, `PKEXEC_UID` or
/// `SUDO_GID`. [`scoped_env`](crate::scoped_env) resolves it before applying
/// overrides, so a temporary override is never captured.
pub fn invoking_user() -> &'static InvokingUser {
    INVOKING_USER.get_or_init(|| InvokingUser::from_sources(&IdentitySources::from_process()))
}

/// Expand a leading `~` or `~name` the way shells do
///
/// `~` alone (or `~/...`) uses `$HOME`, falling back to the platform home
/// directory. `~name` uses the user database. Paths without a leading tilde,
/// and tildes naming unknown users, are returned unchanged.
///
/// # Errors
///
/// Returns an error only if the user database itself fails.
pub fn expand_user(path: impl AsRef<Path>) -> Result<PathBuf, PlatformError> {
    let path = path.as_ref();
    let Some(text) = path.to_str() else {
        return Ok(path.to_path_buf());
    };
    let Some(rest) = text.strip_prefix('~') else {
        return Ok(path.to_path_buf());
    };

    let (user, tail) = match rest.find('/') {
        Some(idx) => (&rest[..idx], rest[idx + 1..].trim_start_matches('/')),
        None => (rest, ""),
    };

    let home = if user.is_empty() {
        match std::env::var_os("HOME").filter(|h| !h.is_empty()) {
            Some(home) => PathBuf::from(home),
            None => match dirs::home_dir() {
                Some(home) => home,
                None => return Ok(path.to_path_buf()),
            },
        }
    } else {
        match lookup_name(user)? {
            Some(entry) => entry.dir,
            None => return Ok(path.to_path_buf()),
        }
    };

    if tail.is_empty() {
        Ok(home)
    } else {
        Ok(home.join(tail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources(sudo_uid: Option<&str>, pkexec_uid: Option<&str>) -> IdentitySources {
        IdentitySources {
            sudo_uid: sudo_uid.map(str::to_string),
            pkexec_uid: pkexec_uid.map(str::to_string),
            sudo_gid: None,
            real_uid: 4321,
            real_gid: 8765,
        }
    }

    #[test]
    fn test_sudo_uid_wins_over_real_uid() {
        let user = InvokingUser::from_sources(&sources(Some("1000"), None));
        assert_eq!(user.uid(), 1000);
        assert!(!user.invoked_as_root());
    }

    #[test]
    fn test_sudo_uid_wins_over_pkexec_uid() {
        let user = InvokingUser::from_sources(&sources(Some("1000"), Some("2000")));
        assert_eq!(user.uid(), 1000);
    }

    #[test]
    fn test_pkexec_uid_used_without_sudo() {
        let user = InvokingUser::from_sources(&sources(None, Some("2000")));
        assert_eq!(user.uid(), 2000);
    }

    #[test]
    fn test_falls_back_to_real_ids() {
        let user = InvokingUser::from_sources(&sources(None, None));
        assert_eq!(user.uid(), 4321);
        assert_eq!(user.gid(), 8765);
    }

    #[test]
    fn test_empty_and_garbage_values_are_ignored() {
        let user = InvokingUser::from_sources(&sources(Some(""), Some("not-a-uid")));
        assert_eq!(user.uid(), 4321);
    }

    #[test]
    fn test_sudo_gid_overrides_real_gid() {
        let mut src = sources(None, None);
        src.sudo_gid = Some("100".to_string());
        let user = InvokingUser::from_sources(&src);
        assert_eq!(user.gid(), 100);
    }

    #[test]
    fn test_root_identity_resolves_name_and_home() {
        let user = InvokingUser::from_sources(&sources(Some("0"), None));
        assert!(user.invoked_as_root());

        let entry = lookup_uid(0).unwrap().unwrap();
        assert_eq!(user.name().unwrap(), entry.name);
        assert_eq!(user.home().unwrap(), entry.dir);
        assert!(user.home().unwrap().is_absolute());
        user.init().unwrap();
    }

    #[test]
    fn test_name_is_memoized() {
        let user = InvokingUser::from_sources(&sources(Some("0"), None));
        let first: *const str = user.name().unwrap();
        let second: *const str = user.name().unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn test_unknown_uid_is_not_found() {
        let user = InvokingUser::from_sources(&sources(Some("4294967200"), None));
        let err = user.name().unwrap_err();
        assert!(matches!(err, PlatformError::UserNotFound { .. }));
        assert!(user.home().is_err());
    }

    #[test]
    fn test_is_running_user_matches_real_uid() {
        let mut src = sources(None, None);
        src.real_uid = real_uid();
        assert!(InvokingUser::from_sources(&src).is_running_user());

        src.sudo_uid = Some(real_uid().wrapping_add(1).to_string());
        assert!(!InvokingUser::from_sources(&src).is_running_user());
    }

    #[test]
    fn test_expand_user_named() {
        let entry = lookup_uid(0).unwrap().unwrap();
        let expanded = expand_user(format!("~{}/.cache", entry.name)).unwrap();
        assert_eq!(expanded, entry.dir.join(".cache"));
    }

    #[test]
    fn test_expand_user_leaves_other_paths() {
        assert_eq!(expand_user("/etc/os-release").unwrap(), PathBuf::from("/etc/os-release"));
        assert_eq!(
            expand_user("~imgkit-no-such-user/x").unwrap(),
            PathBuf::from("~imgkit-no-such-user/x")
        );
    }
}
