//! Resource limit inspection

use imgkit_errors::PlatformError;
use std::fmt;

/// Resources that can be queried with `getrlimit`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    AddressSpace,
    Core,
    Cpu,
    Data,
    FileSize,
    MemLock,
    NoFile,
    NProc,
    Rss,
    Stack,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Locks,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    MsgQueue,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Nice,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    RtPrio,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    RtTime,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    SigPending,
}

impl Resource {
    /// Every resource known on this platform
    pub fn all() -> Vec<Resource> {
        let mut all = vec![
            Self::AddressSpace,
            Self::Core,
            Self::Cpu,
            Self::Data,
            Self::FileSize,
            Self::MemLock,
            Self::NoFile,
            Self::NProc,
            Self::Rss,
            Self::Stack,
        ];
        #[cfg(any(target_os = "linux", target_os = "android"))]
        all.extend([
            Self::Locks,
            Self::MsgQueue,
            Self::Nice,
            Self::RtPrio,
            Self::RtTime,
            Self::SigPending,
        ]);
        all
    }

    /// The `RLIMIT_*` constant name
    pub fn name(self) -> &'static str {
        match self {
            Self::AddressSpace => "RLIMIT_AS",
            Self::Core => "RLIMIT_CORE",
            Self::Cpu => "RLIMIT_CPU",
            Self::Data => "RLIMIT_DATA",
            Self::FileSize => "RLIMIT_FSIZE",
            Self::MemLock => "RLIMIT_MEMLOCK",
            Self::NoFile => "RLIMIT_NOFILE",
            Self::NProc => "RLIMIT_NPROC",
            Self::Rss => "RLIMIT_RSS",
            Self::Stack => "RLIMIT_STACK",
            #[cfg(any(target_os = "linux", target_os = "android"))]
            Self::Locks => "RLIMIT_LOCKS",
            #[cfg(any(target_os = "linux", target_os = "android"))]
            Self::MsgQueue => "RLIMIT_MSGQUEUE",
            #[cfg(any(target_os = "linux", target_os = "android"))]
            Self::Nice => "RLIMIT_NICE",
            #[cfg(any(target_os = "linux", target_os = "android"))]
            Self::RtPrio => "RLIMIT_RTPRIO",
            #[cfg(any(target_os = "linux", target_os = "android"))]
            Self::RtTime => "RLIMIT_RTTIME",
            #[cfg(any(target_os = "linux", target_os = "android"))]
            Self::SigPending => "RLIMIT_SIGPENDING",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Soft and hard limit of one resource; `None` means unlimited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub soft: Option<u64>,
    pub hard: Option<u64>,
}

impl fmt::Display for Limits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn side(f: &mut fmt::Formatter<'_>, limit: Option<u64>) -> fmt::Result {
            match limit {
                Some(value) => write!(f, "{value}"),
                None => f.write_str("infinity"),
            }
        }
        side(f, self.soft)?;
        f.write_str(":")?;
        side(f, self.hard)
    }
}

/// Query the current limits of `resource`
///
/// # Errors
///
/// Returns an error if `getrlimit` fails.
pub fn get_rlimit(resource: Resource) -> Result<Limits, PlatformError> {
    let raw = match resource {
        Resource::AddressSpace => libc::RLIMIT_AS,
        Resource::Core => libc::RLIMIT_CORE,
        Resource::Cpu => libc::RLIMIT_CPU,
        Resource::Data => libc::RLIMIT_DATA,
        Resource::FileSize => libc::RLIMIT_FSIZE,
        Resource::MemLock => libc::RLIMIT_MEMLOCK,
        Resource::NoFile => libc::RLIMIT_NOFILE,
        Resource::NProc => libc::RLIMIT_NPROC,
        Resource::Rss => libc::RLIMIT_RSS,
        Resource::Stack => libc::RLIMIT_STACK,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        Resource::Locks => libc::RLIMIT_LOCKS,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        Resource::MsgQueue => libc::RLIMIT_MSGQUEUE,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        Resource::Nice => libc::RLIMIT_NICE,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        Resource::RtPrio => libc::RLIMIT_RTPRIO,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        Resource::RtTime => libc::RLIMIT_RTTIME,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        Resource::SigPending => libc::RLIMIT_SIGPENDING,
    };

    let mut limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    #[allow(unsafe_code)]
    // SAFETY: `limit` is a valid, writable rlimit struct
    let rc = unsafe { libc::getrlimit(raw, &mut limit) };
    if rc != 0 {
        return Err(PlatformError::ProcessStateFailed {
            operation: format!("getrlimit({resource})"),
            message: std::io::Error::last_os_error().to_string(),
        });
    }

    let finite = |value: libc::rlim_t| (value != libc::RLIM_INFINITY).then_some(value as u64);
    Ok(Limits {
        soft: finite(limit.rlim_cur),
        hard: finite(limit.rlim_max),
    })
}

/// Format the limits of `resource` as `soft:hard`, using `infinity` for unlimited
///
/// # Errors
///
/// Returns an error if `getrlimit` fails.
pub fn format_rlimit(resource: Resource) -> Result<String, PlatformError> {
    Ok(get_rlimit(resource)?.to_string())
}
