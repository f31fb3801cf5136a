//! Error types for multicast routing operations.
//!
//! Every kernel failure is classified into an [`ErrnoClass`] so callers can
//! tell a busy control channel from a missing feature or a transient
//! resource shortage without poking at raw errno values.

use std::fmt;
use std::io;

use sonic_mroute_types::SlotIndex;
use thiserror::Error;

/// Result type alias for mroute operations.
pub type MrouteResult<T> = Result<T, MrouteError>;

/// OS error classification for kernel control calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrnoClass {
    /// EADDRINUSE - another process owns the mroute control channel
    AddrInUse,
    /// EOPNOTSUPP - socket option not understood
    NotSupported,
    /// ENOPROTOOPT / EPROTONOSUPPORT - kernel built without mroute support
    ProtoNotAvailable,
    /// ENOBUFS / ENOMEM / ENFILE - out of kernel resources
    OutOfResources,
    /// ENOENT - no such forwarding entry
    NoEntry,
    /// EACCES / EPERM
    PermissionDenied,
    /// Anything else, with the raw errno (0 if the OS gave none)
    Other(i32),
}

impl ErrnoClass {
    /// Classify a raw errno value.
    pub fn from_errno(errno: i32) -> Self {
        match errno {
            libc::EADDRINUSE => ErrnoClass::AddrInUse,
            libc::EOPNOTSUPP => ErrnoClass::NotSupported,
            libc::ENOPROTOOPT | libc::EPROTONOSUPPORT | libc::EAFNOSUPPORT => {
                ErrnoClass::ProtoNotAvailable
            }
            libc::ENOBUFS | libc::ENOMEM | libc::ENFILE | libc::EMFILE => {
                ErrnoClass::OutOfResources
            }
            libc::ENOENT => ErrnoClass::NoEntry,
            libc::EACCES | libc::EPERM => ErrnoClass::PermissionDenied,
            other => ErrnoClass::Other(other),
        }
    }

    /// Classify an I/O error, falling back to its kind when no errno is attached.
    pub fn from_io(err: &io::Error) -> Self {
        if let Some(errno) = err.raw_os_error() {
            return Self::from_errno(errno);
        }
        match err.kind() {
            io::ErrorKind::PermissionDenied => ErrnoClass::PermissionDenied,
            io::ErrorKind::NotFound => ErrnoClass::NoEntry,
            io::ErrorKind::AddrInUse => ErrnoClass::AddrInUse,
            io::ErrorKind::Unsupported => ErrnoClass::NotSupported,
            io::ErrorKind::OutOfMemory => ErrnoClass::OutOfResources,
            _ => ErrnoClass::Other(0),
        }
    }
}

impl fmt::Display for ErrnoClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrnoClass::AddrInUse => f.write_str("EADDRINUSE"),
            ErrnoClass::NotSupported => f.write_str("EOPNOTSUPP"),
            ErrnoClass::ProtoNotAvailable => f.write_str("ENOPROTOOPT"),
            ErrnoClass::OutOfResources => f.write_str("ENOBUFS"),
            ErrnoClass::NoEntry => f.write_str("ENOENT"),
            ErrnoClass::PermissionDenied => f.write_str("EACCES"),
            ErrnoClass::Other(errno) => write!(f, "errno {}", errno),
        }
    }
}

/// Errors that can occur while driving the kernel multicast routing API.
#[derive(Debug, Error)]
pub enum MrouteError {
    /// Kernel has no multicast routing support for this family.
    #[error("Kernel does not support {family} multicast routing")]
    Unavailable { family: &'static str },

    /// Another process holds the control channel.
    #[error("{family} multicast routing API already in use")]
    AlreadyOwned { family: &'static str },

    /// Kernel rejected the INIT socket option as unknown.
    #[error("Unknown socket option {op}")]
    NotSupported { family: &'static str, op: &'static str },

    /// No free VIF/MIF slot left for an interface.
    #[error("Out of {kind} space for interface {interface}")]
    CapacityExceeded {
        family: &'static str,
        /// "VIF" or "MIF"
        kind: &'static str,
        interface: String,
    },

    /// A kernel control call failed.
    #[error("{op} failed ({errno}): {source}")]
    Kernel {
        family: &'static str,
        op: &'static str,
        errno: ErrnoClass,
        #[source]
        source: io::Error,
    },

    /// Dynamic flow resolution found no (*,G) template.
    #[error("No (*,G) match for group {group} inbound {inbound}")]
    NoMatchingTemplate { group: String, inbound: SlotIndex },

    /// Unexpected failure while claiming the control channel.
    #[error("Failed initializing {family} multicast routing API: {op}: {source}")]
    Fatal {
        family: &'static str,
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// Route operation issued on a disabled channel.
    #[error("{family} multicast routing is not enabled")]
    NotEnabled { family: &'static str },

    /// Second enable on an enabled channel.
    #[error("{family} multicast routing is already enabled")]
    AlreadyEnabled { family: &'static str },
}

impl MrouteError {
    /// Creates a kernel call error, classifying the OS error.
    pub fn kernel(family: &'static str, op: &'static str, source: io::Error) -> Self {
        Self::Kernel {
            family,
            op,
            errno: ErrnoClass::from_io(&source),
            source,
        }
    }

    /// Creates a no-matching-template error.
    pub fn no_matching_template(group: impl fmt::Display, inbound: SlotIndex) -> Self {
        Self::NoMatchingTemplate {
            group: group.to_string(),
            inbound,
        }
    }

    /// Returns true if the owning channel must abort initialization.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MrouteError::Fatal { .. })
    }

    /// Returns true if the same call may succeed later without any
    /// configuration change. The core itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MrouteError::Kernel {
                errno: ErrnoClass::OutOfResources,
                ..
            }
        )
    }

    /// OS error class behind this error, if any.
    pub fn errno_class(&self) -> Option<ErrnoClass> {
        match self {
            MrouteError::Unavailable { .. } => Some(ErrnoClass::ProtoNotAvailable),
            MrouteError::AlreadyOwned { .. } => Some(ErrnoClass::AddrInUse),
            MrouteError::NotSupported { .. } => Some(ErrnoClass::NotSupported),
            MrouteError::CapacityExceeded { .. } => Some(ErrnoClass::OutOfResources),
            MrouteError::Kernel { errno, .. } => Some(*errno),
            MrouteError::NoMatchingTemplate { .. } => Some(ErrnoClass::NoEntry),
            MrouteError::Fatal { source, .. } => Some(ErrnoClass::from_io(source)),
            MrouteError::NotEnabled { .. } | MrouteError::AlreadyEnabled { .. } => None,
        }
    }
}
