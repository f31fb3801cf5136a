//! Kernel tunables written through `/proc/sys`.

use std::fs;
use std::io;
use std::path::Path;

/// Writes boolean kernel tunables.
pub trait Sysctl: Send + Sync {
    fn set_bool(&self, path: &Path, value: bool) -> io::Result<()>;
}

/// [`Sysctl`] backed by the proc filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcSysctl;

impl Sysctl for ProcSysctl {
    fn set_bool(&self, path: &Path, value: bool) -> io::Result<()> {
        fs::write(path, if value { "1" } else { "0" })
    }
}
