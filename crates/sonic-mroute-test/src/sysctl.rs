//! Recording sysctl writer

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use sonic_mroute::Sysctl;

#[derive(Debug, Default)]
struct SysctlState {
    writes: Vec<(PathBuf, bool)>,
    fail: Option<i32>,
}

/// Fake [`Sysctl`]; clones share state.
#[derive(Debug, Clone, Default)]
pub struct FakeSysctl {
    state: Arc<Mutex<SysctlState>>,
}

impl FakeSysctl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every write with `errno`
    pub fn failing(errno: i32) -> Self {
        let sysctl = Self::default();
        sysctl.state.lock().fail = Some(errno);
        sysctl
    }

    /// Attempted writes, including failed ones
    pub fn writes(&self) -> Vec<(PathBuf, bool)> {
        self.state.lock().writes.clone()
    }
}

impl Sysctl for FakeSysctl {
    fn set_bool(&self, path: &Path, value: bool) -> io::Result<()> {
        let mut state = self.state.lock();
        state.writes.push((path.to_path_buf(), value));
        match state.fail {
            Some(errno) => Err(io::Error::from_raw_os_error(errno)),
            None => Ok(()),
        }
    }
}
