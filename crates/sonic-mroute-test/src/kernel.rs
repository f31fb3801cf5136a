//! In-memory kernel multicast routing API
//!
//! `FakeKernel` records every control call, keeps a model of the kernel
//! forwarding cache and lets tests inject errno failures per call.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use sonic_mroute::kernel::MrouteCodec;
use sonic_mroute::{Family, KernelSocket, Mroute, MrouteKernel};
use sonic_mroute_types::{Interface, SlotIndex};
use tracing::trace;

/// A control call observed by the fake kernel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelCall<F: Family> {
    Open,
    Init,
    Done,
    /// Socket dropped
    Close,
    AddInterface { slot: SlotIndex, ifindex: u32, name: String },
    AddRoute(Mroute<F>),
    DelRoute(Mroute<F>),
}

#[derive(Debug)]
struct FakeState<F: Family> {
    calls: Vec<KernelCall<F>>,
    /// Kernel MFC model, keyed by (origin, group)
    mfc: Vec<Mroute<F>>,
    /// Registered VIF/MIF slots
    interfaces: HashMap<SlotIndex, u32>,
    open_sockets: usize,
    fail_open: Option<i32>,
    fail_init: Option<i32>,
    fail_done: Option<i32>,
    fail_add_route: Option<i32>,
    fail_add_interface: HashMap<String, i32>,
}

impl<F: Family> Default for FakeState<F> {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            mfc: Vec::new(),
            interfaces: HashMap::new(),
            open_sockets: 0,
            fail_open: None,
            fail_init: None,
            fail_done: None,
            fail_add_route: None,
            fail_add_interface: HashMap::new(),
        }
    }
}

fn errno(errno: Option<i32>) -> io::Result<()> {
    match errno {
        Some(errno) => Err(io::Error::from_raw_os_error(errno)),
        None => Ok(()),
    }
}

/// Fake [`MrouteKernel`]; clones share state.
#[derive(Debug, Clone)]
pub struct FakeKernel<F: Family> {
    state: Arc<Mutex<FakeState<F>>>,
}

impl<F: Family> Default for FakeKernel<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Family> FakeKernel<F> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
        }
    }

    /// Fail `open()` with `errno`
    pub fn fail_open(&self, errno: i32) -> &Self {
        self.state.lock().fail_open = Some(errno);
        self
    }

    /// Fail INIT with `errno`
    pub fn fail_init(&self, errno: i32) -> &Self {
        self.state.lock().fail_init = Some(errno);
        self
    }

    /// Fail DONE with `errno`
    pub fn fail_done(&self, errno: i32) -> &Self {
        self.state.lock().fail_done = Some(errno);
        self
    }

    /// Fail every route add with `errno`, or stop failing with `None`
    pub fn fail_add_route(&self, errno: Option<i32>) -> &Self {
        self.state.lock().fail_add_route = errno;
        self
    }

    /// Fail registering the interface called `name`
    pub fn fail_add_interface(&self, name: impl Into<String>, errno: i32) -> &Self {
        self.state.lock().fail_add_interface.insert(name.into(), errno);
        self
    }

    /// Clear injected failures
    pub fn heal(&self) -> &Self {
        let mut state = self.state.lock();
        state.fail_open = None;
        state.fail_init = None;
        state.fail_done = None;
        state.fail_add_route = None;
        state.fail_add_interface.clear();
        self
    }

    pub fn calls(&self) -> Vec<KernelCall<F>> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Routes added since the last `clear_calls`
    pub fn added_routes(&self) -> Vec<Mroute<F>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                KernelCall::AddRoute(route) => Some(route),
                _ => None,
            })
            .collect()
    }

    /// Routes deleted since the last `clear_calls`
    pub fn deleted_routes(&self) -> Vec<Mroute<F>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                KernelCall::DelRoute(route) => Some(route),
                _ => None,
            })
            .collect()
    }

    /// Current kernel MFC contents
    pub fn mfc(&self) -> Vec<Mroute<F>> {
        self.state.lock().mfc.clone()
    }

    /// Registered slots and the ifindex behind each
    pub fn registered_interfaces(&self) -> Vec<(SlotIndex, u32)> {
        let mut slots: Vec<_> = self
            .state
            .lock()
            .interfaces
            .iter()
            .map(|(slot, ifindex)| (*slot, *ifindex))
            .collect();
        slots.sort_unstable();
        slots
    }

    pub fn open_sockets(&self) -> usize {
        self.state.lock().open_sockets
    }
}

impl<F: MrouteCodec> MrouteKernel<F> for FakeKernel<F> {
    type Socket = FakeSocket<F>;

    fn open(&self) -> io::Result<FakeSocket<F>> {
        let mut state = self.state.lock();
        state.calls.push(KernelCall::Open);
        errno(state.fail_open)?;
        state.open_sockets += 1;
        trace!(family = F::NAME, "Fake mroute socket opened");
        Ok(FakeSocket {
            state: Arc::clone(&self.state),
        })
    }
}

/// Socket handed out by [`FakeKernel`]
#[derive(Debug)]
pub struct FakeSocket<F: Family> {
    state: Arc<Mutex<FakeState<F>>>,
}

impl<F: MrouteCodec> KernelSocket<F> for FakeSocket<F> {
    fn init(&mut self) -> io::Result<()> {
        let mut state = self.state.lock();
        state.calls.push(KernelCall::Init);
        errno(state.fail_init)
    }

    fn done(&mut self) -> io::Result<()> {
        let mut state = self.state.lock();
        state.calls.push(KernelCall::Done);
        errno(state.fail_done)
    }

    fn add_interface(&mut self, slot: SlotIndex, iface: &Interface) -> io::Result<()> {
        let mut state = self.state.lock();
        state.calls.push(KernelCall::AddInterface {
            slot,
            ifindex: iface.ifindex,
            name: iface.name.clone(),
        });
        // Same argument checks as the real socket
        F::encode_slot(slot, iface)?;
        errno(state.fail_add_interface.get(&iface.name).copied())?;
        state.interfaces.insert(slot, iface.ifindex);
        Ok(())
    }

    fn add_route(&mut self, route: &Mroute<F>) -> io::Result<()> {
        let mut state = self.state.lock();
        state.calls.push(KernelCall::AddRoute(route.clone()));
        errno(state.fail_add_route)?;
        let key = (route.origin(), route.group);
        let existing = state.mfc.iter().position(|r| (r.origin(), r.group) == key);
        match existing {
            Some(pos) => state.mfc[pos] = route.clone(),
            None => state.mfc.push(route.clone()),
        }
        Ok(())
    }

    fn del_route(&mut self, route: &Mroute<F>) -> io::Result<()> {
        let mut state = self.state.lock();
        state.calls.push(KernelCall::DelRoute(route.clone()));
        let key = (route.origin(), route.group);
        let before = state.mfc.len();
        state.mfc.retain(|r| (r.origin(), r.group) != key);
        if state.mfc.len() == before {
            return errno(Some(libc::ENOENT));
        }
        Ok(())
    }
}

impl<F: Family> Drop for FakeSocket<F> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.calls.push(KernelCall::Close);
        state.open_sockets = state.open_sockets.saturating_sub(1);
        // Closing the socket flushes the kernel tables
        state.mfc.clear();
        state.interfaces.clear();
    }
}
