//! Multicast routing control channel for one address family.

use std::io;
use std::path::{Path, PathBuf};

use sonic_mroute_types::InterfaceTable;
use tracing::{debug, info, instrument, warn};

use crate::error::{ErrnoClass, MrouteError, MrouteResult};
use crate::family::Family;
use crate::kernel::{KernelSocket, MrouteKernel};
use crate::registry::RouteRegistry;
use crate::route::{Flow, Mroute};
use crate::sysctl::{ProcSysctl, Sysctl};
use crate::vif::SlotTable;

/// Channel lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disabled,
    /// Socket claimed, interfaces being registered
    Enabling,
    Enabled,
}

/// Owns the kernel control socket, the VIF/MIF table and the route
/// registry for one family.
///
/// The kernel allows a single multicast routing daemon per family. The lock
/// is held by the open socket, so it is released on [`disable`] or drop.
///
/// [`disable`]: MrouteChannel::disable
pub struct MrouteChannel<F: Family, K: MrouteKernel<F>> {
    kernel: K,
    sysctl: Box<dyn Sysctl>,
    /// Where to switch on multicast forwarding after INIT
    mc_forwarding: Option<PathBuf>,
    state: ChannelState,
    socket: Option<K::Socket>,
    slots: SlotTable<F>,
    registry: RouteRegistry<F>,
}

impl<F: Family, K: MrouteKernel<F>> MrouteChannel<F, K> {
    pub fn new(kernel: K) -> Self {
        Self {
            kernel,
            sysctl: Box::new(ProcSysctl),
            mc_forwarding: F::MC_FORWARDING_SYSCTL.map(PathBuf::from),
            state: ChannelState::Disabled,
            socket: None,
            slots: SlotTable::new(),
            registry: RouteRegistry::new(),
        }
    }

    pub fn with_sysctl(mut self, sysctl: impl Sysctl + 'static) -> Self {
        self.sysctl = Box::new(sysctl);
        self
    }

    /// Override (or with `None`, skip) the multicast forwarding sysctl.
    pub fn with_mc_forwarding_path(mut self, path: Option<PathBuf>) -> Self {
        self.mc_forwarding = path;
        self
    }

    /// Claim the kernel multicast routing API and register every
    /// non-loopback interface as a VIF/MIF, in ascending ifindex order.
    ///
    /// Interfaces that cannot be registered are left without a slot; only
    /// failures to claim the API are returned.
    #[instrument(skip(self, interfaces), fields(family = F::NAME))]
    pub fn enable(&mut self, interfaces: &mut InterfaceTable) -> MrouteResult<()> {
        if self.state == ChannelState::Enabled {
            return Err(MrouteError::AlreadyEnabled { family: F::NAME });
        }

        self.state = ChannelState::Enabling;
        let mut socket = match self.claim() {
            Ok(socket) => socket,
            Err(e) => {
                self.state = ChannelState::Disabled;
                return Err(e);
            }
        };

        self.slots.reset();
        self.enable_forwarding();
        self.register_interfaces(&mut socket, interfaces);
        self.registry.clear();

        self.socket = Some(socket);
        self.state = ChannelState::Enabled;
        info!(
            family = F::NAME,
            slots = self.slots.len(),
            "{} multicast routing enabled",
            F::NAME
        );
        Ok(())
    }

    /// Open the control socket and issue INIT. The socket is closed on
    /// every error path.
    fn claim(&self) -> MrouteResult<K::Socket> {
        let mut socket = self.kernel.open().map_err(|e| {
            match ErrnoClass::from_io(&e) {
                ErrnoClass::ProtoNotAvailable => {
                    warn!(family = F::NAME, "Kernel does not support {} multicast routing", F::NAME);
                    MrouteError::Unavailable { family: F::NAME }
                }
                _ => MrouteError::Fatal {
                    family: F::NAME,
                    op: "socket",
                    source: e,
                },
            }
        })?;

        if let Err(e) = socket.init() {
            let errno = ErrnoClass::from_io(&e);
            drop(socket);
            return Err(match errno {
                ErrnoClass::AddrInUse => {
                    warn!(family = F::NAME, %errno, "{} multicast routing API already in use", F::NAME);
                    MrouteError::AlreadyOwned { family: F::NAME }
                }
                ErrnoClass::NotSupported => {
                    warn!(family = F::NAME, %errno, "Unknown socket option {}", F::OPS.init);
                    MrouteError::NotSupported {
                        family: F::NAME,
                        op: F::OPS.init,
                    }
                }
                _ => MrouteError::Fatal {
                    family: F::NAME,
                    op: F::OPS.init,
                    source: e,
                },
            });
        }

        Ok(socket)
    }

    fn enable_forwarding(&self) {
        let Some(path) = self.mc_forwarding.as_deref() else {
            return;
        };

        match self.sysctl.set_bool(path, true) {
            Ok(()) => debug!(family = F::NAME, path = %path.display(), "Enabled multicast forwarding"),
            // Unprivileged or read-only /proc; the kernel may have done it already
            Err(e) if e.raw_os_error() == Some(libc::EACCES) => {}
            Err(e) => log_sysctl_failure(path, &e),
        }
    }

    fn register_interfaces(&mut self, socket: &mut K::Socket, interfaces: &mut InterfaceTable) {
        for iface in interfaces.iter_mut() {
            if iface.is_loopback() {
                F::set_slot(iface, None);
                debug!(family = F::NAME, interface = %iface.name, "Skipping loopback");
                continue;
            }

            let slot = match self.slots.allocate(iface) {
                Ok(slot) => slot,
                Err(e) => {
                    F::set_slot(iface, None);
                    warn!(family = F::NAME, interface = %iface.name, "{}", e);
                    continue;
                }
            };

            if let Err(e) = socket.add_interface(slot, iface) {
                let errno = ErrnoClass::from_io(&e);
                warn!(
                    family = F::NAME,
                    interface = %iface.name,
                    slot,
                    %errno,
                    "{} failed for {}: {}",
                    F::OPS.add_slot,
                    iface.name,
                    e
                );
                self.slots.release(slot);
                F::set_slot(iface, None);
                continue;
            }

            info!(
                family = F::NAME,
                interface = %iface.name,
                slot,
                "Added {} {} for {}",
                F::SLOT_KIND,
                slot,
                iface.name
            );
        }
    }

    /// Release the kernel multicast routing API.
    ///
    /// Templates and instances are forgotten without removing them from
    /// the kernel; closing the socket flushes the kernel tables. Interface
    /// slot annotations are left for the next [`enable`] to overwrite.
    ///
    /// [`enable`]: MrouteChannel::enable
    #[instrument(skip(self), fields(family = F::NAME))]
    pub fn disable(&mut self) {
        let Some(mut socket) = self.socket.take() else {
            self.state = ChannelState::Disabled;
            return;
        };

        if let Err(e) = socket.done() {
            let errno = ErrnoClass::from_io(&e);
            warn!(family = F::NAME, %errno, "{} failed: {}", F::OPS.done, e);
        }
        drop(socket);

        self.registry.clear();
        self.slots.reset();
        self.state = ChannelState::Disabled;
        info!(family = F::NAME, "{} multicast routing disabled", F::NAME);
    }

    /// Add a route; see [`RouteRegistry::add`].
    pub fn add(&mut self, route: Mroute<F>) -> MrouteResult<()> {
        let socket = self
            .socket
            .as_mut()
            .ok_or(MrouteError::NotEnabled { family: F::NAME })?;
        self.registry.add(socket, route)
    }

    /// Remove a route; see [`RouteRegistry::remove`].
    pub fn remove(&mut self, route: &Mroute<F>) -> MrouteResult<()> {
        let socket = self
            .socket
            .as_mut()
            .ok_or(MrouteError::NotEnabled { family: F::NAME })?;
        self.registry.remove(socket, route)
    }

    /// Resolve an unforwarded flow; see [`RouteRegistry::resolve_dynamic`].
    pub fn resolve_dynamic(&mut self, flow: &Flow<F>) -> MrouteResult<()> {
        let socket = self
            .socket
            .as_mut()
            .ok_or(MrouteError::NotEnabled { family: F::NAME })?;
        self.registry.resolve_dynamic(socket, flow)
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state == ChannelState::Enabled
    }

    pub fn slots(&self) -> &SlotTable<F> {
        &self.slots
    }

    pub fn registry(&self) -> &RouteRegistry<F> {
        &self.registry
    }
}

impl<F: Family, K: MrouteKernel<F>> Drop for MrouteChannel<F, K> {
    fn drop(&mut self) {
        if self.socket.is_some() {
            self.disable();
        }
    }
}

fn log_sysctl_failure(path: &Path, err: &io::Error) {
    warn!(
        path = %path.display(),
        errno = %ErrnoClass::from_io(err),
        "Failed enabling multicast forwarding: {}",
        err
    );
}
