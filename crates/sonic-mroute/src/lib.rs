//! Static multicast routing control plane.
//!
//! Drives the Linux kernel multicast forwarding cache for IPv4 and IPv6:
//!
//! - [`vif`]: fixed-capacity VIF/MIF slot table
//! - [`channel`]: exclusive control channel lifecycle per family
//! - [`installer`]: stateless (S,G) install/remove
//! - [`registry`]: (*,G) templates and the (S,G) instances derived from them
//! - [`kernel`]: control socket traits, raw socket implementation, wire codec
//!
//! Both families share one implementation parameterised by [`Family`].

pub mod channel;
pub mod error;
pub mod family;
pub mod installer;
pub mod kernel;
pub mod registry;
pub mod route;
pub mod sysctl;
pub mod vif;

#[cfg(test)]
mod testing;

pub use channel::{ChannelState, MrouteChannel};
pub use error::{ErrnoClass, MrouteError, MrouteResult};
pub use family::{Family, Ipv4, Ipv6, MifSet, Outbound, TtlVector, MAX_MC_MIFS, MAX_MC_VIFS};
pub use kernel::{KernelSocket, MrouteKernel, RawMrouteKernel, RawMrouteSocket};
pub use registry::RouteRegistry;
pub use route::{Flow, Mroute};
pub use sysctl::{ProcSysctl, Sysctl};
pub use vif::{Slot, SlotTable};

/// IPv4 channel on the raw kernel socket
pub type Ipv4Channel = MrouteChannel<Ipv4, RawMrouteKernel<Ipv4>>;
/// IPv6 channel on the raw kernel socket
pub type Ipv6Channel = MrouteChannel<Ipv6, RawMrouteKernel<Ipv6>>;
