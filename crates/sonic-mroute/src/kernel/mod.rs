//! Kernel multicast routing control channel.
//!
//! [`MrouteKernel`] opens a control socket for one address family and
//! [`KernelSocket`] issues the MRT control calls on it. Dropping the socket
//! closes it, which also releases the kernel's exclusive mroute lock.

pub mod codec;
mod socket;
pub mod sys;

use std::io;

use sonic_mroute_types::{Interface, SlotIndex};

use crate::family::Family;
use crate::route::Mroute;

pub use codec::MrouteCodec;
pub use socket::*;

/// An open multicast routing control socket.
pub trait KernelSocket<F: Family>: Send {
    /// Claim the family's multicast routing API (`MRT_INIT` / `MRT6_INIT`).
    fn init(&mut self) -> io::Result<()>;

    /// Give up the multicast routing API (`MRT_DONE` / `MRT6_DONE`).
    fn done(&mut self) -> io::Result<()>;

    /// Register `iface` as VIF/MIF `slot`.
    fn add_interface(&mut self, slot: SlotIndex, iface: &Interface) -> io::Result<()>;

    /// Install or update a forwarding cache entry.
    fn add_route(&mut self, route: &Mroute<F>) -> io::Result<()>;

    /// Remove the forwarding cache entry for the route's origin and group.
    fn del_route(&mut self, route: &Mroute<F>) -> io::Result<()>;
}

/// Opens control sockets for one address family.
pub trait MrouteKernel<F: Family>: Send {
    type Socket: KernelSocket<F>;

    fn open(&self) -> io::Result<Self::Socket>;
}
