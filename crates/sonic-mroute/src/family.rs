//! Address family abstraction.
//!
//! The VIF table, control channel and route registry are written once and
//! instantiated for [`Ipv4`] and [`Ipv6`]. Everything that differs between
//! the two families (address type, outbound vector shape, slot capacity,
//! kernel option names) hangs off the [`Family`] trait; the kernel wire
//! layout lives separately in [`crate::kernel::codec`].

use std::fmt;
use std::hash::Hash;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use sonic_mroute_types::{Interface, SlotIndex};

use crate::kernel::sys;

/// Number of IPv4 VIF slots. Portability contract: must equal the kernel's
/// `MAXVIFS` from `linux/mroute.h`.
pub const MAX_MC_VIFS: usize = 32;

/// Number of IPv6 MIF slots. Portability contract: must equal the kernel's
/// `MAXMIFS` from `linux/mroute6.h`.
pub const MAX_MC_MIFS: usize = 32;

const _: () = assert!(MAX_MC_VIFS == sys::MAXVIFS, "MAX_MC_VIFS must match kernel MAXVIFS");
const _: () = assert!(MAX_MC_MIFS == sys::MAXMIFS, "MAX_MC_MIFS must match kernel MAXMIFS");
const _: () = assert!(MAX_MC_MIFS <= u32::BITS as usize);
const _: () = assert!(MAX_MC_VIFS <= SlotIndex::MAX as usize);

/// Kernel control-call names, used for logging and error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelOps {
    pub init: &'static str,
    pub done: &'static str,
    pub add_slot: &'static str,
    pub add_mfc: &'static str,
    pub del_mfc: &'static str,
}

/// Per-outgoing-interface forwarding vector.
pub trait Outbound: Clone + PartialEq + Eq + fmt::Debug + Default + Send + Sync + 'static {
    /// Forward out of `slot`. `ttl` is the minimum packet TTL for families
    /// that support thresholds and is otherwise only tested for non-zero.
    /// Returns false if `slot` is out of range.
    fn set(&mut self, slot: SlotIndex, ttl: u8) -> bool;

    /// Returns true if packets are forwarded out of `slot`.
    fn contains(&self, slot: SlotIndex) -> bool;

    /// Outgoing slots in ascending order.
    fn slots(&self) -> Vec<SlotIndex>;

    fn is_empty(&self) -> bool {
        self.slots().is_empty()
    }
}

/// IPv4 outbound vector: a TTL threshold per VIF, 0 meaning "do not forward".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TtlVector([u8; MAX_MC_VIFS]);

impl TtlVector {
    pub fn ttls(&self) -> &[u8; MAX_MC_VIFS] {
        &self.0
    }

    pub fn ttl(&self, slot: SlotIndex) -> u8 {
        self.0.get(usize::from(slot)).copied().unwrap_or(0)
    }
}

impl Outbound for TtlVector {
    fn set(&mut self, slot: SlotIndex, ttl: u8) -> bool {
        match self.0.get_mut(usize::from(slot)) {
            Some(entry) => {
                *entry = ttl;
                true
            }
            None => false,
        }
    }

    fn contains(&self, slot: SlotIndex) -> bool {
        self.ttl(slot) > 0
    }

    fn slots(&self) -> Vec<SlotIndex> {
        (0..MAX_MC_VIFS as SlotIndex)
            .filter(|slot| self.contains(*slot))
            .collect()
    }
}

/// IPv6 outbound vector: one membership bit per MIF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MifSet(u32);

impl MifSet {
    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl Outbound for MifSet {
    fn set(&mut self, slot: SlotIndex, ttl: u8) -> bool {
        if usize::from(slot) >= MAX_MC_MIFS {
            return false;
        }
        if ttl > 0 {
            self.0 |= 1u32 << slot;
        } else {
            self.0 &= !(1u32 << slot);
        }
        true
    }

    fn contains(&self, slot: SlotIndex) -> bool {
        usize::from(slot) < MAX_MC_MIFS && self.0 & (1u32 << slot) != 0
    }

    fn slots(&self) -> Vec<SlotIndex> {
        (0..MAX_MC_MIFS as SlotIndex)
            .filter(|slot| self.contains(*slot))
            .collect()
    }
}

/// An address family the kernel can multicast-route.
pub trait Family:
    Clone + Copy + PartialEq + Eq + Hash + fmt::Debug + Send + Sync + 'static
{
    type Addr: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;
    type Outbound: Outbound;

    /// "IPv4" / "IPv6"
    const NAME: &'static str;
    /// "VIF" / "MIF"
    const SLOT_KIND: &'static str;
    const MAX_SLOTS: usize;
    /// Kernel spelling of "any sender"
    const UNSPECIFIED: Self::Addr;
    const OPS: KernelOps;
    /// System-wide multicast forwarding toggle to enable after INIT, if the
    /// kernel does not flip it on its own.
    const MC_FORWARDING_SYSCTL: Option<&'static str>;

    /// Slot this family assigned to `iface`.
    fn slot_of(iface: &Interface) -> Option<SlotIndex>;

    /// Record (or clear) this family's slot on `iface`.
    fn set_slot(iface: &mut Interface, slot: Option<SlotIndex>);

    /// Narrow a generic address to this family.
    fn from_ip(addr: IpAddr) -> Option<Self::Addr>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ipv4 {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ipv6 {}

impl Family for Ipv4 {
    type Addr = Ipv4Addr;
    type Outbound = TtlVector;

    const NAME: &'static str = "IPv4";
    const SLOT_KIND: &'static str = "VIF";
    const MAX_SLOTS: usize = MAX_MC_VIFS;
    const UNSPECIFIED: Ipv4Addr = Ipv4Addr::UNSPECIFIED;
    const OPS: KernelOps = KernelOps {
        init: "MRT_INIT",
        done: "MRT_DONE",
        add_slot: "MRT_ADD_VIF",
        add_mfc: "MRT_ADD_MFC",
        del_mfc: "MRT_DEL_MFC",
    };
    const MC_FORWARDING_SYSCTL: Option<&'static str> = None;

    fn slot_of(iface: &Interface) -> Option<SlotIndex> {
        iface.vif
    }

    fn set_slot(iface: &mut Interface, slot: Option<SlotIndex>) {
        iface.vif = slot;
    }

    fn from_ip(addr: IpAddr) -> Option<Ipv4Addr> {
        match addr {
            IpAddr::V4(addr) => Some(addr),
            IpAddr::V6(_) => None,
        }
    }
}

impl Family for Ipv6 {
    type Addr = Ipv6Addr;
    type Outbound = MifSet;

    const NAME: &'static str = "IPv6";
    const SLOT_KIND: &'static str = "MIF";
    const MAX_SLOTS: usize = MAX_MC_MIFS;
    const UNSPECIFIED: Ipv6Addr = Ipv6Addr::UNSPECIFIED;
    const OPS: KernelOps = KernelOps {
        init: "MRT6_INIT",
        done: "MRT6_DONE",
        add_slot: "MRT6_ADD_MIF",
        add_mfc: "MRT6_ADD_MFC",
        del_mfc: "MRT6_DEL_MFC",
    };
    // Pre-2.6.29 kernels do not set this on MRT6_INIT.
    const MC_FORWARDING_SYSCTL: Option<&'static str> =
        Some("/proc/sys/net/ipv6/conf/all/mc_forwarding");

    fn slot_of(iface: &Interface) -> Option<SlotIndex> {
        iface.mif
    }

    fn set_slot(iface: &mut Interface, slot: Option<SlotIndex>) {
        iface.mif = slot;
    }

    fn from_ip(addr: IpAddr) -> Option<Ipv6Addr> {
        match addr {
            IpAddr::V6(addr) => Some(addr),
            IpAddr::V4(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sonic_mroute_types::InterfaceFlags;

    #[test]
    fn test_ttl_vector() {
        let mut ttls = TtlVector::default();
        assert!(ttls.is_empty());

        assert!(ttls.set(1, 1));
        assert!(ttls.set(4, 64));
        assert!(!ttls.set(MAX_MC_VIFS as SlotIndex, 1));

        assert_eq!(ttls.slots(), vec![1, 4]);
        assert_eq!(ttls.ttl(4), 64);
        assert!(!ttls.contains(0));

        ttls.set(4, 0);
        assert_eq!(ttls.slots(), vec![1]);
    }

    #[test]
    fn test_mif_set() {
        let mut mifs = MifSet::default();
        assert!(mifs.set(0, 1));
        assert!(mifs.set(31, 200));
        assert!(!mifs.set(32, 1));

        assert_eq!(mifs.bits(), 0x8000_0001);
        assert_eq!(mifs.slots(), vec![0, 31]);

        mifs.set(0, 0);
        assert!(!mifs.contains(0));
        assert!(!mifs.contains(40));
    }

    #[test]
    fn test_family_slot_fields() {
        let mut iface = Interface::new(2, "eth0", InterfaceFlags::default()).unwrap();

        Ipv4::set_slot(&mut iface, Some(3));
        Ipv6::set_slot(&mut iface, Some(5));
        assert_eq!(Ipv4::slot_of(&iface), Some(3));
        assert_eq!(Ipv6::slot_of(&iface), Some(5));
        assert_eq!(iface.vif, Some(3));
        assert_eq!(iface.mif, Some(5));
    }

    #[test]
    fn test_from_ip() {
        let v4: IpAddr = "239.1.1.1".parse().unwrap();
        let v6: IpAddr = "ff0e::1".parse().unwrap();

        assert!(Ipv4::from_ip(v4).is_some());
        assert!(Ipv4::from_ip(v6).is_none());
        assert!(Ipv6::from_ip(v6).is_some());
        assert!(Ipv6::from_ip(v4).is_none());
    }
}
