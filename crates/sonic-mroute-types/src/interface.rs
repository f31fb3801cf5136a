//! Interface view shared between interface discovery and the mroute core.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Kernel VIF/MIF number (`vifi_t` / `mifi_t` are both `unsigned short`).
pub type SlotIndex = u16;

/// Maximum interface name length accepted by the kernel (IFNAMSIZ - 1).
const MAX_IFNAME_LEN: usize = 15;

/// Interface flags relevant to multicast forwarding (IFF_* values).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceFlags {
    /// IFF_UP
    pub up: bool,
    /// IFF_LOOPBACK - never given a VIF/MIF
    pub loopback: bool,
    /// IFF_MULTICAST
    pub multicast: bool,
}

impl InterfaceFlags {
    const IFF_UP: u32 = 0x1;
    const IFF_LOOPBACK: u32 = 0x8;
    const IFF_MULTICAST: u32 = 0x1000;

    /// Parse from kernel IFF_* flags
    pub fn from_kernel(flags: u32) -> Self {
        Self {
            up: flags & Self::IFF_UP != 0,
            loopback: flags & Self::IFF_LOOPBACK != 0,
            multicast: flags & Self::IFF_MULTICAST != 0,
        }
    }

    /// Convert back to kernel IFF_* bits (only the bits tracked here)
    pub fn to_kernel(&self) -> u32 {
        let mut flags = 0;
        if self.up {
            flags |= Self::IFF_UP;
        }
        if self.loopback {
            flags |= Self::IFF_LOOPBACK;
        }
        if self.multicast {
            flags |= Self::IFF_MULTICAST;
        }
        flags
    }
}

/// A network interface as seen by the multicast routing core.
///
/// The core only ever writes `vif` and `mif`; everything else belongs to
/// whoever discovered the interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    /// Kernel interface index
    pub ifindex: u32,
    /// Interface name (e.g. "eth0")
    pub name: String,
    pub flags: InterfaceFlags,
    /// Primary IPv4 address, used as the VIF local address
    pub inaddr: Option<Ipv4Addr>,
    /// Assigned IPv4 VIF, if any
    pub vif: Option<SlotIndex>,
    /// Assigned IPv6 MIF, if any
    pub mif: Option<SlotIndex>,
}

impl Interface {
    /// Create an interface with no address and no slot assignments.
    pub fn new(ifindex: u32, name: impl Into<String>, flags: InterfaceFlags) -> Result<Self, ParseError> {
        let name = name.into();
        if name.is_empty() || name.len() > MAX_IFNAME_LEN || name.contains('/') {
            return Err(ParseError::InvalidInterfaceName(name));
        }
        Ok(Self {
            ifindex,
            name,
            flags,
            inaddr: None,
            vif: None,
            mif: None,
        })
    }

    /// Set the IPv4 address used when registering the VIF
    pub fn with_inaddr(mut self, addr: Ipv4Addr) -> Self {
        self.inaddr = Some(addr);
        self
    }

    #[inline]
    pub fn is_loopback(&self) -> bool {
        self.flags.loopback
    }
}

/// Ordered set of interfaces, iterated in ascending `ifindex` order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceTable {
    interfaces: Vec<Interface>,
}

impl InterfaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an interface, replacing any existing entry with the same index.
    pub fn insert(&mut self, iface: Interface) {
        match self
            .interfaces
            .binary_search_by_key(&iface.ifindex, |i| i.ifindex)
        {
            Ok(pos) => self.interfaces[pos] = iface,
            Err(pos) => self.interfaces.insert(pos, iface),
        }
    }

    pub fn get(&self, ifindex: u32) -> Option<&Interface> {
        self.interfaces
            .binary_search_by_key(&ifindex, |i| i.ifindex)
            .ok()
            .map(|pos| &self.interfaces[pos])
    }

    pub fn get_mut(&mut self, ifindex: u32) -> Option<&mut Interface> {
        self.interfaces
            .binary_search_by_key(&ifindex, |i| i.ifindex)
            .ok()
            .map(|pos| &mut self.interfaces[pos])
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interface> {
        self.interfaces.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Interface> {
        self.interfaces.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }
}

impl FromIterator<Interface> for InterfaceTable {
    fn from_iter<I: IntoIterator<Item = Interface>>(iter: I) -> Self {
        let mut table = InterfaceTable::new();
        for iface in iter {
            table.insert(iface);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn iface(ifindex: u32, name: &str) -> Interface {
        Interface::new(ifindex, name, InterfaceFlags::from_kernel(0x1001)).unwrap()
    }

    #[test]
    fn test_flags_from_kernel() {
        let flags = InterfaceFlags::from_kernel(0x1009);
        assert!(flags.up);
        assert!(flags.loopback);
        assert!(flags.multicast);
        assert_eq!(flags.to_kernel(), 0x1009);

        assert_eq!(InterfaceFlags::from_kernel(0), InterfaceFlags::default());
    }

    #[test]
    fn test_interface_name_validation() {
        assert!(Interface::new(1, "", InterfaceFlags::default()).is_err());
        assert!(Interface::new(1, "averyveryverylongname", InterfaceFlags::default()).is_err());
        assert!(Interface::new(1, "Ethernet0", InterfaceFlags::default()).is_ok());
    }

    #[test]
    fn test_table_keeps_index_order() {
        let table: InterfaceTable = vec![iface(3, "eth2"), iface(1, "eth0"), iface(2, "eth1")]
            .into_iter()
            .collect();

        let order: Vec<u32> = table.iter().map(|i| i.ifindex).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_table_insert_replaces() {
        let mut table = InterfaceTable::new();
        table.insert(iface(1, "eth0"));
        table.insert(iface(1, "eth9"));

        assert_eq!(table.len(), 1);
        assert_eq!(table.get(1).unwrap().name, "eth9");
    }

    #[test]
    fn test_table_lookup() {
        let mut table: InterfaceTable = vec![iface(1, "eth0"), iface(2, "eth1")]
            .into_iter()
            .collect();

        assert_eq!(table.find_by_name("eth1").map(|i| i.ifindex), Some(2));
        assert!(table.find_by_name("eth7").is_none());

        table.get_mut(2).unwrap().vif = Some(0);
        assert_eq!(table.get(2).unwrap().vif, Some(0));
        assert!(table.get(5).is_none());
    }
}
