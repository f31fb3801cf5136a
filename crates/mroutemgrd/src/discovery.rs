//! Interface discovery

#[cfg(target_os = "linux")]
mod linux {
    use std::collections::BTreeMap;
    use std::net::Ipv4Addr;

    use nix::ifaddrs::getifaddrs;
    use nix::net::if_::if_nametoindex;
    use sonic_mroute_types::{Interface, InterfaceFlags, InterfaceTable};
    use tracing::{debug, warn};

    use crate::error::{MroutemgrdError, Result};

    /// Enumerate local interfaces with their flags and first IPv4 address.
    pub fn discover_interfaces() -> Result<InterfaceTable> {
        let addrs = getifaddrs().map_err(|e| MroutemgrdError::Discovery(e.to_string()))?;

        let mut by_name: BTreeMap<String, Interface> = BTreeMap::new();
        for ifaddr in addrs {
            let inaddr = ifaddr
                .address
                .as_ref()
                .and_then(|addr| addr.as_sockaddr_in())
                .map(|sin| Ipv4Addr::from(sin.ip()));

            if let Some(iface) = by_name.get_mut(&ifaddr.interface_name) {
                if iface.inaddr.is_none() {
                    iface.inaddr = inaddr;
                }
                continue;
            }

            let ifindex = match if_nametoindex(ifaddr.interface_name.as_str()) {
                Ok(ifindex) => ifindex,
                Err(e) => {
                    warn!(interface = %ifaddr.interface_name, "Cannot resolve ifindex: {}", e);
                    continue;
                }
            };
            let flags = InterfaceFlags::from_kernel(ifaddr.flags.bits() as u32);
            let mut iface = match Interface::new(ifindex, ifaddr.interface_name.clone(), flags) {
                Ok(iface) => iface,
                Err(e) => {
                    warn!("Skipping interface: {}", e);
                    continue;
                }
            };
            iface.inaddr = inaddr;
            by_name.insert(ifaddr.interface_name, iface);
        }

        let table: InterfaceTable = by_name.into_values().collect();
        debug!(count = table.len(), "Discovered interfaces");
        Ok(table)
    }
}

#[cfg(target_os = "linux")]
pub use linux::*;

/// Mock implementation for non-Linux platforms (development only)
#[cfg(not(target_os = "linux"))]
mod mock {
    use sonic_mroute_types::InterfaceTable;

    use crate::error::Result;

    pub fn discover_interfaces() -> Result<InterfaceTable> {
        Ok(InterfaceTable::new())
    }
}

#[cfg(not(target_os = "linux"))]
pub use mock::*;
