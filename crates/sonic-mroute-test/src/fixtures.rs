//! Test fixtures for common multicast routing scenarios

use std::net::Ipv4Addr;

use sonic_mroute::kernel::MrouteCodec;
use sonic_mroute::{Family, MrouteChannel, Outbound};
use sonic_mroute_types::{Interface, InterfaceFlags, InterfaceTable, SlotIndex};

use crate::{FakeKernel, FakeSysctl};

/// IFF_UP | IFF_BROADCAST | IFF_RUNNING | IFF_MULTICAST
pub const ETHERNET_FLAGS: u32 = 0x1043;
/// IFF_UP | IFF_LOOPBACK | IFF_RUNNING
pub const LOOPBACK_FLAGS: u32 = 0x49;

/// Up, multicast-capable ethernet interface
pub fn ethernet(ifindex: u32, name: &str) -> Interface {
    Interface::new(ifindex, name, InterfaceFlags::from_kernel(ETHERNET_FLAGS))
        .expect("valid interface name")
}

/// Ethernet interface with an IPv4 address
pub fn ethernet_with_addr(ifindex: u32, name: &str, addr: Ipv4Addr) -> Interface {
    ethernet(ifindex, name).with_inaddr(addr)
}

pub fn loopback(ifindex: u32) -> Interface {
    Interface::new(ifindex, "lo", InterfaceFlags::from_kernel(LOOPBACK_FLAGS))
        .expect("valid interface name")
        .with_inaddr(Ipv4Addr::LOCALHOST)
}

/// `eth0` (index 0), `lo` (index 1), `eth1` (index 2)
pub fn basic_interfaces() -> InterfaceTable {
    vec![
        ethernet_with_addr(0, "eth0", Ipv4Addr::new(10, 0, 0, 1)),
        loopback(1),
        ethernet_with_addr(2, "eth1", Ipv4Addr::new(10, 0, 1, 1)),
    ]
    .into_iter()
    .collect()
}

/// `count` ethernet interfaces `eth0..` with indices starting at 1
pub fn many_interfaces(count: u32) -> InterfaceTable {
    (0..count)
        .map(|i| ethernet(i + 1, &format!("eth{}", i)))
        .collect()
}

/// Outbound vector forwarding to `slots` with TTL threshold 1
pub fn outbound<F: Family>(slots: &[SlotIndex]) -> F::Outbound {
    let mut out = F::Outbound::default();
    for slot in slots {
        out.set(*slot, 1);
    }
    out
}

/// Channel wired to a fake kernel and fake sysctl
pub type FakeChannel<F> = MrouteChannel<F, FakeKernel<F>>;

/// Build a disabled channel over fresh fakes, returning handles to both
pub fn fake_channel<F: MrouteCodec>() -> (FakeChannel<F>, FakeKernel<F>, FakeSysctl) {
    let kernel = FakeKernel::<F>::new();
    let sysctl = FakeSysctl::new();
    let channel: FakeChannel<F> = MrouteChannel::new(kernel.clone()).with_sysctl(sysctl.clone());
    (channel, kernel, sysctl)
}
