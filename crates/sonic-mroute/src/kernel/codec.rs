//! Per-family encoding of routes and interface registrations into kernel
//! control structures.

use std::io;

use sonic_mroute_types::{Interface, SlotIndex};

use super::sys::{self, IfSet, InAddr, Mf6cCtl, MfcCtl, Mif6Ctl, SockAddrIn6, VifCtl};
use crate::family::{Family, Ipv4, Ipv6, Outbound};
use crate::route::Mroute;

/// Default VIF/MIF TTL threshold
pub const DEFAULT_THRESHOLD: u8 = 1;

/// Socket parameters and wire encoders for one address family.
pub trait MrouteCodec: Family {
    /// Interface registration structure (`vifctl` / `mif6ctl`)
    type SlotCtl: Copy;
    /// Forwarding cache structure (`mfcctl` / `mf6cctl`)
    type RouteCtl: Copy;

    /// Socket domain of the control socket
    const DOMAIN: i32;
    /// Raw socket protocol of the control socket
    const PROTOCOL: i32;
    /// `setsockopt` level for the MRT options
    const LEVEL: i32;

    const OPT_INIT: i32;
    const OPT_DONE: i32;
    const OPT_ADD_SLOT: i32;
    const OPT_ADD_MFC: i32;
    const OPT_DEL_MFC: i32;

    /// Fails with `EINVAL` if the interface does not fit the structure.
    fn encode_slot(slot: SlotIndex, iface: &Interface) -> io::Result<Self::SlotCtl>;

    /// Full route: origin, group, parent and outbound vector.
    fn encode_add(route: &Mroute<Self>) -> Self::RouteCtl;

    /// Minimal route: origin and group only.
    fn encode_del(route: &Mroute<Self>) -> Self::RouteCtl;
}

impl MrouteCodec for Ipv4 {
    type SlotCtl = VifCtl;
    type RouteCtl = MfcCtl;

    const DOMAIN: i32 = libc::AF_INET;
    const PROTOCOL: i32 = libc::IPPROTO_IGMP;
    const LEVEL: i32 = libc::IPPROTO_IP;

    const OPT_INIT: i32 = sys::MRT_INIT;
    const OPT_DONE: i32 = sys::MRT_DONE;
    const OPT_ADD_SLOT: i32 = sys::MRT_ADD_VIF;
    const OPT_ADD_MFC: i32 = sys::MRT_ADD_MFC;
    const OPT_DEL_MFC: i32 = sys::MRT_DEL_MFC;

    fn encode_slot(slot: SlotIndex, iface: &Interface) -> io::Result<VifCtl> {
        Ok(VifCtl {
            vifc_vifi: slot,
            vifc_flags: 0,
            vifc_threshold: DEFAULT_THRESHOLD,
            vifc_rate_limit: 0,
            vifc_lcl_addr: InAddr::from(iface.inaddr.unwrap_or(std::net::Ipv4Addr::UNSPECIFIED)),
            vifc_rmt_addr: InAddr::default(),
        })
    }

    fn encode_add(route: &Mroute<Ipv4>) -> MfcCtl {
        MfcCtl {
            mfcc_origin: InAddr::from(route.origin()),
            mfcc_mcastgrp: InAddr::from(route.group),
            mfcc_parent: route.inbound,
            mfcc_ttls: *route.outbound.ttls(),
            ..MfcCtl::default()
        }
    }

    fn encode_del(route: &Mroute<Ipv4>) -> MfcCtl {
        MfcCtl {
            mfcc_origin: InAddr::from(route.origin()),
            mfcc_mcastgrp: InAddr::from(route.group),
            ..MfcCtl::default()
        }
    }
}

fn sockaddr_in6(addr: std::net::Ipv6Addr) -> SockAddrIn6 {
    SockAddrIn6 {
        sin6_family: libc::AF_INET6 as u16,
        sin6_addr: addr.octets(),
        ..SockAddrIn6::default()
    }
}

impl MrouteCodec for Ipv6 {
    type SlotCtl = Mif6Ctl;
    type RouteCtl = Mf6cCtl;

    const DOMAIN: i32 = libc::AF_INET6;
    const PROTOCOL: i32 = libc::IPPROTO_ICMPV6;
    const LEVEL: i32 = libc::IPPROTO_IPV6;

    const OPT_INIT: i32 = sys::MRT6_INIT;
    const OPT_DONE: i32 = sys::MRT6_DONE;
    const OPT_ADD_SLOT: i32 = sys::MRT6_ADD_MIF;
    const OPT_ADD_MFC: i32 = sys::MRT6_ADD_MFC;
    const OPT_DEL_MFC: i32 = sys::MRT6_DEL_MFC;

    fn encode_slot(slot: SlotIndex, iface: &Interface) -> io::Result<Mif6Ctl> {
        // mif6c_pifi is 16 bits wide in the kernel ABI
        let pifi = u16::try_from(iface.ifindex)
            .map_err(|_| io::Error::from_raw_os_error(libc::EINVAL))?;
        Ok(Mif6Ctl {
            mif6c_mifi: slot,
            mif6c_flags: 0,
            vifc_threshold: DEFAULT_THRESHOLD,
            mif6c_pifi: pifi,
            vifc_rate_limit: 0,
        })
    }

    fn encode_add(route: &Mroute<Ipv6>) -> Mf6cCtl {
        let mut ifset = IfSet::default();
        for slot in route.outbound.slots() {
            ifset.set(usize::from(slot));
        }
        Mf6cCtl {
            mf6cc_origin: sockaddr_in6(route.origin()),
            mf6cc_mcastgrp: sockaddr_in6(route.group),
            mf6cc_parent: route.inbound,
            mf6cc_ifset: ifset,
        }
    }

    fn encode_del(route: &Mroute<Ipv6>) -> Mf6cCtl {
        Mf6cCtl {
            mf6cc_origin: sockaddr_in6(route.origin()),
            mf6cc_mcastgrp: sockaddr_in6(route.group),
            ..Mf6cCtl::default()
        }
    }
}
