//! Kernel multicast routing ABI (`linux/mroute.h`, `linux/mroute6.h`).
//!
//! The layouts here are plain-Rust mirrors of the kernel structures so they
//! can be inspected in tests on any platform; only the socket layer hands
//! them to `setsockopt`.

use std::mem::size_of;

/// `MAXVIFS` from `linux/mroute.h`
pub const MAXVIFS: usize = 32;
/// `MAXMIFS` from `linux/mroute6.h`
pub const MAXMIFS: usize = 32;

/// `IF_SETSIZE` from `linux/mroute6.h`
pub const IF_SETSIZE: usize = 256;
/// Bits per `if_mask` word
pub const NIFBITS: usize = u32::BITS as usize;

// MRT_BASE (IPv4) and MRT6_BASE (IPv6) are both 200
pub const MRT_INIT: i32 = 200;
pub const MRT_DONE: i32 = 201;
pub const MRT_ADD_VIF: i32 = 202;
pub const MRT_ADD_MFC: i32 = 204;
pub const MRT_DEL_MFC: i32 = 205;

pub const MRT6_INIT: i32 = 200;
pub const MRT6_DONE: i32 = 201;
pub const MRT6_ADD_MIF: i32 = 202;
pub const MRT6_ADD_MFC: i32 = 204;
pub const MRT6_DEL_MFC: i32 = 205;

/// `struct in_addr`, address in network byte order.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InAddr {
    pub s_addr: u32,
}

impl From<std::net::Ipv4Addr> for InAddr {
    fn from(addr: std::net::Ipv4Addr) -> Self {
        Self {
            s_addr: u32::from_ne_bytes(addr.octets()),
        }
    }
}

/// `struct sockaddr_in6`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SockAddrIn6 {
    pub sin6_family: u16,
    pub sin6_port: u16,
    pub sin6_flowinfo: u32,
    pub sin6_addr: [u8; 16],
    pub sin6_scope_id: u32,
}

/// `struct vifctl` (MRT_ADD_VIF)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VifCtl {
    pub vifc_vifi: u16,
    pub vifc_flags: u8,
    pub vifc_threshold: u8,
    pub vifc_rate_limit: u32,
    /// Union with `vifc_lcl_ifindex`; only the address form is used
    pub vifc_lcl_addr: InAddr,
    pub vifc_rmt_addr: InAddr,
}

/// `struct mfcctl` (MRT_ADD_MFC / MRT_DEL_MFC)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MfcCtl {
    pub mfcc_origin: InAddr,
    pub mfcc_mcastgrp: InAddr,
    pub mfcc_parent: u16,
    pub mfcc_ttls: [u8; MAXVIFS],
    pub mfcc_pkt_cnt: u32,
    pub mfcc_byte_cnt: u32,
    pub mfcc_wrong_if: u32,
    pub mfcc_expire: i32,
}

/// `struct mif6ctl` (MRT6_ADD_MIF)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mif6Ctl {
    pub mif6c_mifi: u16,
    pub mif6c_flags: u8,
    pub vifc_threshold: u8,
    /// Physical interface index
    pub mif6c_pifi: u16,
    pub vifc_rate_limit: u32,
}

/// `struct if_set`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IfSet {
    pub ifs_bits: [u32; IF_SETSIZE / NIFBITS],
}

impl IfSet {
    /// `IF_SET(n, p)`
    pub fn set(&mut self, n: usize) {
        if let Some(word) = self.ifs_bits.get_mut(n / NIFBITS) {
            *word |= 1u32 << (n % NIFBITS);
        }
    }

    /// `IF_ISSET(n, p)`
    pub fn is_set(&self, n: usize) -> bool {
        self.ifs_bits
            .get(n / NIFBITS)
            .is_some_and(|word| word & (1u32 << (n % NIFBITS)) != 0)
    }
}

/// `struct mf6cctl` (MRT6_ADD_MFC / MRT6_DEL_MFC)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mf6cCtl {
    pub mf6cc_origin: SockAddrIn6,
    pub mf6cc_mcastgrp: SockAddrIn6,
    pub mf6cc_parent: u16,
    pub mf6cc_ifset: IfSet,
}

const _: () = assert!(size_of::<InAddr>() == 4);
const _: () = assert!(size_of::<SockAddrIn6>() == 28);
const _: () = assert!(size_of::<VifCtl>() == 16);
const _: () = assert!(size_of::<MfcCtl>() == 60);
const _: () = assert!(size_of::<Mif6Ctl>() == 12);
const _: () = assert!(size_of::<Mf6cCtl>() == 92);
