//! Common types for the SONiC static multicast routing control plane.
//!
//! This crate provides type-safe representations of the primitives shared by
//! the mroute core and the daemon that drives it:
//!
//! - [`GroupAddress`]: a validated IPv4/IPv6 multicast group address
//! - [`SourceAddress`]: a route sender, either a host or the `*` wildcard
//! - [`Interface`] / [`InterfaceTable`]: the interface view the core annotates
//!   with VIF/MIF slot assignments
//! - [`SlotIndex`]: the kernel's small-integer VIF/MIF handle

mod interface;
mod ip;

pub use interface::{Interface, InterfaceFlags, InterfaceTable, SlotIndex};
pub use ip::{GroupAddress, SourceAddress};

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("not a multicast group address: {0}")]
    NotMulticast(String),

    #[error("source {source_addr} and group {group} belong to different address families")]
    FamilyMismatch { source_addr: String, group: String },

    #[error("invalid interface name: {0:?}")]
    InvalidInterfaceName(String),
}
