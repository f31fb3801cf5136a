//! Multicast group and source address types with safe parsing.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// A multicast group address (224.0.0.0/4 or ff00::/8).
///
/// Construction always validates the multicast range, so holders of a
/// `GroupAddress` never need to re-check it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GroupAddress(IpAddr);

impl GroupAddress {
    /// Wraps `addr` if it is a multicast address.
    pub fn new(addr: IpAddr) -> Result<Self, ParseError> {
        if addr.is_multicast() {
            Ok(GroupAddress(addr))
        } else {
            Err(ParseError::NotMulticast(addr.to_string()))
        }
    }

    pub const fn inner(&self) -> IpAddr {
        self.0
    }

    pub const fn is_ipv4(&self) -> bool {
        self.0.is_ipv4()
    }

    pub const fn is_ipv6(&self) -> bool {
        self.0.is_ipv6()
    }
}

impl fmt::Display for GroupAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for GroupAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let addr = s
            .parse::<IpAddr>()
            .map_err(|_| ParseError::InvalidIpAddress(s.to_string()))?;
        GroupAddress::new(addr)
    }
}

impl TryFrom<String> for GroupAddress {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<GroupAddress> for String {
    fn from(group: GroupAddress) -> Self {
        group.to_string()
    }
}

impl From<GroupAddress> for IpAddr {
    fn from(group: GroupAddress) -> Self {
        group.0
    }
}

/// The sender half of a multicast route.
///
/// `Any` is the (*,G) wildcard. It is written `*` in configuration; the
/// unspecified address (`0.0.0.0` / `::`) is accepted as an alias, which is
/// how the kernel itself spells "any sender".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SourceAddress {
    Any,
    Host(IpAddr),
}

impl SourceAddress {
    pub const fn is_any(&self) -> bool {
        matches!(self, SourceAddress::Any)
    }

    /// Returns the host address, or None for the wildcard.
    pub const fn host(&self) -> Option<IpAddr> {
        match self {
            SourceAddress::Any => None,
            SourceAddress::Host(addr) => Some(*addr),
        }
    }

    /// Checks that a host source is in the same family as `group`.
    ///
    /// The wildcard matches either family.
    pub fn check_family(&self, group: &GroupAddress) -> Result<(), ParseError> {
        match self {
            SourceAddress::Host(addr) if addr.is_ipv4() != group.is_ipv4() => {
                Err(ParseError::FamilyMismatch {
                    source_addr: addr.to_string(),
                    group: group.to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for SourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceAddress::Any => f.write_str("*"),
            SourceAddress::Host(addr) => addr.fmt(f),
        }
    }
}

impl FromStr for SourceAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "*" {
            return Ok(SourceAddress::Any);
        }
        let addr = s
            .parse::<IpAddr>()
            .map_err(|_| ParseError::InvalidIpAddress(s.to_string()))?;
        if addr.is_unspecified() {
            Ok(SourceAddress::Any)
        } else {
            Ok(SourceAddress::Host(addr))
        }
    }
}

impl TryFrom<String> for SourceAddress {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SourceAddress> for String {
    fn from(source: SourceAddress) -> Self {
        source.to_string()
    }
}

impl From<IpAddr> for SourceAddress {
    fn from(addr: IpAddr) -> Self {
        if addr.is_unspecified() {
            SourceAddress::Any
        } else {
            SourceAddress::Host(addr)
        }
    }
}
