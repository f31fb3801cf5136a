//! Multicast route entries and unresolved flows.

use std::fmt;

use sonic_mroute_types::SlotIndex;

use crate::family::{Family, Outbound};

/// A multicast forwarding entry.
///
/// A missing or unspecified sender makes this a (*,G) wildcard, which the
/// kernel cannot install directly; it is kept as a template and matched
/// against new flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mroute<F: Family> {
    /// Source address, None (or the unspecified address) for any sender
    pub sender: Option<F::Addr>,
    /// Multicast group address
    pub group: F::Addr,
    /// VIF/MIF the traffic must arrive on
    pub inbound: SlotIndex,
    /// Where matching traffic is forwarded to
    pub outbound: F::Outbound,
}

impl<F: Family> Mroute<F> {
    /// Create a (*,G) template.
    pub fn wildcard(group: F::Addr, inbound: SlotIndex, outbound: F::Outbound) -> Self {
        Self {
            sender: None,
            group,
            inbound,
            outbound,
        }
    }

    /// Create an (S,G) route.
    pub fn concrete(
        sender: F::Addr,
        group: F::Addr,
        inbound: SlotIndex,
        outbound: F::Outbound,
    ) -> Self {
        Self {
            sender: Some(sender),
            group,
            inbound,
            outbound,
        }
    }

    #[inline]
    pub fn is_wildcard(&self) -> bool {
        self.sender.map_or(true, |sender| sender == F::UNSPECIFIED)
    }

    /// Source address as the kernel sees it (unspecified for wildcards).
    pub fn origin(&self) -> F::Addr {
        self.sender.unwrap_or(F::UNSPECIFIED)
    }

    /// Template match key: same group arriving on the same interface.
    #[inline]
    pub fn matches(&self, group: &F::Addr, inbound: SlotIndex) -> bool {
        self.group == *group && self.inbound == inbound
    }
}

impl<F: Family> fmt::Display for Mroute<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sender {
            Some(sender) if !self.is_wildcard() => write!(f, "({}, {})", sender, self.group)?,
            _ => write!(f, "(*, {})", self.group)?,
        }
        write!(f, " inbound {} {}", F::SLOT_KIND, self.inbound)?;
        let slots = self.outbound.slots();
        if !slots.is_empty() {
            let outbound: Vec<String> = slots.iter().map(|s| s.to_string()).collect();
            write!(f, " outbound [{}]", outbound.join(","))?;
        }
        Ok(())
    }
}

/// A packet the kernel could not forward because no MFC entry matched
/// (IGMPMSG_NOCACHE / MRT6MSG_NOCACHE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Flow<F: Family> {
    pub sender: F::Addr,
    pub group: F::Addr,
    pub inbound: SlotIndex,
}

impl<F: Family> Flow<F> {
    pub fn new(sender: F::Addr, group: F::Addr, inbound: SlotIndex) -> Self {
        Self {
            sender,
            group,
            inbound,
        }
    }

    /// Concrete route for this flow using a template's outbound vector.
    pub fn to_route(&self, outbound: F::Outbound) -> Mroute<F> {
        Mroute::concrete(self.sender, self.group, self.inbound, outbound)
    }
}

impl<F: Family> fmt::Display for Flow<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}) inbound {} {}",
            self.sender,
            self.group,
            F::SLOT_KIND,
            self.inbound
        )
    }
}
