//! Fixed-capacity VIF/MIF slot table.
//!
//! Slots are handed out lowest index first; the kernel identifies interfaces
//! in forwarding entries by these indices, so the order is observable.

use std::marker::PhantomData;

use sonic_mroute_types::{Interface, SlotIndex};
use tracing::debug;

use crate::error::{MrouteError, MrouteResult};
use crate::family::Family;

/// Interface bound to a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub ifindex: u32,
    pub name: String,
}

/// VIF (IPv4) or MIF (IPv6) table for one family.
#[derive(Debug, Clone)]
pub struct SlotTable<F: Family> {
    slots: Vec<Option<Slot>>,
    _family: PhantomData<fn() -> F>,
}

impl<F: Family> Default for SlotTable<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Family> SlotTable<F> {
    pub fn new() -> Self {
        Self {
            slots: vec![None; F::MAX_SLOTS],
            _family: PhantomData,
        }
    }

    /// Bind `iface` to the lowest free slot and record it on the interface.
    ///
    /// An interface that already holds a slot keeps it. When the table is
    /// full nothing is changed and `CapacityExceeded` is returned.
    pub fn allocate(&mut self, iface: &mut Interface) -> MrouteResult<SlotIndex> {
        if let Some(slot) = self.slot_of(iface.ifindex) {
            F::set_slot(iface, Some(slot));
            return Ok(slot);
        }

        let Some(free) = self.find_free() else {
            return Err(MrouteError::CapacityExceeded {
                family: F::NAME,
                kind: F::SLOT_KIND,
                interface: iface.name.clone(),
            });
        };

        self.slots[usize::from(free)] = Some(Slot {
            ifindex: iface.ifindex,
            name: iface.name.clone(),
        });
        F::set_slot(iface, Some(free));
        debug!(
            family = F::NAME,
            slot = free,
            interface = %iface.name,
            "Allocated {}",
            F::SLOT_KIND
        );
        Ok(free)
    }

    /// Unbind a slot, returning what was bound to it.
    pub fn release(&mut self, slot: SlotIndex) -> Option<Slot> {
        self.slots.get_mut(usize::from(slot)).and_then(Option::take)
    }

    /// Unbind every slot.
    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }

    pub fn get(&self, slot: SlotIndex) -> Option<&Slot> {
        self.slots.get(usize::from(slot)).and_then(Option::as_ref)
    }

    /// Slot bound to the interface with index `ifindex`.
    pub fn slot_of(&self, ifindex: u32) -> Option<SlotIndex> {
        self.iter()
            .find(|(_, slot)| slot.ifindex == ifindex)
            .map(|(index, _)| index)
    }

    /// Lowest unbound slot.
    pub fn find_free(&self) -> Option<SlotIndex> {
        self.slots
            .iter()
            .position(Option::is_none)
            .map(|pos| pos as SlotIndex)
    }

    /// Bound slots in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotIndex, &Slot)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(pos, slot)| slot.as_ref().map(|slot| (pos as SlotIndex, slot)))
    }

    /// Number of bound slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_full(&self) -> bool {
        self.find_free().is_none()
    }
}
