//! Replaceable capability holder.
//!
//! Host objects expose entry points (fetch, the player's dispatcher, the config setter) through
//! a [`CapabilitySlot`]. Whoever calls the entry point reads the slot at call time, so replacing
//! the value in place is how a decorator gets installed without the caller noticing.

use parking_lot::RwLock;
use uuid::Uuid;

/// Stable identity of a slot, used as the idempotency key for patch installation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct SlotId(pub Uuid);

pub struct CapabilitySlot<T: Clone> {
    id: SlotId,
    value: RwLock<Option<T>>,
}

impl<T: Clone> CapabilitySlot<T> {
    pub fn new(value: T) -> Self {
        Self::from_option(Some(value))
    }

    pub fn empty() -> Self {
        Self::from_option(None)
    }

    pub fn from_option(value: Option<T>) -> Self {
        Self {
            id: SlotId(Uuid::new_v4()),
            value: RwLock::new(value),
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn get(&self) -> Option<T> {
        self.value.read().clone()
    }

    pub fn is_present(&self) -> bool {
        self.value.read().is_some()
    }

    /// Swap in a new value, returning the previous one.
    pub fn replace(&self, value: T) -> Option<T> {
        self.value.write().replace(value)
    }

    pub fn clear(&self) -> Option<T> {
        self.value.write().take()
    }
}

impl<T: Clone> Default for CapabilitySlot<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Clone> std::fmt::Debug for CapabilitySlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilitySlot")
            .field("id", &self.id)
            .field("present", &self.is_present())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn replace_swaps_value_and_keeps_identity() {
        let slot: CapabilitySlot<Arc<dyn Fn() -> u32 + Send + Sync>> =
            CapabilitySlot::new(Arc::new(|| 1));
        let id = slot.id();
        let original = slot.get().expect("present");
        slot.replace(Arc::new(move || original() + 1));
        assert_eq!(slot.get().expect("present")(), 2);
        assert_eq!(slot.id(), id);
    }

    #[test]
    fn empty_slot_reports_absence() {
        let slot: CapabilitySlot<u8> = CapabilitySlot::empty();
        assert!(!slot.is_present());
        assert!(slot.get().is_none());
        slot.replace(3);
        assert_eq!(slot.clear(), Some(3));
    }
}
