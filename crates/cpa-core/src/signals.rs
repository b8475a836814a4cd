//! Tri-state signal slots for one collection cycle.
//!
//! A `SignalSet` holds one slot per action type known at construction. Slots
//! start `Unset`; providers flip them to `Set(true)` or `Set(false)`. Reads
//! never block and never fail: an `Unset` slot reads as `false`. Completion
//! ("every slot non-unset") is what the accumulator races against its timer.

use std::collections::BTreeMap;

use tracing::warn;

use crate::types::ActionType;

// ---------------------------------------------------------------------------
// SignalState
// ---------------------------------------------------------------------------

/// Tri-state value of one signal slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalState {
    #[default]
    Unset,
    Set(bool),
}

impl SignalState {
    /// Read accessor semantics: `Unset` is treated as `false`.
    pub fn as_bool(self) -> bool {
        matches!(self, SignalState::Set(true))
    }

    pub fn is_set(self) -> bool {
        matches!(self, SignalState::Set(_))
    }
}

// ---------------------------------------------------------------------------
// SignalSet
// ---------------------------------------------------------------------------

/// Fixed-cardinality map from action type to tri-state signal value.
///
/// The slot set is fixed at construction; writes to a slot that was not
/// registered for this cycle are dropped with a warning rather than growing
/// the set.
#[derive(Debug, Clone)]
pub struct SignalSet {
    slots: BTreeMap<ActionType, SignalState>,
}

impl SignalSet {
    pub fn new(slots: impl IntoIterator<Item = ActionType>) -> Self {
        SignalSet {
            slots: slots.into_iter().map(|a| (a, SignalState::Unset)).collect(),
        }
    }

    /// Store `value` in the slot for `action`. Last write wins; overwriting
    /// an already-set slot is permitted. Writing does not by itself trigger
    /// any completion check.
    pub fn set(&mut self, action: ActionType, value: bool) {
        match self.slots.get_mut(&action) {
            Some(slot) => *slot = SignalState::Set(value),
            None => warn!(%action, "signal for unregistered action dropped"),
        }
    }

    /// Current value for `action`, with `Unset` defaulting to `false`.
    pub fn get(&self, action: ActionType) -> bool {
        self.slots.get(&action).copied().unwrap_or_default().as_bool()
    }

    pub fn state(&self, action: ActionType) -> SignalState {
        self.slots.get(&action).copied().unwrap_or_default()
    }

    /// `true` once every slot has been explicitly set.
    pub fn is_complete(&self) -> bool {
        self.slots.values().all(|s| s.is_set())
    }

    /// The action types this set was built with, in stable order.
    pub fn actions(&self) -> impl Iterator<Item = ActionType> + '_ {
        self.slots.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn two_slot_set() -> SignalSet {
        SignalSet::new([ActionType::PriceTracking, ActionType::ReaderMode])
    }

    #[test]
    fn unset_slots_read_false() {
        let set = two_slot_set();
        assert!(!set.get(ActionType::PriceTracking));
        assert!(!set.get(ActionType::ReaderMode));
        assert_eq!(set.state(ActionType::ReaderMode), SignalState::Unset);
    }

    #[test]
    fn complete_requires_every_slot_set() {
        let mut set = two_slot_set();
        assert!(!set.is_complete());
        set.set(ActionType::PriceTracking, true);
        assert!(!set.is_complete());
        set.set(ActionType::ReaderMode, false);
        assert!(set.is_complete());
    }

    #[test]
    fn explicit_false_counts_as_set() {
        let mut set = two_slot_set();
        set.set(ActionType::PriceTracking, false);
        assert!(!set.get(ActionType::PriceTracking));
        assert!(set.state(ActionType::PriceTracking).is_set());
    }

    #[test]
    fn last_write_wins() {
        let mut set = two_slot_set();
        set.set(ActionType::PriceTracking, true);
        set.set(ActionType::PriceTracking, false);
        assert!(!set.get(ActionType::PriceTracking));
    }

    #[test]
    fn unregistered_slot_write_is_dropped() {
        let mut set = two_slot_set();
        set.set(ActionType::Discounts, true);
        assert_eq!(set.len(), 2);
        assert!(!set.get(ActionType::Discounts));
    }
}
