//! Lazily computed value with explicit invalidation.
//!
//! `Unset` and `Computed(None)` are different states: the first means "never
//! computed or invalidated", the second means "computed, and the answer is none".

use parking_lot::RwLock;

/// State of a [`CacheCell`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cached<T> {
    Unset,
    Computed(T),
}

impl<T> Cached<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Cached::Unset)
    }

    pub fn computed(self) -> Option<T> {
        match self {
            Cached::Unset => None,
            Cached::Computed(value) => Some(value),
        }
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u64,
    state: Cached<T>,
}

/// Thread-safe cache cell.
///
/// Computation runs outside the lock. A value computed against a generation
/// that was invalidated meanwhile is returned to its caller but not stored.
#[derive(Debug)]
pub struct CacheCell<T> {
    slot: RwLock<Slot<T>>,
}

impl<T> Default for CacheCell<T> {
    fn default() -> Self {
        Self {
            slot: RwLock::new(Slot {
                generation: 0,
                state: Cached::Unset,
            }),
        }
    }
}

impl<T: Clone> CacheCell<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Cached<T> {
        self.slot.read().state.clone()
    }

    pub fn is_unset(&self) -> bool {
        self.slot.read().state.is_unset()
    }

    /// Value if computed
    pub fn peek(&self) -> Option<T> {
        self.state().computed()
    }

    pub fn get_or_compute(&self, compute: impl FnOnce() -> T) -> T {
        let generation = {
            let slot = self.slot.read();
            if let Cached::Computed(value) = &slot.state {
                return value.clone();
            }
            slot.generation
        };

        let value = compute();

        let mut slot = self.slot.write();
        match &slot.state {
            Cached::Computed(existing) => existing.clone(),
            Cached::Unset if slot.generation == generation => {
                slot.state = Cached::Computed(value.clone());
                value
            }
            Cached::Unset => value,
        }
    }

    pub fn set(&self, value: T) {
        let mut slot = self.slot.write();
        slot.state = Cached::Computed(value);
    }

    /// Back to `Unset`. Returns whether a computed value was dropped.
    pub fn invalidate(&self) -> bool {
        let mut slot = self.slot.write();
        slot.generation = slot.generation.wrapping_add(1);
        !std::mem::replace(&mut slot.state, Cached::Unset).is_unset()
    }

    /// Invalidate only when the current state satisfies `predicate`.
    pub fn invalidate_if(&self, predicate: impl FnOnce(&Cached<T>) -> bool) -> bool {
        let mut slot = self.slot.write();
        if predicate(&slot.state) {
            slot.generation = slot.generation.wrapping_add(1);
            slot.state = Cached::Unset;
            true
        } else {
            false
        }
    }
}
