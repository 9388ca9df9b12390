//! Entity implementation

use std::fmt;

/// Generational entity handle.
///
/// The index addresses a slot of the [`EntityStore`](super::EntityStore).
/// Slots are reused after an entity is destroyed, but every reuse bumps the
/// slot generation, so a stale handle never aliases the slot's new owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    /// Create an entity handle from its parts
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Handle to the first generation of slot `index`
    pub const fn from_raw(index: u32) -> Self {
        Self::new(index, 0)
    }

    /// Slot index, shared by every generation living in the slot
    pub const fn id(self) -> u32 {
        self.index
    }

    /// How many times the slot was freed before this entity got it
    pub const fn generation(self) -> u32 {
        self.generation
    }

    pub(crate) const fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}
