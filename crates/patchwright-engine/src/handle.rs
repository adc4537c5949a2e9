//! Handles to host-owned objects.
//!
//! The engine only compares, stores and logs handles; what a handle points
//! at is up to the host. [`HandleAllocator`] is the slot map the in-memory
//! host uses: destroying an object bumps its slot's generation, so a handle
//! kept past a destroy never matches whatever reuses the slot.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reference to a template, a spawned instance, or a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle {
    slot: u32,
    generation: u32,
}

impl Handle {
    pub const fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.slot, self.generation)
    }
}

/// Generational slot map minting [`Handle`]s.
#[derive(Debug, Default)]
pub struct HandleAllocator {
    /// Current generation per slot, and whether the slot is handed out.
    slots: Vec<(u32, bool)>,
    vacant: Vec<u32>,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out a handle, preferring the most recently vacated slot.
    pub fn allocate(&mut self) -> Handle {
        match self.vacant.pop() {
            Some(slot) => {
                let entry = &mut self.slots[slot as usize];
                entry.1 = true;
                Handle::new(slot, entry.0)
            }
            None => {
                let slot = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
                self.slots.push((0, true));
                Handle::new(slot, 0)
            }
        }
    }

    /// Vacate `handle`'s slot. Stale or already released handles are ignored.
    pub fn release(&mut self, handle: Handle) -> bool {
        match self.slots.get_mut(handle.slot as usize) {
            Some((generation, live)) if *live && *generation == handle.generation => {
                *live = false;
                *generation = generation.wrapping_add(1);
                self.vacant.push(handle.slot);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reused_slot_never_matches_the_old_handle() {
        let mut handles = HandleAllocator::new();
        let a = handles.allocate();
        let b = handles.allocate();
        assert!(handles.release(a));

        let c = handles.allocate();
        assert_eq!(c, Handle::new(0, 1));
        assert_ne!(a, c);
        assert!(!handles.release(a));
        assert!(handles.release(b) && handles.release(c));
    }

    #[test]
    fn stale_release_is_ignored() {
        let mut handles = HandleAllocator::new();
        let a = handles.allocate();
        assert!(handles.release(a));
        assert!(!handles.release(a));
        let b = handles.allocate();
        assert!(!handles.release(a));
        assert_eq!(b.to_string(), "#0.1");
        assert!(handles.release(b));
    }
}
