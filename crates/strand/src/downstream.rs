//! Downstream handles and the registry that owns downstream records.
//!
//! Ledgers and queues never own a downstream; they hold a [`DownstreamId`].
//! Handles are generational, so a handle kept after removal no longer
//! resolves even when its slot has been reused.

use std::fmt;

/// Generational index of a downstream in a [`Registry`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DownstreamId {
    pub index: u32,
    pub generation: u32,
}

impl DownstreamId {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl fmt::Display for DownstreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}v{}", self.index, self.generation)
    }
}

struct Slot<D> {
    generation: u32,
    value: Option<D>,
}

/// Arena of downstream records with slot reuse.
pub struct Registry<D> {
    slots: Vec<Slot<D>>,
    free_list: Vec<u32>,
    live: usize,
}

impl<D> Registry<D> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            live: 0,
        }
    }

    /// Store a record and return its handle.
    pub fn insert(&mut self, value: D) -> DownstreamId {
        self.live += 1;
        if let Some(index) = self.free_list.pop() {
            // Generation was already bumped on removal
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            DownstreamId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            DownstreamId::new(index, 0)
        }
    }

    /// Remove a record. Stale handles return `None`.
    pub fn remove(&mut self, id: DownstreamId) -> Option<D> {
        if !self.contains(id) {
            return None;
        }
        let slot = &mut self.slots[id.index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index);
        self.live -= 1;
        slot.value.take()
    }

    /// Check that a handle refers to a live record.
    pub fn contains(&self, id: DownstreamId) -> bool {
        self.slots
            .get(id.index as usize)
            .is_some_and(|slot| slot.generation == id.generation && slot.value.is_some())
    }

    pub fn get(&self, id: DownstreamId) -> Option<&D> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_mut(&mut self, id: DownstreamId) -> Option<&mut D> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Iterate over live records.
    pub fn iter(&self) -> impl Iterator<Item = (DownstreamId, &D)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (DownstreamId::new(index as u32, slot.generation), value))
        })
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

impl<D> Default for Registry<D> {
    fn default() -> Self {
        Self::new()
    }
}
