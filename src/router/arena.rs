//! Generational slot arena backing the endpoint stores
//!
//! Endpoint handles are `(index, generation)` pairs into one of these arenas.
//! Removing an entry bumps the slot's generation, so a handle held after its
//! endpoint was destroyed is detectably stale instead of silently addressing
//! whatever reuses the slot.

/// One slot of the arena
#[derive(Debug)]
struct Slot<T> {
    /// Bumped on every removal; a handle is valid only if it matches
    generation: u64,
    value: Option<T>,
}

/// Slot arena with stable indices and generation-checked access
#[derive(Debug)]
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    len: usize,
}

impl<T> Arena<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Number of live entries
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Insert a value, reusing a free slot when one exists
    ///
    /// Returns the slot index and the generation the entry lives under.
    pub(crate) fn insert(&mut self, value: T) -> (usize, u64) {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.value = Some(value);
            (index, slot.generation)
        } else {
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            (self.slots.len() - 1, 0)
        }
    }

    /// Generation-checked lookup
    pub(crate) fn get(&self, index: usize, generation: u64) -> Option<&T> {
        let slot = self.slots.get(index)?;
        if slot.generation != generation {
            return None;
        }
        slot.value.as_ref()
    }

    /// Generation-checked mutable lookup
    pub(crate) fn get_mut(&mut self, index: usize, generation: u64) -> Option<&mut T> {
        let slot = self.slots.get_mut(index)?;
        if slot.generation != generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Lookup by raw index, for links the arena owner keeps consistent itself
    pub(crate) fn get_raw(&self, index: usize) -> Option<&T> {
        self.slots.get(index)?.value.as_ref()
    }

    /// Remove an entry, invalidating every handle to it
    pub(crate) fn remove(&mut self, index: usize, generation: u64) -> Option<T> {
        let slot = self.slots.get_mut(index)?;
        if slot.generation != generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation += 1;
        self.free.push(index);
        self.len -= 1;
        Some(value)
    }

    /// Iterate over live entries as `(index, &entry)`
    pub(crate) fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.value.as_ref().map(|value| (index, value)))
    }

    /// Iterate over live entries as `(index, &mut entry)`
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| slot.value.as_mut().map(|value| (index, value)))
    }

    /// Generation of the live entry at `index`, if any
    pub(crate) fn generation(&self, index: usize) -> Option<u64> {
        let slot = self.slots.get(index)?;
        slot.value.as_ref().map(|_| slot.generation)
    }
}
