use crate::error::{Result, TreeError};

use super::{Object, Reference};

/// Owner of indirect objects.
///
/// The balanced index reaches every node through this trait and never caches
/// resolved content across calls.
pub trait ObjectStore {
    /// Allocates a new addressable unit holding `object`.
    fn register(&mut self, object: Object) -> Result<Reference>;

    /// Current content of `reference`.
    fn resolve(&self, reference: Reference) -> Result<&Object>;

    /// Replaces the content of `reference` in place; the handle stays valid.
    fn mutate(&mut self, reference: Reference, object: Object) -> Result<()>;

    /// Releases `reference`, returning its last content. The handle becomes invalid.
    fn unregister(&mut self, reference: Reference) -> Result<Object>;
}

#[derive(Debug)]
struct Slot {
    generation: u16,
    object: Option<Object>,
}

/// In-memory handle table.
///
/// Object numbers start at 1. Released slots are recycled with a bumped
/// generation so stale handles fail to resolve.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently registered objects.
    pub fn live_objects(&self) -> usize {
        self.live
    }

    /// Whether `reference` points at a live object.
    pub fn contains(&self, reference: Reference) -> bool {
        self.slot(reference).is_some()
    }

    fn slot(&self, reference: Reference) -> Option<&Slot> {
        let idx = (reference.number as usize).checked_sub(1)?;
        self.slots
            .get(idx)
            .filter(|slot| slot.generation == reference.generation && slot.object.is_some())
    }

    fn slot_mut(&mut self, reference: Reference) -> Result<&mut Slot> {
        let idx = (reference.number as usize)
            .checked_sub(1)
            .ok_or(TreeError::InvalidReference(reference))?;
        self.slots
            .get_mut(idx)
            .filter(|slot| slot.generation == reference.generation && slot.object.is_some())
            .ok_or(TreeError::InvalidReference(reference))
    }
}

impl ObjectStore for MemoryStore {
    fn register(&mut self, object: Object) -> Result<Reference> {
        if let Some(number) = self.free.pop() {
            let slot = &mut self.slots[number as usize - 1];
            slot.object = Some(object);
            self.live += 1;
            return Ok(Reference::new(number, slot.generation));
        }
        let number = u32::try_from(self.slots.len() + 1)
            .map_err(|_| TreeError::InvalidArgument("object number space exhausted".into()))?;
        self.slots.push(Slot {
            generation: 0,
            object: Some(object),
        });
        self.live += 1;
        Ok(Reference::new(number, 0))
    }

    fn resolve(&self, reference: Reference) -> Result<&Object> {
        self.slot(reference)
            .and_then(|slot| slot.object.as_ref())
            .ok_or(TreeError::InvalidReference(reference))
    }

    fn mutate(&mut self, reference: Reference, object: Object) -> Result<()> {
        let slot = self.slot_mut(reference)?;
        slot.object = Some(object);
        Ok(())
    }

    fn unregister(&mut self, reference: Reference) -> Result<Object> {
        let slot = self.slot_mut(reference)?;
        let object = slot
            .object
            .take()
            .ok_or(TreeError::InvalidReference(reference))?;
        // A wrapped generation retires the slot instead of reissuing old handles.
        match slot.generation.checked_add(1) {
            Some(next) => {
                slot.generation = next;
                self.free.push(reference.number);
            }
            None => slot.generation = u16::MAX,
        }
        self.live -= 1;
        Ok(object)
    }
}
