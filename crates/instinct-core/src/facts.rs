use std::any::Any;
use std::collections::BTreeMap;
use std::marker::PhantomData;

/// A named group of species-specific facts with its own decay step.
///
/// Blocks are installed into a [`FactBlocks`] registry when an agent is attached and
/// the registry decays every installed block whenever the blackboard advances, so a
/// block cannot be left out of the per-tick decay.
pub trait FactBlock: 'static {
    fn name(&self) -> &'static str;

    /// Advance every timer in the block by `dt` seconds.
    fn decay(&mut self, dt: f32);
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockKey<T: 'static> {
    id: u64,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: 'static> Copy for BlockKey<T> {}

impl<T: 'static> Clone for BlockKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> BlockKey<T> {
    pub const fn new(id: u64) -> Self {
        Self {
            id,
            _phantom: PhantomData,
        }
    }

    pub fn id(self) -> u64 {
        self.id
    }
}

struct Slot {
    name: &'static str,
    value: Box<dyn Any>,
    decay: fn(&mut dyn Any, f32),
}

fn decay_slot<T: FactBlock>(value: &mut dyn Any, dt: f32) {
    if let Some(block) = value.downcast_mut::<T>() {
        block.decay(dt);
    }
}

/// Type-erased registry of fact blocks keyed by [`BlockKey`].
#[derive(Default)]
pub struct FactBlocks {
    slots: BTreeMap<u64, Slot>,
}

impl core::fmt::Debug for FactBlocks {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl FactBlocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains<T: FactBlock>(&self, key: BlockKey<T>) -> bool {
        self.slots.contains_key(&key.id)
    }

    /// Install (or replace) the block stored under `key`.
    pub fn insert<T: FactBlock>(&mut self, key: BlockKey<T>, block: T) {
        let name = block.name();
        self.slots.insert(
            key.id,
            Slot {
                name,
                value: Box::new(block),
                decay: decay_slot::<T>,
            },
        );
    }

    pub fn get<T: FactBlock>(&self, key: BlockKey<T>) -> Option<&T> {
        let slot = self.slots.get(&key.id)?;
        slot.value.downcast_ref::<T>().or_else(|| {
            panic!(
                "fact block type mismatch for key id={} (stored `{}` differs from requested)",
                key.id, slot.name
            )
        })
    }

    pub fn get_mut<T: FactBlock>(&mut self, key: BlockKey<T>) -> Option<&mut T> {
        let slot = self.slots.get_mut(&key.id)?;
        let name = slot.name;
        slot.value.downcast_mut::<T>().or_else(|| {
            panic!(
                "fact block type mismatch for key id={} (stored `{}` differs from requested)",
                key.id, name
            )
        })
    }

    pub fn remove<T: FactBlock>(&mut self, key: BlockKey<T>) -> Option<T> {
        let slot = self.slots.remove(&key.id)?;
        let name = slot.name;
        slot.value.downcast::<T>().map(|b| *b).ok().or_else(|| {
            panic!(
                "fact block type mismatch for key id={} (stored `{}` differs from requested)",
                key.id, name
            )
        })
    }

    /// Decay every installed block.
    pub fn decay_all(&mut self, dt: f32) {
        for slot in self.slots.values_mut() {
            (slot.decay)(slot.value.as_mut(), dt);
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.slots.values().map(|slot| slot.name)
    }
}
