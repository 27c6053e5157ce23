//! Entity identifiers with generational indices.
//!
//! A slot index is reused after its entity is destroyed; the generation
//! stored alongside it is bumped on every destroy so that handles captured
//! before the destroy never validate again.

use std::fmt;

use tracing::debug;

/// Generation counter to detect stale entity references.
///
/// Fresh slots start at generation 1 and count up to [`Generation::LAST`].
/// Generation 0 is never handed out, which keeps [`Entity::DANGLING`]
/// permanently invalid, and a generation is never reissued for its slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(u32);

impl Generation {
    /// The generation assigned to a slot the first time it is allocated.
    pub const FIRST: Self = Self(1);

    /// Create a generation from a raw value.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The last generation a slot can reach. A slot destroyed at this
    /// generation is retired instead of recycled.
    pub const LAST: Self = Self(u32::MAX);

    /// The following generation, or `None` once the counter is exhausted.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// Get the raw generation value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Default for Generation {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen{}", self.0)
    }
}

/// Raw slot index into the entity storage.
pub type EntityId = u32;

/// A versioned handle to an entity.
///
/// Entities are represented as a combination of:
/// - `id`: reusable slot index
/// - `generation`: version of that slot when the handle was issued
///
/// A handle is valid only while its generation matches the allocator's
/// current generation for the slot. Persist the `Entity`, not a facade.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    id: EntityId,
    generation: Generation,
}

impl Entity {
    /// A handle that never refers to a live entity.
    pub const DANGLING: Entity = Entity {
        id: EntityId::MAX,
        generation: Generation(0),
    };

    /// Create a new entity with the given ID and generation.
    #[must_use]
    pub const fn new(id: EntityId, generation: Generation) -> Self {
        Self { id, generation }
    }

    /// Get the entity's slot index.
    #[must_use]
    pub const fn id(self) -> EntityId {
        self.id
    }

    /// Slot index as a `usize`, for indexing sparse arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        self.id as usize
    }

    /// Get the entity's generation.
    #[must_use]
    pub const fn generation(self) -> Generation {
        self.generation
    }

    /// Pack entity into a single u64 for tooling and logs.
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        ((self.generation.0 as u64) << 32) | (self.id as u64)
    }

    /// Unpack entity from a u64.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            id: bits as u32,
            generation: Generation((bits >> 32) as u32),
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.id, self.generation.0)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.id, self.generation.0)
    }
}

#[derive(Clone, Copy, Debug)]
struct Slot {
    generation: Generation,
    alive: bool,
}

/// Allocator for entity IDs with generation tracking.
///
/// Maintains a free list of recycled slots and the current generation of
/// every slot ever allocated. All operations are O(1).
#[derive(Debug, Clone, Default)]
pub struct EntityAllocator {
    slots: Vec<Slot>,
    free_list: Vec<EntityId>,
    alive_count: u32,
    retired: u32,
}

impl EntityAllocator {
    /// Create a new entity allocator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            alive_count: 0,
            retired: 0,
        }
    }

    /// Create an allocator with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::with_capacity(capacity / 4),
            alive_count: 0,
            retired: 0,
        }
    }

    /// Allocate a new entity.
    ///
    /// Recycled slots come back with the generation bumped by their last
    /// destroy; fresh slots start at [`Generation::FIRST`].
    pub fn create(&mut self) -> Entity {
        self.alive_count += 1;

        if let Some(id) = self.free_list.pop() {
            let slot = &mut self.slots[id as usize];
            slot.alive = true;
            Entity::new(id, slot.generation)
        } else {
            let id = self.slots.len() as EntityId;
            self.slots.push(Slot {
                generation: Generation::FIRST,
                alive: true,
            });
            Entity::new(id, Generation::FIRST)
        }
    }

    /// Destroy an entity, making its slot available for reuse.
    ///
    /// A slot destroyed at [`Generation::LAST`] is retired rather than
    /// recycled. Returns `false` if the handle was already invalid.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        let Some(slot) = self.slots.get_mut(entity.index()) else {
            return false;
        };

        if !slot.alive || slot.generation != entity.generation() {
            return false;
        }

        slot.alive = false;
        self.alive_count -= 1;

        // Bump so every outstanding handle for this slot goes stale
        match slot.generation.next() {
            Some(generation) => {
                slot.generation = generation;
                self.free_list.push(entity.id());
            }
            None => {
                self.retired += 1;
                debug!(slot = entity.id(), "entity slot retired, generations exhausted");
            }
        }
        true
    }

    /// Check if an entity handle is currently valid.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.slots
            .get(entity.index())
            .is_some_and(|slot| slot.alive && slot.generation == entity.generation())
    }

    /// Current generation of a slot, or `None` if the slot was never allocated.
    #[must_use]
    pub fn version(&self, id: EntityId) -> Option<Generation> {
        self.slots.get(id as usize).map(|slot| slot.generation)
    }

    /// Resolve a slot to its live handle, if the slot is currently occupied.
    #[must_use]
    pub fn resolve(&self, id: EntityId) -> Option<Entity> {
        let slot = self.slots.get(id as usize)?;
        slot.alive.then(|| Entity::new(id, slot.generation))
    }

    /// Get the number of currently alive entities.
    #[must_use]
    pub const fn alive_count(&self) -> u32 {
        self.alive_count
    }

    /// Slots whose generations ran out and will never be handed out again.
    #[must_use]
    pub const fn retired_count(&self) -> u32 {
        self.retired
    }

    /// Get the number of slots ever allocated (alive or recycled).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Iterate over every live handle in slot order.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.alive)
            .map(|(id, slot)| Entity::new(id as EntityId, slot.generation))
    }
}
