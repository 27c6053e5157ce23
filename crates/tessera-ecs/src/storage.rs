//! Component storage - one sparse set per component type.
//!
//! Components of a type live contiguously in a dense `Vec<T>`, enabling
//! cache-friendly iteration. A sparse array maps an entity slot to its dense
//! position and a parallel dense array maps positions back to the owning
//! handle, so membership, lookup, insert, and removal are all O(1).
//!
//! Removal swaps the last element into the hole. Rust moves are plain
//! bitwise copies, so growth and swap-removal never run user code.

use std::{any::Any, fmt, ptr::NonNull};

use crate::{
    component::{Component, ComponentId},
    entity::{Entity, EntityId},
};

/// Marks an empty sparse entry.
const EMPTY: u32 = u32::MAX;

/// The untyped half of a sparse set: slot → dense position and back.
#[derive(Clone, Default)]
pub struct SparseIndex {
    sparse: Vec<u32>,
    dense: Vec<Entity>,
}

impl SparseIndex {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::with_capacity(capacity),
        }
    }

    /// Dense position of a slot, if present.
    #[inline]
    #[must_use]
    pub fn position(&self, id: EntityId) -> Option<usize> {
        match self.sparse.get(id as usize) {
            Some(&pos) if pos != EMPTY => Some(pos as usize),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.position(id).is_some()
    }

    /// Handle that owns the entry for `id`, if present.
    #[inline]
    #[must_use]
    pub fn owner(&self, id: EntityId) -> Option<Entity> {
        self.position(id).map(|pos| self.dense[pos])
    }

    /// Whether the entry for `entity`'s slot is owned by exactly this handle.
    #[inline]
    #[must_use]
    pub fn contains_entity(&self, entity: Entity) -> bool {
        self.owner(entity.id()) == Some(entity)
    }

    /// Handle stored at a dense position.
    #[inline]
    #[must_use]
    pub fn entity_at(&self, pos: usize) -> Entity {
        self.dense[pos]
    }

    /// Slot stored at a dense position.
    #[inline]
    #[must_use]
    pub fn slot_at(&self, pos: usize) -> EntityId {
        self.dense[pos].id()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// All owning handles in dense order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.dense
    }

    /// Record `entity` at the tail. The slot must not be present.
    fn push(&mut self, entity: Entity) -> usize {
        let id = entity.index();
        if id >= self.sparse.len() {
            self.sparse.resize(id + 1, EMPTY);
        }
        let pos = self.dense.len();
        self.sparse[id] = pos as u32;
        self.dense.push(entity);
        pos
    }

    /// Mirror of `Vec::swap_remove` on the dense side.
    fn swap_remove(&mut self, id: EntityId) -> Option<usize> {
        let pos = self.position(id)?;
        self.dense.swap_remove(pos);
        if let Some(&moved) = self.dense.get(pos) {
            self.sparse[moved.index()] = pos as u32;
        }
        self.sparse[id as usize] = EMPTY;
        Some(pos)
    }

    fn clear(&mut self) {
        self.sparse.clear();
        self.dense.clear();
    }
}

impl fmt::Debug for SparseIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.dense.iter()).finish()
    }
}

/// Dense storage for every component of type `T`.
pub struct SparseSet<T> {
    index: SparseIndex,
    components: Vec<T>,
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SparseSet<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            index: SparseIndex::new(),
            components: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            index: SparseIndex::with_capacity(capacity),
            components: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains(id)
    }

    /// Construct `value` at the tail for `entity`.
    ///
    /// Returns `None` without touching anything if the slot is already
    /// occupied; `value` is dropped in that case.
    pub fn insert(&mut self, entity: Entity, value: T) -> Option<&mut T> {
        if self.index.contains(entity.id()) {
            return None;
        }
        let pos = self.index.push(entity);
        debug_assert_eq!(pos, self.components.len());
        self.components.push(value);
        self.components.last_mut()
    }

    #[inline]
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.index.position(id).map(|pos| &self.components[pos])
    }

    #[inline]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.index.position(id).map(|pos| &mut self.components[pos])
    }

    /// Component owned by exactly `entity`, ignoring stale entries left in
    /// its slot by an earlier owner.
    #[inline]
    #[must_use]
    pub fn fetch(&self, entity: Entity) -> Option<&T> {
        match self.index.position(entity.id()) {
            Some(pos) if self.index.entity_at(pos) == entity => Some(&self.components[pos]),
            _ => None,
        }
    }

    #[inline]
    pub fn fetch_mut(&mut self, entity: Entity) -> Option<&mut T> {
        match self.index.position(entity.id()) {
            Some(pos) if self.index.entity_at(pos) == entity => Some(&mut self.components[pos]),
            _ => None,
        }
    }

    /// Swap-remove the entry for `id` and return it.
    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        let pos = self.index.swap_remove(id)?;
        Some(self.components.swap_remove(pos))
    }

    /// Handle that owns the entry for `id`, if present.
    #[must_use]
    pub fn owner(&self, id: EntityId) -> Option<Entity> {
        self.index.owner(id)
    }

    /// Handle stored at a dense position.
    ///
    /// # Panics
    ///
    /// Panics if `pos >= len()`.
    #[must_use]
    pub fn entity_at(&self, pos: usize) -> Entity {
        self.index.entity_at(pos)
    }

    /// Slot stored at a dense position.
    ///
    /// # Panics
    ///
    /// Panics if `pos >= len()`.
    #[must_use]
    pub fn slot_at(&self, pos: usize) -> EntityId {
        self.index.slot_at(pos)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    #[must_use]
    pub fn index(&self) -> &SparseIndex {
        &self.index
    }

    /// The dense component array.
    #[must_use]
    pub fn components(&self) -> &[T] {
        &self.components
    }

    #[must_use]
    pub fn components_mut(&mut self) -> &mut [T] {
        &mut self.components
    }

    /// Iterate `(owner, component)` pairs in dense order.
    ///
    /// Owners may include dead handles whose removal was vetoed; the world
    /// filters those out, raw storage access does not.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.index.entities().iter().copied().zip(&self.components)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.index.entities().iter().copied().zip(&mut self.components)
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.components.clear();
    }
}

impl<T: fmt::Debug> fmt::Debug for SparseSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Type-erased view of a [`SparseSet`], used wherever the component type is
/// only known by [`ComponentId`]: cascade destroy, clone, tooling, and views.
pub trait AnyStorage: Send + Sync + 'static {
    /// Id of the component type stored here.
    fn component_id(&self) -> ComponentId;

    fn index(&self) -> &SparseIndex;

    fn len(&self) -> usize {
        self.index().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, id: EntityId) -> bool {
        self.index().contains(id)
    }

    /// Remove and drop the entry for `id`.
    fn remove(&mut self, id: EntityId) -> bool;

    /// Pointer to the component of `id`, valid until the next mutation.
    fn get_ptr(&self, id: EntityId) -> Option<NonNull<u8>>;

    fn get_mut_ptr(&mut self, id: EntityId) -> Option<NonNull<u8>>;

    /// Start of the dense component array.
    fn base_ptr(&self) -> NonNull<u8>;

    fn base_mut_ptr(&mut self) -> NonNull<u8>;

    /// Size of one element in the dense array.
    fn stride(&self) -> usize;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A sparse set tagged with the id its world assigned to `T`.
pub(crate) struct TypedStorage<T> {
    id: ComponentId,
    set: SparseSet<T>,
}

impl<T: Component> TypedStorage<T> {
    pub(crate) fn boxed(id: ComponentId, capacity: usize) -> Box<dyn AnyStorage> {
        Box::new(Self {
            id,
            set: SparseSet::with_capacity(capacity),
        })
    }
}

/// Downcast an erased storage to its sparse set.
pub(crate) fn downcast_ref<T: Component>(storage: &dyn AnyStorage) -> Option<&SparseSet<T>> {
    storage
        .as_any()
        .downcast_ref::<TypedStorage<T>>()
        .map(|typed| &typed.set)
}

pub(crate) fn downcast_mut<T: Component>(
    storage: &mut dyn AnyStorage,
) -> Option<&mut SparseSet<T>> {
    storage
        .as_any_mut()
        .downcast_mut::<TypedStorage<T>>()
        .map(|typed| &mut typed.set)
}

impl<T: Component> AnyStorage for TypedStorage<T> {
    fn component_id(&self) -> ComponentId {
        self.id
    }

    fn index(&self) -> &SparseIndex {
        &self.set.index
    }

    fn remove(&mut self, id: EntityId) -> bool {
        self.set.remove(id).is_some()
    }

    fn get_ptr(&self, id: EntityId) -> Option<NonNull<u8>> {
        self.set.get(id).map(|c| NonNull::from(c).cast())
    }

    fn get_mut_ptr(&mut self, id: EntityId) -> Option<NonNull<u8>> {
        self.set.get_mut(id).map(|c| NonNull::from(c).cast())
    }

    fn base_ptr(&self) -> NonNull<u8> {
        // SAFETY: Vec pointers are never null (dangling when unallocated)
        unsafe { NonNull::new_unchecked(self.set.components.as_ptr().cast_mut().cast()) }
    }

    fn base_mut_ptr(&mut self) -> NonNull<u8> {
        // SAFETY: Vec pointers are never null (dangling when unallocated)
        unsafe { NonNull::new_unchecked(self.set.components.as_mut_ptr().cast()) }
    }

    fn stride(&self) -> usize {
        std::mem::size_of::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Generation;

    #[derive(Debug, Clone, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Name(String);

    fn entity(id: EntityId) -> Entity {
        Entity::new(id, Generation::FIRST)
    }

    #[test]
    fn test_insert_get() {
        let mut set = SparseSet::new();

        set.insert(entity(3), Position { x: 1.0, y: 2.0 });
        set.insert(entity(7), Position { x: 3.0, y: 4.0 });

        assert_eq!(set.len(), 2);
        assert!(set.contains(3));
        assert!(!set.contains(4));
        assert_eq!(set.get(7), Some(&Position { x: 3.0, y: 4.0 }));
        assert_eq!(set.get(100), None);
        assert_eq!(set.fetch(entity(3)), Some(&Position { x: 1.0, y: 2.0 }));
        assert!(set.index().contains_entity(entity(7)));
    }

    #[test]
    fn test_fetch_ignores_stale_owner() {
        let mut set = SparseSet::new();
        let old = entity(4);
        let new = Entity::new(4, Generation::FIRST.next().unwrap());

        set.insert(old, 10u32);

        assert!(set.contains(4));
        assert_eq!(set.fetch(new), None);
        assert_eq!(set.fetch_mut(new), None);
        assert!(!set.index().contains_entity(new));
        assert_eq!(set.owner(4), Some(old));
    }

    #[test]
    fn test_duplicate_insert_leaves_original() {
        let mut set = SparseSet::new();

        set.insert(entity(0), Name("first".to_string()));
        assert!(set.insert(entity(0), Name("second".to_string())).is_none());

        assert_eq!(set.len(), 1);
        assert_eq!(set.get(0), Some(&Name("first".to_string())));
    }

    #[test]
    fn test_swap_remove() {
        let mut set = SparseSet::new();

        set.insert(entity(0), Position { x: 1.0, y: 2.0 });
        set.insert(entity(1), Position { x: 3.0, y: 4.0 });
        set.insert(entity(2), Position { x: 5.0, y: 6.0 });

        let removed = set.remove(0);
        assert_eq!(removed, Some(Position { x: 1.0, y: 2.0 }));
        assert_eq!(set.len(), 2);

        // Last element moved into the hole
        assert_eq!(set.slot_at(0), 2);
        assert_eq!(set.components()[0], Position { x: 5.0, y: 6.0 });
        assert_eq!(set.get(2), Some(&Position { x: 5.0, y: 6.0 }));
        assert_eq!(set.get(1), Some(&Position { x: 3.0, y: 4.0 }));

        assert_eq!(set.remove(0), None);
    }

    #[test]
    fn test_remove_last() {
        let mut set = SparseSet::new();

        set.insert(entity(0), 1u32);
        set.insert(entity(1), 2u32);

        assert_eq!(set.remove(1), Some(2));
        assert_eq!(set.get(0), Some(&1));
        assert!(!set.contains(1));
    }

    #[test]
    fn test_drops_on_clear_and_drop() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        static DROP_COUNT: AtomicUsize = AtomicUsize::new(0);

        struct DropCounter;

        impl Drop for DropCounter {
            fn drop(&mut self) {
                DROP_COUNT.fetch_add(1, Ordering::SeqCst);
            }
        }

        {
            let mut set = SparseSet::new();

            set.insert(entity(0), DropCounter);
            set.insert(entity(1), DropCounter);
            set.insert(entity(2), DropCounter);

            set.remove(1);
            assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 1);
        }

        assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_zero_sized_components() {
        #[derive(Debug, PartialEq)]
        struct Tag;

        let mut set = SparseSet::new();
        for id in 0..5 {
            set.insert(entity(id), Tag);
        }
        set.remove(2);

        assert_eq!(set.len(), 4);
        assert!(!set.contains(2));
        assert_eq!(set.get(4), Some(&Tag));
    }

    #[test]
    fn test_erased_access() {
        let id = ComponentId::from_raw(0);
        let mut storage = TypedStorage::<Position>::boxed(id, 4);

        downcast_mut::<Position>(storage.as_mut())
            .unwrap()
            .insert(entity(5), Position { x: 9.0, y: 8.0 });

        assert_eq!(storage.component_id(), id);
        assert_eq!(storage.len(), 1);
        assert!(storage.contains(5));
        assert_eq!(storage.stride(), std::mem::size_of::<Position>());

        let ptr = storage.get_ptr(5).unwrap();
        // SAFETY: the storage holds Positions and slot 5 is present
        let pos = unsafe { ptr.cast::<Position>().as_ref() };
        assert_eq!(pos.x, 9.0);
        assert_eq!(storage.base_ptr(), ptr);

        assert!(downcast_ref::<Name>(storage.as_ref()).is_none());
        assert!(storage.remove(5));
        assert!(!storage.remove(5));
        assert!(storage.is_empty());
    }
}
