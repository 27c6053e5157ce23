//! Typed views over entities that hold a fixed set of component types.
//!
//! A view walks the dense array of its first ("lead") type and, for every
//! entry, checks that the owning handle is alive, that every other required
//! type is present, that no excluded type is present, and optionally that
//! every required component reports itself enabled. The lead type is used
//! as given; callers put the smallest set first.
//!
//! ```ignore
//! for (entity, (pos, vel)) in world.view_mut::<(Position, Velocity)>().without::<Frozen>() {
//!     pos.x += vel.x;
//! }
//! ```
//!
//! Views borrow the world, so entities cannot be created, destroyed, or
//! restructured while one is being iterated.

use std::{marker::PhantomData, ptr::NonNull};

use smallvec::{SmallVec, smallvec};

use crate::{
    World,
    component::{Component, ComponentId, ComponentRegistry},
    entity::{Entity, EntityAllocator},
    hooks::PredicateFn,
    storage::{AnyStorage, SparseIndex},
    world::ComponentList,
};

/// Component pointers for the entity currently being yielded.
pub(crate) type Ptrs = SmallVec<[NonNull<u8>; 8]>;

// ============================================================================
// Matching
// ============================================================================

/// One required storage, captured as raw parts for the lifetime of a view.
#[derive(Clone, Copy)]
struct Column {
    index: NonNull<SparseIndex>,
    base: NonNull<u8>,
    stride: usize,
    is_enabled: Option<PredicateFn>,
}

impl Column {
    fn new(storage: &dyn AnyStorage, base: NonNull<u8>, is_enabled: Option<PredicateFn>) -> Self {
        Self {
            index: NonNull::from(storage.index()),
            base,
            stride: storage.stride(),
            is_enabled,
        }
    }

    fn index(&self) -> &SparseIndex {
        // SAFETY: the storage outlives the matcher that owns this column
        unsafe { self.index.as_ref() }
    }
}

/// The filter shared by typed views and runtime queries.
///
/// Holds raw pointers into the world's storages; the `'w` borrow taken at
/// construction keeps them valid and the storages unchanged.
pub(crate) struct Matcher<'w> {
    entities: &'w EntityAllocator,
    required: SmallVec<[Column; 8]>,
    excluded: SmallVec<[NonNull<SparseIndex>; 4]>,
    enabled_only: bool,
    len: usize,
}

impl<'w> Matcher<'w> {
    /// Matcher for read access. `None` when a required type has no storage,
    /// in which case nothing can match.
    pub(crate) fn shared(
        world: &'w World,
        required: &[ComponentId],
        excluded: &[ComponentId],
        enabled_only: bool,
    ) -> Option<Self> {
        let registry = world.registry();
        let mut columns = SmallVec::new();
        for &id in required {
            let storage = world.storage_by_id(id)?;
            columns.push(Column::new(
                storage,
                storage.base_ptr(),
                registry.hooks(id).is_enabled(),
            ));
        }

        let excluded = excluded
            .iter()
            .filter_map(|&id| world.storage_by_id(id))
            .map(|storage| NonNull::from(storage.index()))
            .collect();

        Self::assemble(world.entities(), columns, excluded, enabled_only)
    }

    /// Matcher for write access. Required ids must be distinct.
    pub(crate) fn exclusive(
        world: &'w mut World,
        required: &[ComponentId],
        excluded: &[ComponentId],
        enabled_only: bool,
    ) -> Option<Self> {
        let (entities, registry, storages) = world.parts_mut();

        let mut columns = SmallVec::new();
        for &id in required {
            let storage = storages.get_mut(id.index())?.as_deref_mut()?;
            let base = storage.base_mut_ptr();
            columns.push(Column::new(
                storage,
                base,
                registry.hooks(id).is_enabled(),
            ));
        }

        let mut excluded_indices = SmallVec::new();
        for &id in excluded {
            if let Some(storage) = storages.get(id.index()).and_then(Option::as_deref) {
                excluded_indices.push(NonNull::from(storage.index()));
            }
        }

        Self::assemble(entities, columns, excluded_indices, enabled_only)
    }

    fn assemble(
        entities: &'w EntityAllocator,
        required: SmallVec<[Column; 8]>,
        excluded: SmallVec<[NonNull<SparseIndex>; 4]>,
        enabled_only: bool,
    ) -> Option<Self> {
        let len = required.first()?.index().len();
        Some(Self {
            entities,
            required,
            excluded,
            enabled_only,
            len,
        })
    }

    /// Number of entries in the lead storage.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Test the lead entry at `pos`. On a match, `ptrs` holds one pointer per
    /// required type, in order.
    pub(crate) fn probe(&self, pos: usize, ptrs: &mut Ptrs) -> Option<Entity> {
        let entity = self.required[0].index().entity_at(pos);
        if !self.entities.is_alive(entity) {
            return None;
        }

        ptrs.clear();
        for column in &self.required {
            let index = column.index();
            let dense = index.position(entity.id())?;
            if index.entity_at(dense) != entity {
                return None;
            }
            // SAFETY: dense < len of the column's component array
            ptrs.push(unsafe { column.base.add(dense * column.stride) });
        }

        for excluded in &self.excluded {
            // SAFETY: the storage outlives the matcher
            if unsafe { excluded.as_ref() }.contains_entity(entity) {
                return None;
            }
        }

        if self.enabled_only {
            for (column, ptr) in self.required.iter().zip(ptrs.iter()) {
                if let Some(is_enabled) = column.is_enabled {
                    // SAFETY: ptr points at a live component of the column's type
                    if !unsafe { is_enabled(ptr.as_ptr().cast_const()) } {
                        return None;
                    }
                }
            }
        }

        Some(entity)
    }
}

// ============================================================================
// Component Sets
// ============================================================================

/// A tuple of component types that a view fetches together.
///
/// Implemented for tuples of one to eight [`Component`] types.
pub trait ComponentSet: 'static {
    /// Shared references, one per type.
    type Ref<'w>;
    /// Exclusive references, one per type.
    type Mut<'w>;

    /// Ids in tuple order; `None` if any type was never registered.
    fn ids(registry: &ComponentRegistry) -> Option<ComponentList>;

    /// # Safety
    ///
    /// `ptrs` holds one pointer per type, in tuple order, each to a live
    /// component of that type that stays valid and unaliased by writers for
    /// `'w`.
    unsafe fn fetch<'w>(ptrs: &[NonNull<u8>]) -> Self::Ref<'w>;

    /// # Safety
    ///
    /// As [`fetch`](Self::fetch), and no other reference to any of the
    /// components exists for `'w`.
    unsafe fn fetch_mut<'w>(ptrs: &[NonNull<u8>]) -> Self::Mut<'w>;
}

macro_rules! impl_component_set {
    ($($ty:ident => $idx:tt),+) => {
        impl<$($ty: Component),+> ComponentSet for ($($ty,)+) {
            type Ref<'w> = ($(&'w $ty,)+);
            type Mut<'w> = ($(&'w mut $ty,)+);

            fn ids(registry: &ComponentRegistry) -> Option<ComponentList> {
                Some(smallvec![$(registry.id::<$ty>()?),+])
            }

            unsafe fn fetch<'w>(ptrs: &[NonNull<u8>]) -> Self::Ref<'w> {
                // SAFETY: upheld by the caller
                unsafe { ($(ptrs[$idx].cast::<$ty>().as_ref(),)+) }
            }

            unsafe fn fetch_mut<'w>(ptrs: &[NonNull<u8>]) -> Self::Mut<'w> {
                // SAFETY: upheld by the caller
                unsafe { ($(ptrs[$idx].cast::<$ty>().as_mut(),)+) }
            }
        }
    };
}

impl_component_set!(A => 0);
impl_component_set!(A => 0, B => 1);
impl_component_set!(A => 0, B => 1, C => 2);
impl_component_set!(A => 0, B => 1, C => 2, D => 3);
impl_component_set!(A => 0, B => 1, C => 2, D => 3, E => 4);
impl_component_set!(A => 0, B => 1, C => 2, D => 3, E => 4, F => 5);
impl_component_set!(A => 0, B => 1, C => 2, D => 3, E => 4, F => 5, G => 6);
impl_component_set!(A => 0, B => 1, C => 2, D => 3, E => 4, F => 5, G => 6, H => 7);

// ============================================================================
// Shared View
// ============================================================================

/// Read-only view, created by [`World::view`].
pub struct View<'w, Q: ComponentSet> {
    world: &'w World,
    required: Option<ComponentList>,
    excluded: ComponentList,
    enabled_only: bool,
    _marker: PhantomData<fn() -> Q>,
}

impl<'w, Q: ComponentSet> View<'w, Q> {
    pub(crate) fn new(world: &'w World) -> Self {
        Self {
            world,
            required: Q::ids(world.registry()),
            excluded: ComponentList::new(),
            enabled_only: false,
            _marker: PhantomData,
        }
    }

    /// Skip entities that hold a `T`.
    #[must_use]
    pub fn without<T: Component>(self) -> Self {
        match self.world.component_id::<T>() {
            Some(id) => self.without_id(id),
            None => self,
        }
    }

    #[must_use]
    pub fn without_id(mut self, id: ComponentId) -> Self {
        self.excluded.push(id);
        self
    }

    /// Skip entities where any required component reports itself disabled.
    #[must_use]
    pub fn enabled_only(mut self) -> Self {
        self.enabled_only = true;
        self
    }

    pub fn iter(&self) -> ViewIter<'w, Q> {
        let matcher = self.required.as_deref().and_then(|required| {
            Matcher::shared(self.world, required, &self.excluded, self.enabled_only)
        });
        ViewIter {
            matcher,
            pos: 0,
            ptrs: Ptrs::new(),
            _marker: PhantomData,
        }
    }

    pub fn for_each(&self, mut f: impl FnMut(Entity, Q::Ref<'w>)) {
        for (entity, components) in self.iter() {
            f(entity, components);
        }
    }
}

impl<'w, Q: ComponentSet> IntoIterator for View<'w, Q> {
    type Item = (Entity, Q::Ref<'w>);
    type IntoIter = ViewIter<'w, Q>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'w, Q: ComponentSet> IntoIterator for &View<'w, Q> {
    type Item = (Entity, Q::Ref<'w>);
    type IntoIter = ViewIter<'w, Q>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<Q: ComponentSet> std::fmt::Debug for View<'_, Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("required", &self.required)
            .field("excluded", &self.excluded)
            .field("enabled_only", &self.enabled_only)
            .finish()
    }
}

/// Iterator over a [`View`].
pub struct ViewIter<'w, Q> {
    matcher: Option<Matcher<'w>>,
    pos: usize,
    ptrs: Ptrs,
    _marker: PhantomData<fn() -> Q>,
}

impl<'w, Q: ComponentSet> Iterator for ViewIter<'w, Q> {
    type Item = (Entity, Q::Ref<'w>);

    fn next(&mut self) -> Option<Self::Item> {
        let matcher = self.matcher.as_ref()?;
        while self.pos < matcher.len() {
            let pos = self.pos;
            self.pos += 1;
            if let Some(entity) = matcher.probe(pos, &mut self.ptrs) {
                // SAFETY: ptrs were filled for this entity under a shared 'w borrow
                return Some((entity, unsafe { Q::fetch(&self.ptrs) }));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .matcher
            .as_ref()
            .map_or(0, |matcher| matcher.len() - self.pos);
        (0, Some(remaining))
    }
}

// ============================================================================
// Exclusive View
// ============================================================================

/// Read-write view, created by [`World::view_mut`].
pub struct ViewMut<'w, Q: ComponentSet> {
    world: &'w mut World,
    required: Option<ComponentList>,
    excluded: ComponentList,
    enabled_only: bool,
    _marker: PhantomData<fn() -> Q>,
}

impl<'w, Q: ComponentSet> ViewMut<'w, Q> {
    pub(crate) fn new(world: &'w mut World) -> Self {
        let required = Q::ids(world.registry());
        if let Some(ids) = &required {
            for (i, id) in ids.iter().enumerate() {
                assert!(
                    !ids[..i].contains(id),
                    "view_mut requests {} more than once",
                    world.registry().name(*id)
                );
            }
        }

        Self {
            world,
            required,
            excluded: ComponentList::new(),
            enabled_only: false,
            _marker: PhantomData,
        }
    }

    /// Skip entities that hold a `T`.
    #[must_use]
    pub fn without<T: Component>(self) -> Self {
        match self.world.component_id::<T>() {
            Some(id) => self.without_id(id),
            None => self,
        }
    }

    #[must_use]
    pub fn without_id(mut self, id: ComponentId) -> Self {
        self.excluded.push(id);
        self
    }

    /// Skip entities where any required component reports itself disabled.
    #[must_use]
    pub fn enabled_only(mut self) -> Self {
        self.enabled_only = true;
        self
    }

    pub fn iter_mut(&mut self) -> ViewIterMut<'_, Q> {
        let matcher = match &self.required {
            Some(required) => {
                Matcher::exclusive(self.world, required, &self.excluded, self.enabled_only)
            }
            None => None,
        };
        ViewIterMut {
            matcher,
            pos: 0,
            ptrs: Ptrs::new(),
            _marker: PhantomData,
        }
    }

    pub fn for_each(self, mut f: impl FnMut(Entity, Q::Mut<'w>)) {
        for (entity, components) in self {
            f(entity, components);
        }
    }
}

impl<'w, Q: ComponentSet> IntoIterator for ViewMut<'w, Q> {
    type Item = (Entity, Q::Mut<'w>);
    type IntoIter = ViewIterMut<'w, Q>;

    fn into_iter(self) -> Self::IntoIter {
        let Self {
            world,
            required,
            excluded,
            enabled_only,
            ..
        } = self;
        let matcher = required
            .and_then(|required| Matcher::exclusive(world, &required, &excluded, enabled_only));
        ViewIterMut {
            matcher,
            pos: 0,
            ptrs: Ptrs::new(),
            _marker: PhantomData,
        }
    }
}

impl<Q: ComponentSet> std::fmt::Debug for ViewMut<'_, Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewMut")
            .field("required", &self.required)
            .field("excluded", &self.excluded)
            .field("enabled_only", &self.enabled_only)
            .finish()
    }
}

/// Iterator over a [`ViewMut`].
pub struct ViewIterMut<'w, Q> {
    matcher: Option<Matcher<'w>>,
    pos: usize,
    ptrs: Ptrs,
    _marker: PhantomData<fn() -> Q>,
}

impl<'w, Q: ComponentSet> Iterator for ViewIterMut<'w, Q> {
    type Item = (Entity, Q::Mut<'w>);

    fn next(&mut self) -> Option<Self::Item> {
        let matcher = self.matcher.as_ref()?;
        while self.pos < matcher.len() {
            let pos = self.pos;
            self.pos += 1;
            if let Some(entity) = matcher.probe(pos, &mut self.ptrs) {
                // SAFETY: each lead position is visited once and required
                // types are distinct, so no two items alias
                return Some((entity, unsafe { Q::fetch_mut(&self.ptrs) }));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .matcher
            .as_ref()
            .map_or(0, |matcher| matcher.len() - self.pos);
        (0, Some(remaining))
    }
}
