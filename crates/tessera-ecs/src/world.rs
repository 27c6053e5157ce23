//! World - the component store.
//!
//! The World owns the entity allocator, the component registry, and one
//! sparse set per component type. It is the single entry point for creating
//! and destroying entities, attaching and detaching components, running
//! lifecycle hooks, and building views.
//!
//! Every entity slot also keeps a short list of the component ids attached to
//! it, so destroy and clone only visit the storages that actually hold data
//! for that entity.

use std::ptr::NonNull;

use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::{
    component::{Component, ComponentId, ComponentRegistry, Lifecycle, Registration},
    config::WorldConfig,
    entity::{Entity, EntityAllocator, EntityId, Generation},
    entity_ref::{EntityMut, EntityRef},
    error::{EcsError, EcsResult},
    hooks::{ComponentHooks, HookFn, VetoFn},
    query::QueryBuilder,
    storage::{self, AnyStorage, SparseSet, TypedStorage},
    view::{ComponentSet, View, ViewMut},
};

/// Component ids attached to one entity, in attach order.
pub(crate) type ComponentList = SmallVec<[ComponentId; 8]>;

type StorageSlot = Option<Box<dyn AnyStorage>>;

/// Tag present on entities that were last switched on with
/// [`World::set_active`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Active;

/// Tag present on entities that were last switched off with
/// [`World::set_active`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Inactive;

/// Outcome of [`World::clone_components`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneReport {
    /// Types copied onto the target.
    pub cloned: ComponentList,
    /// Types left behind: not cloneable, or already present on the target.
    pub skipped: ComponentList,
}

impl CloneReport {
    /// Whether every attached type was copied.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// The ECS world - container for all entities and components.
pub struct World {
    /// Entity ID allocator.
    entities: EntityAllocator,
    /// Attached component ids, indexed by entity slot.
    attached: Vec<ComponentList>,
    /// Component type registry and hook table.
    components: ComponentRegistry,
    /// One erased sparse set per component id, created on first insert.
    storages: Vec<StorageSlot>,
    config: WorldConfig,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Create an empty world with its own registry.
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(ComponentRegistry::new(), WorldConfig::default())
    }

    #[must_use]
    pub fn with_config(config: WorldConfig) -> Self {
        Self::from_parts(ComponentRegistry::new(), config)
    }

    /// Create a world with pre-allocated entity capacity.
    #[must_use]
    pub fn with_capacity(entity_capacity: usize) -> Self {
        Self::with_config(WorldConfig::new().entity_capacity(entity_capacity))
    }

    /// Create a world that starts from a registry built elsewhere.
    ///
    /// Types registered on `registry` keep their ids and hooks in this world.
    #[must_use]
    pub fn with_registry(registry: ComponentRegistry) -> Self {
        Self::from_parts(registry, WorldConfig::default())
    }

    #[must_use]
    pub fn from_parts(mut registry: ComponentRegistry, config: WorldConfig) -> Self {
        registry.register::<Active>().cloneable();
        registry.register::<Inactive>().cloneable();

        Self {
            entities: EntityAllocator::with_capacity(config.entity_capacity),
            attached: Vec::with_capacity(config.entity_capacity),
            components: registry,
            storages: Vec::new(),
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    // ==================== Registration ====================

    /// Register `T` and choose its lifecycle capabilities.
    ///
    /// ```ignore
    /// world.register::<Health>().on_remove().cloneable();
    /// ```
    pub fn register<T: Component>(&mut self) -> Registration<'_, T> {
        self.components.register::<T>()
    }

    /// Register a type whose capabilities come from its [`Lifecycle`] impl.
    pub fn register_type<T: Lifecycle>(&mut self) -> ComponentId {
        self.components.register_type::<T>()
    }

    /// Register a batch of types at once.
    pub fn add_plugin<P: Plugin>(&mut self, plugin: P) -> &mut Self {
        plugin.build(self);
        self
    }

    #[must_use]
    pub fn component_id<T: Component>(&self) -> Option<ComponentId> {
        self.components.id::<T>()
    }

    #[must_use]
    pub fn registry(&self) -> &ComponentRegistry {
        &self.components
    }

    /// Hook bundle for `id`; empty for ids never registered.
    #[must_use]
    pub fn hooks(&self, id: ComponentId) -> &ComponentHooks {
        self.components.hooks(id)
    }

    // ==================== Entity Operations ====================

    /// Create a new empty entity.
    pub fn create(&mut self) -> Entity {
        let entity = self.entities.create();
        let slot = entity.index();
        if slot >= self.attached.len() {
            self.attached.resize_with(slot + 1, ComponentList::new);
        }
        debug_assert!(self.attached[slot].is_empty());
        entity
    }

    /// Create a new entity and return a facade for building it.
    pub fn spawn(&mut self) -> EntityMut<'_> {
        let entity = self.create();
        EntityMut::new(self, entity)
    }

    /// Destroy an entity and every component attached to it.
    ///
    /// Each component's removal hook is asked first. A vetoed component is
    /// left in its storage as an orphan owned by the now-dead handle; see
    /// [`purge_orphans`](Self::purge_orphans). Returns `false` if the handle
    /// was already invalid.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.entities.is_alive(entity) {
            return false;
        }

        let attached = std::mem::take(&mut self.attached[entity.index()]);
        for id in attached {
            let on_remove = self.components.hooks(id).on_remove();
            let Some(storage) = self.storages.get_mut(id.index()).and_then(Option::as_deref_mut)
            else {
                continue;
            };

            if veto_allows(on_remove, storage, entity.id()) {
                storage.remove(entity.id());
            } else {
                warn!(
                    %entity,
                    component = self.components.name(id),
                    "removal vetoed during destroy, component orphaned"
                );
            }
        }

        self.entities.destroy(entity)
    }

    /// Check if an entity handle is currently valid.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Current generation of a slot, `None` if never allocated.
    #[must_use]
    pub fn version(&self, id: EntityId) -> Option<Generation> {
        self.entities.version(id)
    }

    /// Get the number of alive entities.
    #[must_use]
    pub fn entity_count(&self) -> u32 {
        self.entities.alive_count()
    }

    #[must_use]
    pub fn entities(&self) -> &EntityAllocator {
        &self.entities
    }

    /// Iterate over all live entities in slot order.
    pub fn iter_entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter()
    }

    /// Read-only facade, `None` for a dead handle.
    #[must_use]
    pub fn entity(&self, entity: Entity) -> Option<EntityRef<'_>> {
        self.is_alive(entity).then(|| EntityRef::new(self, entity))
    }

    /// Mutable facade, `None` for a dead handle.
    pub fn entity_mut(&mut self, entity: Entity) -> Option<EntityMut<'_>> {
        if self.is_alive(entity) {
            Some(EntityMut::new(self, entity))
        } else {
            None
        }
    }

    // ==================== Component Operations ====================

    /// Attach `value` to `entity`.
    ///
    /// Returns `None` and drops `value` if the entity is dead or already has
    /// a `T`; the existing instance is left untouched.
    pub fn emplace<T: Component>(&mut self, entity: Entity, value: T) -> Option<&mut T> {
        self.try_emplace(entity, value).ok()
    }

    pub fn try_emplace<T: Component>(&mut self, entity: Entity, value: T) -> EcsResult<&mut T> {
        if !self.entities.is_alive(entity) {
            return Err(EcsError::DeadEntity(entity));
        }

        let id = self.components.ensure::<T>();
        let set = typed_storage::<T>(&mut self.storages, id, self.config.component_capacity);

        match set.owner(entity.id()) {
            Some(owner) if owner == entity => {
                return Err(EcsError::AlreadyPresent {
                    entity,
                    component: id,
                });
            }
            Some(orphan) => {
                debug!(
                    %orphan,
                    %entity,
                    component = std::any::type_name::<T>(),
                    "reclaiming orphaned component"
                );
                set.remove(entity.id());
            }
            None => {}
        }

        self.attached[entity.index()].push(id);
        set.insert(entity, value).ok_or(EcsError::AlreadyPresent {
            entity,
            component: id,
        })
    }

    /// Return the entity's `T`, attaching `init()` first if it has none.
    ///
    /// `None` only for a dead handle.
    pub fn get_or_insert_with<T: Component>(
        &mut self,
        entity: Entity,
        init: impl FnOnce() -> T,
    ) -> Option<&mut T> {
        if !self.entities.is_alive(entity) {
            return None;
        }

        let id = self.components.ensure::<T>();
        let set = typed_storage::<T>(&mut self.storages, id, self.config.component_capacity);

        if set.index().contains_entity(entity) {
            return set.fetch_mut(entity);
        }
        if set.contains(entity.id()) {
            set.remove(entity.id());
        }

        self.attached[entity.index()].push(id);
        set.insert(entity, init())
    }

    /// Get a reference to a component.
    #[must_use]
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        if !self.entities.is_alive(entity) {
            return None;
        }
        self.storage::<T>()?.fetch(entity)
    }

    /// Get a mutable reference to a component.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.entities.is_alive(entity) {
            return None;
        }
        self.storage_mut::<T>()?.fetch_mut(entity)
    }

    /// Check if an entity has a component.
    #[must_use]
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.component_id::<T>()
            .is_some_and(|id| self.has_id(entity, id))
    }

    /// Check if an entity has the component with the given id.
    #[must_use]
    pub fn has_id(&self, entity: Entity, id: ComponentId) -> bool {
        self.entities.is_alive(entity)
            && self
                .storage_by_id(id)
                .is_some_and(|storage| storage.index().contains_entity(entity))
    }

    /// Untyped pointer to a component, for tooling that walks components
    /// without compile-time type knowledge.
    #[must_use]
    pub fn raw(&self, entity: Entity, id: ComponentId) -> Option<NonNull<u8>> {
        if !self.entities.is_alive(entity) {
            return None;
        }
        let storage = self.storage_by_id(id)?;
        if !storage.index().contains_entity(entity) {
            return None;
        }
        storage.get_ptr(entity.id())
    }

    pub fn raw_mut(&mut self, entity: Entity, id: ComponentId) -> Option<NonNull<u8>> {
        if !self.entities.is_alive(entity) {
            return None;
        }
        let storage = self.storages.get_mut(id.index())?.as_deref_mut()?;
        if !storage.index().contains_entity(entity) {
            return None;
        }
        storage.get_mut_ptr(entity.id())
    }

    /// Component ids attached to a live entity, in attach order.
    #[must_use]
    pub fn component_ids(&self, entity: Entity) -> &[ComponentId] {
        if self.entities.is_alive(entity) {
            &self.attached[entity.index()]
        } else {
            &[]
        }
    }

    /// Detach `T` from `entity`.
    ///
    /// Returns `false` if the entity is dead, has no `T`, or the removal hook
    /// vetoed; nothing is mutated in any of those cases.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> bool {
        self.component_id::<T>()
            .is_some_and(|id| self.remove_id(entity, id).is_ok())
    }

    pub fn try_remove<T: Component>(&mut self, entity: Entity) -> EcsResult<()> {
        let id = self.components.ensure::<T>();
        self.remove_id(entity, id)
    }

    /// Detach the component with the given id.
    pub fn remove_id(&mut self, entity: Entity, id: ComponentId) -> EcsResult<()> {
        if !self.entities.is_alive(entity) {
            return Err(EcsError::DeadEntity(entity));
        }

        let missing = EcsError::Missing {
            entity,
            component: id,
        };
        let on_remove = self.components.hooks(id).on_remove();
        let Some(storage) = self.storages.get_mut(id.index()).and_then(Option::as_deref_mut) else {
            return Err(missing);
        };
        if !storage.index().contains_entity(entity) {
            return Err(missing);
        }
        if !veto_allows(on_remove, storage, entity.id()) {
            return Err(EcsError::Vetoed {
                entity,
                component: id,
            });
        }

        storage.remove(entity.id());
        self.detach(entity, id);
        Ok(())
    }

    /// Detach `T` and hand the value back. The removal hook still applies.
    pub fn take<T: Component>(&mut self, entity: Entity) -> Option<T> {
        if !self.entities.is_alive(entity) {
            return None;
        }

        let id = self.component_id::<T>()?;
        let on_remove = self.components.hooks(id).on_remove();
        let storage = self.storages.get_mut(id.index())?.as_deref_mut()?;
        if !storage.index().contains_entity(entity) || !veto_allows(on_remove, storage, entity.id())
        {
            return None;
        }

        let value = storage::downcast_mut::<T>(storage)?.remove(entity.id());
        self.detach(entity, id);
        value
    }

    fn detach(&mut self, entity: Entity, id: ComponentId) {
        let list = &mut self.attached[entity.index()];
        if let Some(pos) = list.iter().position(|&attached| attached == id) {
            list.remove(pos);
        }
    }

    // ==================== Hooks ====================

    /// Run the enable (`flag = true`) or disable hook of one component.
    ///
    /// Returns whether a hook ran.
    pub fn enable(&mut self, entity: Entity, id: ComponentId, flag: bool) -> bool {
        let hooks = self.components.hooks(id);
        let hook = if flag { hooks.enable() } else { hooks.disable() };
        self.run_hook(entity, id, hook)
    }

    pub fn disable(&mut self, entity: Entity, id: ComponentId) -> bool {
        self.enable(entity, id, false)
    }

    pub fn enable_component<T: Component>(&mut self, entity: Entity) -> bool {
        self.component_id::<T>()
            .is_some_and(|id| self.enable(entity, id, true))
    }

    pub fn disable_component<T: Component>(&mut self, entity: Entity) -> bool {
        self.component_id::<T>()
            .is_some_and(|id| self.enable(entity, id, false))
    }

    /// The enabled predicate of the entity's `T`.
    ///
    /// `None` if the entity has no `T`; `Some(true)` for types without a
    /// predicate.
    #[must_use]
    pub fn is_enabled<T: Component>(&self, entity: Entity) -> Option<bool> {
        let id = self.component_id::<T>()?;
        let ptr = self.raw(entity, id)?;
        let enabled = match self.components.hooks(id).is_enabled() {
            // SAFETY: ptr comes from T's own storage and is live for this call
            Some(predicate) => unsafe { predicate(ptr.as_ptr().cast_const()) },
            None => true,
        };
        Some(enabled)
    }

    fn run_hook(&mut self, entity: Entity, id: ComponentId, hook: Option<HookFn>) -> bool {
        let Some(hook) = hook else {
            return false;
        };
        match self.raw_mut(entity, id) {
            Some(ptr) => {
                // SAFETY: hook was built for the type stored under `id`
                unsafe { hook(ptr.as_ptr()) };
                true
            }
            None => false,
        }
    }

    /// Run one hook slot on every component attached to `entity`.
    fn run_for_attached(
        &mut self,
        entity: Entity,
        select: fn(&ComponentHooks) -> Option<HookFn>,
    ) -> usize {
        if !self.entities.is_alive(entity) {
            return 0;
        }

        let mut ran = 0;
        for &id in &self.attached[entity.index()] {
            let Some(hook) = select(self.components.hooks(id)) else {
                continue;
            };
            let Some(storage) = self.storages.get_mut(id.index()).and_then(Option::as_deref_mut)
            else {
                continue;
            };
            if let Some(ptr) = storage.get_mut_ptr(entity.id()) {
                // SAFETY: hook was built for the type stored under `id`
                unsafe { hook(ptr.as_ptr()) };
                ran += 1;
            }
        }
        ran
    }

    /// Run `on_acquire` on every attached component; returns how many ran.
    pub fn acquire(&mut self, entity: Entity) -> usize {
        self.run_for_attached(entity, ComponentHooks::on_acquire)
    }

    /// Run `on_release` on every attached component; returns how many ran.
    pub fn release(&mut self, entity: Entity) -> usize {
        self.run_for_attached(entity, ComponentHooks::on_release)
    }

    /// Switch an entity between [`Active`] and [`Inactive`], then run the
    /// matching activation hook of every attached component.
    ///
    /// Returns `false` if the entity is dead or already in that state.
    pub fn set_active(&mut self, entity: Entity, active: bool) -> bool {
        if !self.entities.is_alive(entity) {
            return false;
        }

        if active {
            if self.has::<Active>(entity) {
                return false;
            }
            let had_inactive = self.has::<Inactive>(entity);
            let removed = self.remove::<Inactive>(entity);
            debug_assert_eq!(removed, had_inactive, "tags have no removal veto");
            let added = self.emplace(entity, Active).is_some();
            debug_assert!(added, "Active was checked absent above");
            self.run_for_attached(entity, ComponentHooks::on_activate);
        } else {
            if self.has::<Inactive>(entity) {
                return false;
            }
            let had_active = self.has::<Active>(entity);
            let removed = self.remove::<Active>(entity);
            debug_assert_eq!(removed, had_active, "tags have no removal veto");
            let added = self.emplace(entity, Inactive).is_some();
            debug_assert!(added, "Inactive was checked absent above");
            self.run_for_attached(entity, ComponentHooks::on_deactivate);
        }
        true
    }

    #[must_use]
    pub fn is_active(&self, entity: Entity) -> bool {
        self.has::<Active>(entity)
    }

    // ==================== Cloning ====================

    /// Copy every cloneable component of `source` onto `target`.
    ///
    /// Types without a clone hook, and types `target` already has, are
    /// skipped and listed in the report. Post-clone hooks run on each fresh
    /// copy with the source instance as argument.
    pub fn clone_components(&mut self, source: Entity, target: Entity) -> EcsResult<CloneReport> {
        if !self.entities.is_alive(source) {
            return Err(EcsError::DeadEntity(source));
        }
        if !self.entities.is_alive(target) {
            return Err(EcsError::DeadEntity(target));
        }
        if source == target {
            return Err(EcsError::SelfClone(source));
        }

        let mut report = CloneReport::default();
        for id in self.attached[source.index()].clone() {
            let hooks = *self.components.hooks(id);
            let Some(clone) = hooks.clone_fn() else {
                report.skipped.push(id);
                continue;
            };
            let Some(storage) = self.storages.get_mut(id.index()).and_then(Option::as_deref_mut)
            else {
                report.skipped.push(id);
                continue;
            };

            match storage.index().owner(target.id()) {
                Some(owner) if owner == target => {
                    report.skipped.push(id);
                    continue;
                }
                Some(_) => {
                    storage.remove(target.id());
                }
                None => {}
            }

            if !clone(storage, source, target) {
                report.skipped.push(id);
                continue;
            }
            if let Some(post_clone) = hooks.post_clone() {
                if let (Some(copy), Some(original)) = (
                    storage.get_mut_ptr(target.id()),
                    storage.get_ptr(source.id()),
                ) {
                    // SAFETY: two distinct live entries of the storage under `id`
                    unsafe { post_clone(copy.as_ptr(), original.as_ptr().cast_const()) };
                }
            }

            self.attached[target.index()].push(id);
            report.cloned.push(id);
        }

        if !report.skipped.is_empty() {
            let skipped: SmallVec<[&str; 8]> = report
                .skipped
                .iter()
                .map(|&id| self.components.name(id))
                .collect();
            debug!(%source, %target, ?skipped, "clone skipped components");
        }

        Ok(report)
    }

    /// Create a new entity carrying copies of `source`'s cloneable components.
    pub fn duplicate(&mut self, source: Entity) -> Option<(Entity, CloneReport)> {
        if !self.entities.is_alive(source) {
            return None;
        }
        let target = self.create();
        let report = self.clone_components(source, target).ok()?;
        Some((target, report))
    }

    // ==================== Storage Access ====================

    /// The dense container of `T`, for direct iteration.
    ///
    /// May contain orphans owned by dead handles; check
    /// [`is_alive`](Self::is_alive) when that matters.
    #[must_use]
    pub fn storage<T: Component>(&self) -> Option<&SparseSet<T>> {
        let id = self.component_id::<T>()?;
        storage::downcast_ref::<T>(self.storage_by_id(id)?)
    }

    fn storage_mut<T: Component>(&mut self) -> Option<&mut SparseSet<T>> {
        let id = self.component_id::<T>()?;
        let storage = self.storages.get_mut(id.index())?.as_deref_mut()?;
        storage::downcast_mut::<T>(storage)
    }

    /// Erased storage for `id`, if any component of that type was ever added.
    #[must_use]
    pub fn storage_by_id(&self, id: ComponentId) -> Option<&dyn AnyStorage> {
        self.storages.get(id.index())?.as_deref()
    }

    /// Drop every orphaned component and return how many were dropped.
    pub fn purge_orphans(&mut self) -> usize {
        let mut purged = 0;
        for storage in self.storages.iter_mut().flatten() {
            let orphans: SmallVec<[EntityId; 8]> = storage
                .index()
                .entities()
                .iter()
                .filter(|&&owner| !self.entities.is_alive(owner))
                .map(|owner| owner.id())
                .collect();

            for slot in orphans {
                storage.remove(slot);
                purged += 1;
            }
        }

        if purged > 0 {
            debug!(purged, "purged orphaned components");
        }
        purged
    }

    /// Split borrow used by mutable views.
    pub(crate) fn parts_mut(
        &mut self,
    ) -> (&EntityAllocator, &ComponentRegistry, &mut [StorageSlot]) {
        (&self.entities, &self.components, &mut self.storages)
    }

    // ==================== Query ====================

    /// Shared typed view over entities holding every type in `Q`.
    ///
    /// The first type in `Q` leads iteration; put the rarest type first.
    #[must_use]
    pub fn view<Q: ComponentSet>(&self) -> View<'_, Q> {
        View::new(self)
    }

    /// Exclusive typed view handing out `&mut` to every type in `Q`.
    ///
    /// # Panics
    ///
    /// Panics if `Q` names the same type twice.
    pub fn view_mut<Q: ComponentSet>(&mut self) -> ViewMut<'_, Q> {
        ViewMut::new(self)
    }

    /// Start a query whose terms are chosen at runtime.
    #[must_use]
    pub fn query(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self)
    }
}

/// Ask the removal hook of the component at `slot`; `true` when absent.
fn veto_allows(on_remove: Option<VetoFn>, storage: &mut dyn AnyStorage, slot: EntityId) -> bool {
    match (on_remove, storage.get_mut_ptr(slot)) {
        // SAFETY: hook was built for the type of this storage
        (Some(veto), Some(ptr)) => unsafe { veto(ptr.as_ptr()) },
        _ => true,
    }
}

/// Sparse set for `T`, created on first use.
fn typed_storage<T: Component>(
    storages: &mut Vec<StorageSlot>,
    id: ComponentId,
    capacity: usize,
) -> &mut SparseSet<T> {
    if id.index() >= storages.len() {
        storages.resize_with(id.index() + 1, || None);
    }
    let storage = storages[id.index()].get_or_insert_with(|| {
        trace!(component = std::any::type_name::<T>(), ?id, "creating storage");
        TypedStorage::<T>::boxed(id, capacity)
    });
    storage::downcast_mut::<T>(storage.as_mut())
        .expect("component id is bound to a single type per registry")
}

/// Startup hook that registers a group of component types.
///
/// ```ignore
/// struct PhysicsPlugin;
///
/// impl Plugin for PhysicsPlugin {
///     fn build(&self, world: &mut World) {
///         world.register::<Velocity>().toggle();
///         world.register_type::<Collider>();
///     }
/// }
/// ```
pub trait Plugin {
    fn build(&self, world: &mut World);
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entity_count", &self.entity_count())
            .field("component_types", &self.components.len())
            .field("storages", &self.storages.iter().flatten().count())
            .finish_non_exhaustive()
    }
}
