//! Entity facades.
//!
//! A facade pairs an [`Entity`] handle with a borrow of its [`World`] so
//! component access reads as methods on the entity. Facades are short-lived:
//! store the `Entity` and ask the world for a facade again when needed.
//!
//! ```ignore
//! let player = world
//!     .spawn()
//!     .with(Position { x: 0.0, y: 0.0 })
//!     .with(Health(100))
//!     .id();
//!
//! if let Some(mut entity) = world.entity_mut(player) {
//!     entity.get_mut::<Health>().unwrap().0 -= 10;
//!     entity.set_active(false);
//! }
//! ```

use std::{fmt, ptr::NonNull};

use crate::{
    World,
    component::{Component, ComponentId},
    entity::Entity,
    world::CloneReport,
};

/// Read-only facade.
#[derive(Clone, Copy)]
pub struct EntityRef<'w> {
    world: &'w World,
    entity: Entity,
}

impl<'w> EntityRef<'w> {
    pub(crate) fn new(world: &'w World, entity: Entity) -> Self {
        Self { world, entity }
    }

    #[must_use]
    pub fn id(self) -> Entity {
        self.entity
    }

    #[must_use]
    pub fn is_alive(self) -> bool {
        self.world.is_alive(self.entity)
    }

    #[must_use]
    pub fn get<T: Component>(self) -> Option<&'w T> {
        self.world.get::<T>(self.entity)
    }

    #[must_use]
    pub fn has<T: Component>(self) -> bool {
        self.world.has::<T>(self.entity)
    }

    #[must_use]
    pub fn has_id(self, id: ComponentId) -> bool {
        self.world.has_id(self.entity, id)
    }

    #[must_use]
    pub fn is_active(self) -> bool {
        self.world.is_active(self.entity)
    }

    #[must_use]
    pub fn is_enabled<T: Component>(self) -> Option<bool> {
        self.world.is_enabled::<T>(self.entity)
    }

    /// Attached component ids, in attach order.
    #[must_use]
    pub fn component_ids(self) -> &'w [ComponentId] {
        self.world.component_ids(self.entity)
    }

    #[must_use]
    pub fn raw(self, id: ComponentId) -> Option<NonNull<u8>> {
        self.world.raw(self.entity, id)
    }

    #[must_use]
    pub fn world(self) -> &'w World {
        self.world
    }
}

impl fmt::Debug for EntityRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.world.registry();
        f.debug_struct("EntityRef")
            .field("entity", &self.entity)
            .field(
                "components",
                &self
                    .component_ids()
                    .iter()
                    .map(|&id| registry.name(id))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Mutable facade. Holds the world exclusively, so only one exists at a time.
pub struct EntityMut<'w> {
    world: &'w mut World,
    entity: Entity,
}

impl<'w> EntityMut<'w> {
    pub(crate) fn new(world: &'w mut World, entity: Entity) -> Self {
        Self { world, entity }
    }

    #[must_use]
    pub fn id(&self) -> Entity {
        self.entity
    }

    /// Attach `value` and keep building. A type already present is left
    /// untouched.
    pub fn with<T: Component>(self, value: T) -> Self {
        self.world.emplace(self.entity, value);
        self
    }

    /// Attach `value`; `None` if the entity already has a `T`.
    pub fn add<T: Component>(&mut self, value: T) -> Option<&mut T> {
        self.world.emplace(self.entity, value)
    }

    #[must_use]
    pub fn get<T: Component>(&self) -> Option<&T> {
        self.world.get::<T>(self.entity)
    }

    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.world.get_mut::<T>(self.entity)
    }

    pub fn get_or_add<T: Component>(&mut self, init: impl FnOnce() -> T) -> Option<&mut T> {
        self.world.get_or_insert_with(self.entity, init)
    }

    #[must_use]
    pub fn has<T: Component>(&self) -> bool {
        self.world.has::<T>(self.entity)
    }

    /// Detach `T`; `false` if absent or vetoed.
    pub fn remove<T: Component>(&mut self) -> bool {
        self.world.remove::<T>(self.entity)
    }

    pub fn take<T: Component>(&mut self) -> Option<T> {
        self.world.take::<T>(self.entity)
    }

    pub fn enable<T: Component>(&mut self) -> bool {
        self.world.enable_component::<T>(self.entity)
    }

    pub fn disable<T: Component>(&mut self) -> bool {
        self.world.disable_component::<T>(self.entity)
    }

    /// See [`World::set_active`].
    pub fn set_active(&mut self, active: bool) -> bool {
        self.world.set_active(self.entity, active)
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.world.is_active(self.entity)
    }

    /// Copy this entity's cloneable components onto a fresh entity.
    pub fn duplicate(&mut self) -> Option<(Entity, CloneReport)> {
        self.world.duplicate(self.entity)
    }

    /// Reborrow as a read-only facade.
    #[must_use]
    pub fn as_readonly(&self) -> EntityRef<'_> {
        EntityRef::new(&*self.world, self.entity)
    }

    #[must_use]
    pub fn into_readonly(self) -> EntityRef<'w> {
        EntityRef::new(&*self.world, self.entity)
    }

    pub fn world(&mut self) -> &mut World {
        &mut *self.world
    }

    /// Destroy the entity, consuming the facade.
    pub fn destroy(self) -> bool {
        self.world.destroy(self.entity)
    }
}

impl fmt::Debug for EntityMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.as_readonly(), f)
    }
}
