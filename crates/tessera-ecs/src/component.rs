//! Component type registration and metadata.
//!
//! Components are data types that can be attached to entities. The
//! [`ComponentRegistry`] assigns each type a dense [`ComponentId`] and keeps
//! its metadata and lifecycle hook bundle in a table indexed by that id.
//!
//! A registry is an ordinary value: build one at startup, clone it into as
//! many worlds as needed, or let a world grow its own as types show up.

use std::{alloc::Layout, any::TypeId, fmt, marker::PhantomData};

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;

use crate::hooks::{
    self, Activate, ComponentHooks, EMPTY_HOOKS, OnRemove, Pooled, PostClone, Toggle,
};

/// Marker trait for types that can be used as components.
pub trait Component: Send + Sync + 'static {}

// Blanket implementation for all suitable types
impl<T: Send + Sync + 'static> Component for T {}

/// Unique identifier for a component type within one registry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u32);

impl ComponentId {
    /// Create a component ID from a raw value.
    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentId({})", self.0)
    }
}

/// Runtime information about a component type.
#[derive(Clone)]
pub struct ComponentInfo {
    id: ComponentId,
    name: &'static str,
    layout: Layout,
    type_id: TypeId,
    hooks: ComponentHooks,
}

impl ComponentInfo {
    /// Create component info for a concrete type, with no hooks.
    #[must_use]
    pub fn of<T: Component>(id: ComponentId) -> Self {
        Self {
            id,
            name: std::any::type_name::<T>(),
            layout: Layout::new::<T>(),
            type_id: TypeId::of::<T>(),
            hooks: ComponentHooks::EMPTY,
        }
    }

    #[must_use]
    pub const fn id(&self) -> ComponentId {
        self.id
    }

    /// Type name for diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Memory layout, for tooling that reads through `World::raw`.
    #[must_use]
    pub const fn layout(&self) -> Layout {
        self.layout
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.layout.size()
    }

    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[must_use]
    pub const fn hooks(&self) -> &ComponentHooks {
        &self.hooks
    }

    /// Check if this info is for the given type.
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl fmt::Debug for ComponentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInfo")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("size", &self.layout.size())
            .field("hooks", &self.hooks.flags())
            .finish()
    }
}

/// Registry of component types and their lifecycle hooks.
///
/// Lookups by id are a plain vector index. Unknown ids resolve to a shared
/// empty hook bundle, so callers never need a presence check first.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    type_to_id: HashMap<TypeId, ComponentId, FxBuildHasher>,
    infos: Vec<ComponentInfo>,
}

impl ComponentRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component type and return a builder for its hooks.
    ///
    /// Registering a known type keeps its id and existing hooks.
    pub fn register<T: Component>(&mut self) -> Registration<'_, T> {
        let id = self.ensure::<T>();
        Registration {
            info: &mut self.infos[id.index()],
            _marker: PhantomData,
        }
    }

    /// Register a type using its [`Lifecycle`] description.
    pub fn register_type<T: Lifecycle>(&mut self) -> ComponentId {
        T::lifecycle(self.register::<T>()).id()
    }

    /// Id for `T`, registering it with an empty hook bundle if needed.
    pub(crate) fn ensure<T: Component>(&mut self) -> ComponentId {
        let type_id = TypeId::of::<T>();

        if let Some(&id) = self.type_to_id.get(&type_id) {
            return id;
        }

        let id = ComponentId(self.infos.len() as u32);
        self.type_to_id.insert(type_id, id);
        self.infos.push(ComponentInfo::of::<T>(id));

        tracing::debug!(
            component = std::any::type_name::<T>(),
            id = id.as_raw(),
            "registered component type"
        );

        id
    }

    /// Get the component ID for a type, if registered.
    #[must_use]
    pub fn id<T: Component>(&self) -> Option<ComponentId> {
        self.type_to_id.get(&TypeId::of::<T>()).copied()
    }

    /// Get the component ID for a TypeId, if registered.
    #[must_use]
    pub fn id_by_type_id(&self, type_id: TypeId) -> Option<ComponentId> {
        self.type_to_id.get(&type_id).copied()
    }

    /// Get component info by ID.
    #[must_use]
    pub fn info(&self, id: ComponentId) -> Option<&ComponentInfo> {
        self.infos.get(id.index())
    }

    /// Hook bundle for `id`; empty for ids this registry never issued.
    #[inline]
    #[must_use]
    pub fn hooks(&self, id: ComponentId) -> &ComponentHooks {
        self.infos.get(id.index()).map_or(&EMPTY_HOOKS, |info| &info.hooks)
    }

    /// Type name for `id`, or `"<unknown>"`.
    #[must_use]
    pub fn name(&self, id: ComponentId) -> &'static str {
        self.info(id).map_or("<unknown>", ComponentInfo::name)
    }

    /// Get the number of registered components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Iterate over all registered component infos in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentInfo> {
        self.infos.iter()
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("count", &self.len())
            .field("components", &self.infos)
            .finish()
    }
}

/// Builder returned by [`ComponentRegistry::register`].
///
/// Each method opts `T` into one capability and fills the matching hook
/// slots; capabilities not requested stay empty.
pub struct Registration<'r, T> {
    info: &'r mut ComponentInfo,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Component> Registration<'_, T> {
    #[must_use]
    pub fn id(&self) -> ComponentId {
        self.info.id
    }

    #[must_use]
    pub fn hooks(&self) -> &ComponentHooks {
        &self.info.hooks
    }

    /// Fill `on_acquire` and `on_release`.
    pub fn pooled(self) -> Self
    where
        T: Pooled,
    {
        self.info.hooks.on_acquire = Some(hooks::acquire_shim::<T>);
        self.info.hooks.on_release = Some(hooks::release_shim::<T>);
        self.logged()
    }

    /// Fill the removal veto.
    pub fn on_remove(self) -> Self
    where
        T: OnRemove,
    {
        self.info.hooks.on_remove = Some(hooks::remove_shim::<T>);
        self.logged()
    }

    /// Fill `enable`, `disable`, and the enabled predicate.
    pub fn toggle(self) -> Self
    where
        T: Toggle,
    {
        self.info.hooks.enable = Some(hooks::enable_shim::<T>);
        self.info.hooks.disable = Some(hooks::disable_shim::<T>);
        self.info.hooks.is_enabled = Some(hooks::is_enabled_shim::<T>);
        self.logged()
    }

    /// Allow entity clones to copy this component.
    pub fn cloneable(self) -> Self
    where
        T: Clone,
    {
        self.info.hooks.clone = Some(hooks::clone_shim::<T>);
        self.logged()
    }

    /// Fill the post-clone hook. Has no effect unless the type is also
    /// [`cloneable`](Self::cloneable).
    pub fn post_clone(self) -> Self
    where
        T: PostClone,
    {
        self.info.hooks.post_clone = Some(hooks::post_clone_shim::<T>);
        self.logged()
    }

    /// Fill `on_activate` and `on_deactivate`.
    pub fn activation(self) -> Self
    where
        T: Activate,
    {
        self.info.hooks.on_activate = Some(hooks::activate_shim::<T>);
        self.info.hooks.on_deactivate = Some(hooks::deactivate_shim::<T>);
        self.logged()
    }

    fn logged(self) -> Self {
        tracing::debug!(
            component = self.info.name,
            id = self.info.id.as_raw(),
            hooks = ?self.info.hooks.flags(),
            "component hooks updated"
        );
        self
    }
}

impl<T> fmt::Debug for Registration<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Registration").field(&self.info).finish()
    }
}

/// A component type that knows which lifecycle capabilities it has.
///
/// Usually derived:
///
/// ```ignore
/// #[derive(Clone, Lifecycle)]
/// #[lifecycle(clone, toggle)]
/// struct Velocity { x: f32, y: f32, enabled: bool }
/// ```
pub trait Lifecycle: Component + Sized {
    fn lifecycle(registration: Registration<'_, Self>) -> Registration<'_, Self> {
        registration
    }
}
