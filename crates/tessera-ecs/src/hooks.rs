//! Per-type lifecycle hooks.
//!
//! Each component type may opt into a handful of capability traits. At
//! registration time the registry turns the chosen capabilities into a
//! [`ComponentHooks`] bundle: a fixed set of plain function pointers that
//! call the trait methods through a type-erased pointer. Slots a type did not
//! opt into stay `None` and the store treats them as no-ops, so call sites only
//! ever test the single slot they need.
//!
//! ```ignore
//! world.register::<Health>().on_remove().toggle().cloneable();
//! ```

use bitflags::bitflags;

use crate::{
    component::Component,
    entity::Entity,
    storage::{self, AnyStorage},
};

/// Pooling hooks, run when an entity is handed out from or returned to a pool.
pub trait Pooled {
    /// Called when the owning entity is taken out of a pool.
    fn on_acquire(&mut self);
    /// Called when the owning entity is returned to a pool.
    fn on_release(&mut self);
}

/// Removal veto.
pub trait OnRemove {
    /// Return `false` to keep the component attached.
    fn on_remove(&mut self) -> bool;
}

/// Per-component enable/disable state, consulted by `enabled_only` views.
pub trait Toggle {
    fn enable(&mut self);
    fn disable(&mut self);
    fn is_enabled(&self) -> bool;
}

/// Runs on the fresh copy after an entity clone.
pub trait PostClone {
    fn post_clone(&mut self, source: &Self);
}

/// Activation hooks, run when the owning entity flips between `Active` and
/// `Inactive`.
pub trait Activate {
    fn on_activate(&mut self);
    fn on_deactivate(&mut self);
}

/// Erased `fn(&mut T)`.
pub type HookFn = unsafe fn(*mut u8);
/// Erased `fn(&mut T) -> bool`.
pub type VetoFn = unsafe fn(*mut u8) -> bool;
/// Erased `fn(&T) -> bool`.
pub type PredicateFn = unsafe fn(*const u8) -> bool;
/// Erased `fn(&mut T, &T)`; target first.
pub type PostCloneFn = unsafe fn(*mut u8, *const u8);
/// Copies the source's component into the target's slot of the same storage.
pub type CloneFn = fn(&mut dyn AnyStorage, Entity, Entity) -> bool;

bitflags! {
    /// Which hook slots a bundle has filled.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HookFlags: u16 {
        const ON_ACQUIRE = 1 << 0;
        const ON_RELEASE = 1 << 1;
        const ON_REMOVE = 1 << 2;
        const ENABLE = 1 << 3;
        const DISABLE = 1 << 4;
        const IS_ENABLED = 1 << 5;
        const CLONE = 1 << 6;
        const POST_CLONE = 1 << 7;
        const ON_ACTIVATE = 1 << 8;
        const ON_DEACTIVATE = 1 << 9;
    }
}

/// The hook bundle of one component type.
///
/// Every slot is optional; an empty slot means "do nothing" (or, for the
/// veto and the enabled predicate, "allow"/"enabled").
#[derive(Clone, Copy, Default)]
pub struct ComponentHooks {
    pub(crate) on_acquire: Option<HookFn>,
    pub(crate) on_release: Option<HookFn>,
    pub(crate) on_remove: Option<VetoFn>,
    pub(crate) enable: Option<HookFn>,
    pub(crate) disable: Option<HookFn>,
    pub(crate) is_enabled: Option<PredicateFn>,
    pub(crate) clone: Option<CloneFn>,
    pub(crate) post_clone: Option<PostCloneFn>,
    pub(crate) on_activate: Option<HookFn>,
    pub(crate) on_deactivate: Option<HookFn>,
}

/// Shared bundle returned for ids that were never registered.
pub(crate) static EMPTY_HOOKS: ComponentHooks = ComponentHooks::EMPTY;

impl ComponentHooks {
    /// A bundle with every slot empty.
    pub const EMPTY: Self = Self {
        on_acquire: None,
        on_release: None,
        on_remove: None,
        enable: None,
        disable: None,
        is_enabled: None,
        clone: None,
        post_clone: None,
        on_activate: None,
        on_deactivate: None,
    };

    /// Summarise which slots are filled.
    #[must_use]
    pub fn flags(&self) -> HookFlags {
        let mut flags = HookFlags::empty();
        flags.set(HookFlags::ON_ACQUIRE, self.on_acquire.is_some());
        flags.set(HookFlags::ON_RELEASE, self.on_release.is_some());
        flags.set(HookFlags::ON_REMOVE, self.on_remove.is_some());
        flags.set(HookFlags::ENABLE, self.enable.is_some());
        flags.set(HookFlags::DISABLE, self.disable.is_some());
        flags.set(HookFlags::IS_ENABLED, self.is_enabled.is_some());
        flags.set(HookFlags::CLONE, self.clone.is_some());
        flags.set(HookFlags::POST_CLONE, self.post_clone.is_some());
        flags.set(HookFlags::ON_ACTIVATE, self.on_activate.is_some());
        flags.set(HookFlags::ON_DEACTIVATE, self.on_deactivate.is_some());
        flags
    }

    #[must_use]
    pub const fn on_acquire(&self) -> Option<HookFn> {
        self.on_acquire
    }

    #[must_use]
    pub const fn on_release(&self) -> Option<HookFn> {
        self.on_release
    }

    #[must_use]
    pub const fn on_remove(&self) -> Option<VetoFn> {
        self.on_remove
    }

    #[must_use]
    pub const fn enable(&self) -> Option<HookFn> {
        self.enable
    }

    #[must_use]
    pub const fn disable(&self) -> Option<HookFn> {
        self.disable
    }

    #[must_use]
    pub const fn is_enabled(&self) -> Option<PredicateFn> {
        self.is_enabled
    }

    #[must_use]
    pub const fn clone_fn(&self) -> Option<CloneFn> {
        self.clone
    }

    #[must_use]
    pub const fn post_clone(&self) -> Option<PostCloneFn> {
        self.post_clone
    }

    #[must_use]
    pub const fn on_activate(&self) -> Option<HookFn> {
        self.on_activate
    }

    #[must_use]
    pub const fn on_deactivate(&self) -> Option<HookFn> {
        self.on_deactivate
    }
}

impl std::fmt::Debug for ComponentHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ComponentHooks").field(&self.flags()).finish()
    }
}

// Monomorphic shims stored in the bundle. Each one is only ever called with
// a pointer to a live `T` taken from `T`'s own storage.

pub(crate) unsafe fn acquire_shim<T: Pooled>(ptr: *mut u8) {
    // SAFETY: caller passes a pointer to a live T
    unsafe { (*ptr.cast::<T>()).on_acquire() }
}

pub(crate) unsafe fn release_shim<T: Pooled>(ptr: *mut u8) {
    // SAFETY: caller passes a pointer to a live T
    unsafe { (*ptr.cast::<T>()).on_release() }
}

pub(crate) unsafe fn remove_shim<T: OnRemove>(ptr: *mut u8) -> bool {
    // SAFETY: caller passes a pointer to a live T
    unsafe { (*ptr.cast::<T>()).on_remove() }
}

pub(crate) unsafe fn enable_shim<T: Toggle>(ptr: *mut u8) {
    // SAFETY: caller passes a pointer to a live T
    unsafe { (*ptr.cast::<T>()).enable() }
}

pub(crate) unsafe fn disable_shim<T: Toggle>(ptr: *mut u8) {
    // SAFETY: caller passes a pointer to a live T
    unsafe { (*ptr.cast::<T>()).disable() }
}

pub(crate) unsafe fn is_enabled_shim<T: Toggle>(ptr: *const u8) -> bool {
    // SAFETY: caller passes a pointer to a live T
    unsafe { (*ptr.cast::<T>()).is_enabled() }
}

pub(crate) unsafe fn post_clone_shim<T: PostClone>(target: *mut u8, source: *const u8) {
    // SAFETY: caller passes pointers to two distinct live Ts
    unsafe { (*target.cast::<T>()).post_clone(&*source.cast::<T>()) }
}

pub(crate) unsafe fn activate_shim<T: Activate>(ptr: *mut u8) {
    // SAFETY: caller passes a pointer to a live T
    unsafe { (*ptr.cast::<T>()).on_activate() }
}

pub(crate) unsafe fn deactivate_shim<T: Activate>(ptr: *mut u8) {
    // SAFETY: caller passes a pointer to a live T
    unsafe { (*ptr.cast::<T>()).on_deactivate() }
}

pub(crate) fn clone_shim<T: Component + Clone>(
    storage: &mut dyn AnyStorage,
    source: Entity,
    target: Entity,
) -> bool {
    let Some(set) = storage::downcast_mut::<T>(storage) else {
        return false;
    };
    let Some(value) = set.get(source.id()).cloned() else {
        return false;
    };
    set.insert(target, value).is_some()
}
