// Allow unsafe code in ECS - necessary for type-erased component storage
#![allow(unsafe_code)]
// Allow missing docs for now
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_safety_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::ptr_as_ptr)]
#![allow(clippy::cast_ptr_alignment)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::float_cmp)]

//! Tessera ECS - sparse-set Entity Component System
//!
//! Every component type lives in its own dense array, keyed by entity slot
//! through a sparse index. Adding or removing a component touches exactly one
//! array and never moves the entity's other data.
//!
//! # Key Concepts
//!
//! - **Entity**: A generational handle; stale handles never validate again
//! - **Component**: Any `Send + Sync + 'static` type attached to entities
//! - **Hooks**: Optional per-type lifecycle callbacks chosen at registration
//! - **View**: Typed iteration over entities holding a set of components
//! - **Query**: The same filtering driven by runtime component ids
//!
//! # Example
//!
//! ```ignore
//! use tessera_ecs::prelude::*;
//!
//! #[derive(Clone, Lifecycle)]
//! #[lifecycle(clone, toggle)]
//! struct Velocity { x: f32, y: f32, enabled: bool }
//!
//! let mut world = World::new();
//! world.register_type::<Velocity>();
//!
//! let ship = world
//!     .spawn()
//!     .with(Position { x: 0.0, y: 0.0 })
//!     .with(Velocity { x: 1.0, y: 0.0, enabled: true })
//!     .id();
//!
//! for (_, (pos, vel)) in world.view_mut::<(Position, Velocity)>().enabled_only() {
//!     pos.x += vel.x;
//! }
//! ```

mod component;
mod config;
mod entity;
mod entity_ref;
mod error;
mod hooks;
mod query;
mod storage;
mod view;
mod world;

pub use component::{
    Component, ComponentId, ComponentInfo, ComponentRegistry, Lifecycle, Registration,
};
pub use config::WorldConfig;
pub use entity::{Entity, EntityAllocator, EntityId, Generation};
pub use entity_ref::{EntityMut, EntityRef};
pub use error::{EcsError, EcsResult};
pub use hooks::{
    Activate, CloneFn, ComponentHooks, HookFlags, HookFn, OnRemove, Pooled, PostClone,
    PostCloneFn, PredicateFn, Toggle, VetoFn,
};
pub use query::{Query, QueryBuilder, QueryIter, QueryRow, QueryTerm, TermAccess};
pub use storage::{AnyStorage, SparseIndex, SparseSet};
pub use tessera_ecs_derive::Lifecycle;
pub use view::{ComponentSet, View, ViewIter, ViewIterMut, ViewMut};
pub use world::{Active, CloneReport, Inactive, Plugin, World};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Activate, Active, Component, Entity, Inactive, Lifecycle, OnRemove, Plugin, Pooled,
        PostClone, Toggle, World,
    };
}
