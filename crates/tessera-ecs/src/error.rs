//! Error types for world operations.
//!
//! Every fallible world operation reports failure by value. The plain
//! `Option`/`bool` methods on [`World`](crate::World) collapse these reasons;
//! the `try_*` variants return them.

use thiserror::Error;

use crate::{component::ComponentId, entity::Entity};

/// Why a world operation did not take effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EcsError {
    /// The handle is stale or was never issued.
    #[error("entity {0} is not alive")]
    DeadEntity(Entity),

    /// The entity already holds a component of this type.
    #[error("entity {entity} already has {component:?}")]
    AlreadyPresent {
        entity: Entity,
        component: ComponentId,
    },

    /// The entity holds no component of this type.
    #[error("entity {entity} has no {component:?}")]
    Missing {
        entity: Entity,
        component: ComponentId,
    },

    /// The component's removal hook refused the removal.
    #[error("removal of {component:?} from entity {entity} was vetoed")]
    Vetoed {
        entity: Entity,
        component: ComponentId,
    },

    /// Source and target of a clone are the same entity.
    #[error("cannot clone entity {0} onto itself")]
    SelfClone(Entity),
}

/// Result alias for world operations.
pub type EcsResult<T> = Result<T, EcsError>;
