//! Lifecycle hooks wired through `#[derive(Lifecycle)]`, exercised the way a
//! pooling subsystem and an activation toggle would drive them.

use tessera_ecs::{
    Activate, EcsError, HookFlags, Inactive, Lifecycle, OnRemove, Pooled, PostClone, Toggle,
    World, WorldConfig,
};

#[derive(Debug, Clone, Default, Lifecycle)]
#[lifecycle(pooled, clone, post_clone, activate)]
struct Projectile {
    fired: u32,
    recycled: u32,
    live: bool,
    lineage: u32,
}

impl Pooled for Projectile {
    fn on_acquire(&mut self) {
        self.fired += 1;
    }

    fn on_release(&mut self) {
        self.recycled += 1;
    }
}

impl PostClone for Projectile {
    fn post_clone(&mut self, source: &Self) {
        self.lineage = source.lineage + 1;
        self.fired = 0;
    }
}

impl Activate for Projectile {
    fn on_activate(&mut self) {
        self.live = true;
    }

    fn on_deactivate(&mut self) {
        self.live = false;
    }
}

#[derive(Debug, Clone, Lifecycle)]
#[lifecycle(toggle, on_remove)]
struct Shield {
    up: bool,
    locked: bool,
}

impl Toggle for Shield {
    fn enable(&mut self) {
        self.up = true;
    }

    fn disable(&mut self) {
        self.up = false;
    }

    fn is_enabled(&self) -> bool {
        self.up
    }
}

impl OnRemove for Shield {
    fn on_remove(&mut self) -> bool {
        !self.locked
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Lifecycle)]
struct Damage(u32);

fn world() -> World {
    let mut world = World::with_config(WorldConfig::new().entity_capacity(16));
    world.register_type::<Projectile>();
    world.register_type::<Shield>();
    world.register_type::<Damage>();
    world
}

#[test]
fn test_derived_hook_flags() {
    let world = world();

    let projectile = world.component_id::<Projectile>().unwrap();
    let shield = world.component_id::<Shield>().unwrap();
    let damage = world.component_id::<Damage>().unwrap();

    assert_eq!(
        world.hooks(projectile).flags(),
        HookFlags::ON_ACQUIRE
            | HookFlags::ON_RELEASE
            | HookFlags::CLONE
            | HookFlags::POST_CLONE
            | HookFlags::ON_ACTIVATE
            | HookFlags::ON_DEACTIVATE
    );
    assert_eq!(
        world.hooks(shield).flags(),
        HookFlags::ENABLE | HookFlags::DISABLE | HookFlags::IS_ENABLED | HookFlags::ON_REMOVE
    );
    assert!(world.hooks(damage).flags().is_empty());
}

#[test]
fn test_pool_cycle() {
    let mut world = world();
    let template = world
        .spawn()
        .with(Projectile::default())
        .with(Damage(4))
        .id();

    // Spawn from a template, fire, recycle
    let (shot, report) = world.duplicate(template).unwrap();
    assert_eq!(report.skipped.as_slice(), &[world.component_id::<Damage>().unwrap()]);
    assert_eq!(world.get::<Projectile>(shot).unwrap().lineage, 1);

    assert_eq!(world.acquire(shot), 1);
    assert!(world.set_active(shot, true));
    assert!(world.get::<Projectile>(shot).unwrap().live);

    assert!(world.set_active(shot, false));
    assert_eq!(world.release(shot), 1);

    let projectile = world.get::<Projectile>(shot).unwrap();
    assert_eq!(projectile.fired, 1);
    assert_eq!(projectile.recycled, 1);
    assert!(!projectile.live);

    // The template never ran a hook
    assert_eq!(world.get::<Projectile>(template).unwrap().fired, 0);
}

#[test]
fn test_active_state_transitions() {
    let mut world = world();
    let entity = world.spawn().with(Projectile::default()).id();

    // Untagged until first toggled
    assert!(!world.is_active(entity));
    assert!(!world.has::<Inactive>(entity));

    assert!(world.set_active(entity, false));
    assert!(!world.set_active(entity, false));
    assert!(world.has::<Inactive>(entity));

    assert!(world.set_active(entity, true));
    assert!(!world.set_active(entity, true));
    assert!(world.is_active(entity));
    assert!(!world.has::<Inactive>(entity));

    let dead = world.create();
    world.destroy(dead);
    assert!(!world.set_active(dead, true));
    assert_eq!(world.acquire(dead), 0);
}

#[test]
fn test_shield_toggle_and_lock() {
    let mut world = world();
    let entity = world
        .spawn()
        .with(Shield {
            up: true,
            locked: true,
        })
        .id();
    let shield = world.component_id::<Shield>().unwrap();

    assert!(world.disable(entity, shield));
    assert_eq!(world.is_enabled::<Shield>(entity), Some(false));
    assert!(world.enable(entity, shield, true));
    assert_eq!(world.is_enabled::<Shield>(entity), Some(true));

    assert_eq!(
        world.try_remove::<Shield>(entity),
        Err(EcsError::Vetoed {
            entity,
            component: shield
        })
    );

    world.get_mut::<Shield>(entity).unwrap().locked = false;
    assert_eq!(world.try_remove::<Shield>(entity), Ok(()));
    assert_eq!(
        world.try_remove::<Shield>(entity),
        Err(EcsError::Missing {
            entity,
            component: shield
        })
    );
}

#[test]
fn test_error_messages() {
    let mut world = world();
    let entity = world.create();
    world.destroy(entity);

    let message = world.try_emplace(entity, Damage(1)).unwrap_err().to_string();
    assert!(message.contains("not alive"));
    assert!(message.contains(&entity.to_string()));
}
