use tessera_ecs::{HookFlags, Lifecycle, World};

#[derive(Clone, Lifecycle)]
#[lifecycle(clone)]
struct Tagged<T: Clone + Send + Sync + 'static> {
    value: T,
}

fn main() {
    let mut world = World::new();
    let id = world.register_type::<Tagged<u64>>();

    assert_eq!(world.hooks(id).flags(), HookFlags::CLONE);

    let source = world.spawn().with(Tagged { value: 7u64 }).id();
    let (copy, report) = world.duplicate(source).unwrap();
    assert!(report.is_complete());
    assert_eq!(world.get::<Tagged<u64>>(copy).map(|t| t.value), Some(7));
}
