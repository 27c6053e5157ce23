use tessera_ecs::{Lifecycle, World};

#[derive(Lifecycle)]
struct Marker;

#[derive(Lifecycle)]
enum Team {
    Red,
    Blue,
}

fn main() {
    let mut world = World::new();
    let marker = world.register_type::<Marker>();
    let team = world.register_type::<Team>();

    assert!(world.hooks(marker).flags().is_empty());
    assert!(world.hooks(team).flags().is_empty());

    let entity = world.spawn().with(Marker).with(Team::Blue).id();
    assert!(matches!(world.get::<Team>(entity), Some(Team::Blue)));
    assert!(!matches!(world.get::<Team>(entity), Some(Team::Red)));
}
