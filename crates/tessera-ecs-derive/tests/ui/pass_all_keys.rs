use tessera_ecs::{Activate, HookFlags, Lifecycle, OnRemove, Pooled, PostClone, Toggle, World};

#[derive(Clone, Default, Lifecycle)]
#[lifecycle(pooled, on_remove, toggle)]
#[lifecycle(clone, post_clone, activate)]
struct Everything {
    enabled: bool,
    generation: u32,
}

impl Pooled for Everything {
    fn on_acquire(&mut self) {}

    fn on_release(&mut self) {}
}

impl OnRemove for Everything {
    fn on_remove(&mut self) -> bool {
        true
    }
}

impl Toggle for Everything {
    fn enable(&mut self) {
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.enabled = false;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl PostClone for Everything {
    fn post_clone(&mut self, source: &Self) {
        self.generation = source.generation + 1;
    }
}

impl Activate for Everything {
    fn on_activate(&mut self) {}

    fn on_deactivate(&mut self) {}
}

fn main() {
    let mut world = World::new();
    let id = world.register_type::<Everything>();

    assert_eq!(world.hooks(id).flags(), HookFlags::all());
}
