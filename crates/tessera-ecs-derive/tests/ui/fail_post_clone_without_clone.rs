//! Test that `post_clone` requires `clone`.
#![allow(dead_code)]

use tessera_ecs::Lifecycle;

#[derive(Lifecycle)]
#[lifecycle(post_clone)]
struct Spawner;

fn main() {}
