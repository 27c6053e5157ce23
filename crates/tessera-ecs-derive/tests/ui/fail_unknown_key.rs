//! Test that unknown capability keys are rejected.
#![allow(dead_code)]

use tessera_ecs::Lifecycle;

#[derive(Lifecycle)]
#[lifecycle(pooled, recycle)]
struct Bullet;

fn main() {}
