//! Test that unions cannot derive Lifecycle.
#![allow(dead_code)]

use tessera_ecs::Lifecycle;

#[derive(Lifecycle)]
union Bits {
    int: u32,
    float: f32,
}

fn main() {}
