//! Test that a capability listed twice is rejected.
#![allow(dead_code)]

use tessera_ecs::Lifecycle;

#[derive(Lifecycle)]
#[lifecycle(toggle, toggle)]
struct Beacon;

fn main() {}
