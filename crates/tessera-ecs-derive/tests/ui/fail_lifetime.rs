//! Test that borrowed data is rejected in components.
#![allow(dead_code)]

use tessera_ecs::Lifecycle;

#[derive(Lifecycle)]
struct Borrowed<'a> {
    name: &'a str,
}

fn main() {}
