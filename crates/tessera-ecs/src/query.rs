//! Runtime query builder.
//!
//! Where a [`View`](crate::View) fixes its component types at compile time,
//! a query is assembled from terms chosen at runtime, by type or by
//! [`ComponentId`]. This suits tooling and scripting layers that only know
//! component ids.
//!
//! ```ignore
//! let query = world.query()
//!     .with::<Position>()
//!     .with_id(velocity_id)
//!     .without::<Frozen>()
//!     .enabled_only()
//!     .build();
//!
//! for row in query.iter(&world) {
//!     let pos = row.get::<Position>();
//!     let vel = row.raw(velocity_id);
//! }
//! ```
//!
//! Terms are resolved against the registry when the query is built. A
//! required type that was never registered makes the query match nothing; an
//! excluded type that was never registered excludes nothing.

use std::ptr::NonNull;

use crate::{
    World,
    component::{Component, ComponentId},
    entity::Entity,
    view::{Matcher, Ptrs},
    world::ComponentList,
};

// ============================================================================
// Term Types
// ============================================================================

/// How a component is used by a query term.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TermAccess {
    /// Entity must have the component.
    With,
    /// Entity must NOT have the component.
    Without,
}

/// A single term in a query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryTerm {
    pub component_id: ComponentId,
    pub access: TermAccess,
}

// ============================================================================
// Query Builder
// ============================================================================

/// Builder for constructing queries via method chaining.
pub struct QueryBuilder<'w> {
    world: &'w World,
    terms: Vec<QueryTerm>,
    enabled_only: bool,
    unresolved: bool,
}

impl<'w> QueryBuilder<'w> {
    /// Create a new query builder.
    #[must_use]
    pub fn new(world: &'w World) -> Self {
        Self {
            world,
            terms: Vec::new(),
            enabled_only: false,
            unresolved: false,
        }
    }

    /// Require component `T`. The first required term leads iteration.
    #[must_use]
    pub fn with<T: Component>(mut self) -> Self {
        match self.world.component_id::<T>() {
            Some(id) => self.with_id(id),
            None => {
                self.unresolved = true;
                self
            }
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: ComponentId) -> Self {
        self.terms.push(QueryTerm {
            component_id: id,
            access: TermAccess::With,
        });
        self
    }

    /// Exclude entities that have component `T`.
    #[must_use]
    pub fn without<T: Component>(self) -> Self {
        match self.world.component_id::<T>() {
            Some(id) => self.without_id(id),
            None => self,
        }
    }

    #[must_use]
    pub fn without_id(mut self, id: ComponentId) -> Self {
        self.terms.push(QueryTerm {
            component_id: id,
            access: TermAccess::Without,
        });
        self
    }

    /// Skip entities where any required component reports itself disabled.
    #[must_use]
    pub fn enabled_only(mut self) -> Self {
        self.enabled_only = true;
        self
    }

    /// Build the query.
    #[must_use]
    pub fn build(self) -> Query {
        let mut required = ComponentList::new();
        let mut excluded = ComponentList::new();
        for term in &self.terms {
            match term.access {
                TermAccess::With => required.push(term.component_id),
                TermAccess::Without => excluded.push(term.component_id),
            }
        }

        Query {
            terms: self.terms,
            required,
            excluded,
            enabled_only: self.enabled_only,
            unresolved: self.unresolved,
        }
    }
}

// ============================================================================
// Query
// ============================================================================

/// A built query, reusable across frames on any world sharing the registry
/// it was built against.
#[derive(Clone)]
pub struct Query {
    terms: Vec<QueryTerm>,
    required: ComponentList,
    excluded: ComponentList,
    enabled_only: bool,
    unresolved: bool,
}

impl Query {
    /// Get the query terms.
    #[must_use]
    pub fn terms(&self) -> &[QueryTerm] {
        &self.terms
    }

    /// Whether the query can never match, because a required type was never
    /// registered or no type is required.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unresolved || self.required.is_empty()
    }

    /// Iterate over matching entities.
    #[must_use]
    pub fn iter<'w>(&self, world: &'w World) -> QueryIter<'w> {
        let matcher = if self.unresolved {
            None
        } else {
            Matcher::shared(world, &self.required, &self.excluded, self.enabled_only)
        };

        QueryIter {
            world,
            matcher,
            required: self.required.clone(),
            pos: 0,
            ptrs: Ptrs::new(),
        }
    }

    /// Execute a callback for each matching row.
    pub fn each<F>(&self, world: &World, mut f: F)
    where
        F: FnMut(QueryRow<'_>),
    {
        for row in self.iter(world) {
            f(row);
        }
    }
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("terms", &self.terms)
            .field("enabled_only", &self.enabled_only)
            .field("unresolved", &self.unresolved)
            .finish()
    }
}

// ============================================================================
// Query Iterator
// ============================================================================

/// Iterator over query results.
pub struct QueryIter<'w> {
    world: &'w World,
    matcher: Option<Matcher<'w>>,
    required: ComponentList,
    pos: usize,
    ptrs: Ptrs,
}

impl<'w> Iterator for QueryIter<'w> {
    type Item = QueryRow<'w>;

    fn next(&mut self) -> Option<Self::Item> {
        let matcher = self.matcher.as_ref()?;
        while self.pos < matcher.len() {
            let pos = self.pos;
            self.pos += 1;
            if let Some(entity) = matcher.probe(pos, &mut self.ptrs) {
                return Some(QueryRow {
                    world: self.world,
                    entity,
                    required: self.required.clone(),
                    ptrs: self.ptrs.clone(),
                });
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .matcher
            .as_ref()
            .map_or(0, |matcher| matcher.len() - self.pos);
        (0, Some(remaining))
    }
}

// ============================================================================
// Query Row
// ============================================================================

/// A single row from a query result.
///
/// Carries the column pointers resolved while matching, one per required
/// term in the order the terms were added.
#[derive(Clone)]
pub struct QueryRow<'w> {
    world: &'w World,
    entity: Entity,
    required: ComponentList,
    ptrs: Ptrs,
}

impl<'w> QueryRow<'w> {
    /// Get the entity for this row.
    #[must_use]
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Get a component of the row's entity, required by the query or not.
    #[must_use]
    pub fn get<T: Component>(&self) -> Option<&'w T> {
        self.world.get::<T>(self.entity)
    }

    /// Check if this row's entity has a component.
    #[must_use]
    pub fn has<T: Component>(&self) -> bool {
        self.world.has::<T>(self.entity)
    }

    /// Untyped pointer to one of the entity's components.
    #[must_use]
    pub fn raw(&self, id: ComponentId) -> Option<NonNull<u8>> {
        self.world.raw(self.entity, id)
    }

    /// Pointer to the `index`-th required component, as matched.
    #[must_use]
    pub fn ptr(&self, index: usize) -> Option<NonNull<u8>> {
        self.ptrs.get(index).copied()
    }

    /// Pointer to a required component by id, without a storage lookup.
    /// `None` when `id` is not a required term of the query.
    #[must_use]
    pub fn required_raw(&self, id: ComponentId) -> Option<NonNull<u8>> {
        let index = self.required.iter().position(|&required| required == id)?;
        self.ptr(index)
    }

    /// Ids of the required terms, in the order of [`ptr`](Self::ptr).
    #[must_use]
    pub fn required(&self) -> &[ComponentId] {
        &self.required
    }

    /// Get the world reference.
    #[must_use]
    pub fn world(&self) -> &'w World {
        self.world
    }
}

impl std::fmt::Debug for QueryRow<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryRow")
            .field("entity", &self.entity)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::Toggle;

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Velocity {
        x: f32,
        y: f32,
        active: bool,
    }

    impl Toggle for Velocity {
        fn enable(&mut self) {
            self.active = true;
        }

        fn disable(&mut self) {
            self.active = false;
        }

        fn is_enabled(&self) -> bool {
            self.active
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Dead;

    fn velocity(x: f32) -> Velocity {
        Velocity {
            x,
            y: 0.0,
            active: true,
        }
    }

    #[test]
    fn test_simple_query() {
        let mut world = World::new();

        let e1 = world.spawn().with(Position { x: 1.0, y: 2.0 }).id();
        let e2 = world.spawn().with(Position { x: 3.0, y: 4.0 }).id();

        let query = world.query().with::<Position>().build();
        let results: Vec<_> = query.iter(&world).map(|row| row.entity()).collect();

        assert_eq!(results.len(), 2);
        assert!(results.contains(&e1));
        assert!(results.contains(&e2));
    }

    #[test]
    fn test_query_multiple_components() {
        let mut world = World::new();

        world.spawn().with(Position { x: 1.0, y: 2.0 });
        let e2 = world
            .spawn()
            .with(Position { x: 3.0, y: 4.0 })
            .with(velocity(1.0))
            .id();

        let query = world.query().with::<Position>().with::<Velocity>().build();
        let rows: Vec<_> = query.iter(&world).collect();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entity(), e2);
        assert_eq!(rows[0].get::<Position>(), Some(&Position { x: 3.0, y: 4.0 }));
        assert!(rows[0].has::<Velocity>());
    }

    #[test]
    fn test_query_without() {
        let mut world = World::new();

        let alive = world.spawn().with(Position { x: 1.0, y: 2.0 }).id();
        world.spawn().with(Position { x: 3.0, y: 4.0 }).with(Dead);

        let query = world.query().with::<Position>().without::<Dead>().build();
        let results: Vec<_> = query.iter(&world).map(|row| row.entity()).collect();

        assert_eq!(results, vec![alive]);
    }

    #[test]
    fn test_query_by_id_and_raw() {
        let mut world = World::new();
        let entity = world.spawn().with(Position { x: 7.0, y: 0.0 }).id();
        let id = world.component_id::<Position>().unwrap();

        let query = world.query().with_id(id).build();
        let row = query.iter(&world).next().unwrap();
        let ptr = row.raw(id).unwrap();

        assert_eq!(row.entity(), entity);
        // SAFETY: id belongs to Position
        assert_eq!(unsafe { ptr.cast::<Position>().as_ref() }.x, 7.0);
    }

    #[test]
    fn test_query_row_pointers_match_storage() {
        let mut world = World::new();
        world.spawn().with(Position { x: 1.0, y: 0.0 });
        for i in 0..4u8 {
            let x = f32::from(i);
            world.spawn().with(velocity(x)).with(Position { x, y: x });
        }
        world.spawn().with(velocity(9.0));

        let pos_id = world.component_id::<Position>().unwrap();
        let vel_id = world.component_id::<Velocity>().unwrap();
        let query = world.query().with::<Velocity>().with_id(pos_id).build();

        let mut seen = 0;
        for row in query.iter(&world) {
            let entity = row.entity();
            assert_eq!(row.required(), &[vel_id, pos_id]);
            assert_eq!(row.ptr(0), world.raw(entity, vel_id));
            assert_eq!(row.ptr(1), world.raw(entity, pos_id));
            assert_eq!(row.ptr(2), None);
            assert_eq!(row.required_raw(pos_id), world.raw(entity, pos_id));
            assert_eq!(row.required_raw(vel_id), world.raw(entity, vel_id));

            // SAFETY: index 1 is the Position column
            let pos = unsafe { row.ptr(1).unwrap().cast::<Position>().as_ref() };
            assert_eq!(Some(pos), row.get::<Position>());
            seen += 1;
        }
        assert_eq!(seen, 4);
    }

    #[test]
    fn test_query_row_required_raw_ignores_other_types() {
        let mut world = World::new();
        let entity = world.spawn().with(Position { x: 0.0, y: 0.0 }).with(Dead).id();
        let dead_id = world.component_id::<Dead>().unwrap();

        let query = world.query().with::<Position>().build();
        let row = query.iter(&world).next().unwrap();

        assert_eq!(row.required_raw(dead_id), None);
        assert_eq!(row.raw(dead_id), world.raw(entity, dead_id));
        assert!(row.raw(dead_id).is_some());
    }

    #[test]
    fn test_query_enabled_only() {
        let mut world = World::new();
        world.register::<Velocity>().toggle();

        let on = world.spawn().with(Position { x: 0.0, y: 0.0 }).with(velocity(1.0)).id();
        let off = world.spawn().with(Position { x: 0.0, y: 0.0 }).with(velocity(2.0)).id();
        world.disable_component::<Velocity>(off);

        let all = world.query().with::<Position>().with::<Velocity>().build();
        let enabled = world
            .query()
            .with::<Position>()
            .with::<Velocity>()
            .enabled_only()
            .build();

        assert_eq!(all.iter(&world).count(), 2);
        let rows: Vec<_> = enabled.iter(&world).map(|row| row.entity()).collect();
        assert_eq!(rows, vec![on]);
    }

    #[test]
    fn test_query_unregistered_type() {
        let mut world = World::new();
        world.spawn().with(Position { x: 0.0, y: 0.0 });

        let query = world.query().with::<Position>().with::<Velocity>().build();
        assert!(query.is_empty());
        assert_eq!(query.iter(&world).count(), 0);

        let no_terms = world.query().build();
        assert!(no_terms.is_empty());
        assert_eq!(no_terms.iter(&world).count(), 0);
    }

    #[test]
    fn test_query_each() {
        let mut world = World::new();
        world.spawn().with(Position { x: 1.0, y: 0.0 });
        world.spawn().with(Position { x: 2.0, y: 0.0 });

        let query = world.query().with::<Position>().build();
        let mut sum = 0.0;
        query.each(&world, |row| sum += row.get::<Position>().unwrap().x);

        assert_eq!(sum, 3.0);
        assert_eq!(query.terms().len(), 1);
        assert_eq!(query.terms()[0].access, TermAccess::With);
    }
}
