//! World configuration.

/// Sizing hints for a [`World`](crate::World).
///
/// Capacities only pre-size allocations; nothing is capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorldConfig {
    /// Entity slots reserved up front.
    pub entity_capacity: usize,
    /// Elements reserved in each component storage when it is first created.
    pub component_capacity: usize,
}

impl WorldConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn entity_capacity(mut self, capacity: usize) -> Self {
        self.entity_capacity = capacity;
        self
    }

    #[must_use]
    pub const fn component_capacity(mut self, capacity: usize) -> Self {
        self.component_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_capacities() {
        let config = WorldConfig::new()
            .entity_capacity(1024)
            .component_capacity(64);

        assert_eq!(config.entity_capacity, 1024);
        assert_eq!(config.component_capacity, 64);
        assert_eq!(WorldConfig::default().entity_capacity, 0);
    }
}
