//! Fetch profiles: named, factory-registered fetch-strategy bundles.

/// Fetch strategy an override selects for one attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// Fetch in the owning query via a join.
    Join,
    /// Fetch with a follow-up select.
    Select,
}

/// One fetch-strategy override inside a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOverride {
    entity: String,
    role: String,
    strategy: FetchStrategy,
}

impl FetchOverride {
    /// Override the strategy for one attachment role of one entity.
    pub fn new(
        entity: impl Into<String>,
        role: impl Into<String>,
        strategy: FetchStrategy,
    ) -> Self {
        Self {
            entity: entity.into(),
            role: role.into(),
            strategy,
        }
    }

    /// Entity the override applies to.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Attachment role the override applies to.
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Selected strategy.
    pub const fn strategy(&self) -> FetchStrategy {
        self.strategy
    }
}

/// A named bundle of fetch-strategy overrides.
///
/// Registered with the factory at build time; sessions toggle profiles by
/// name, and batch loads may enable or disable them for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchProfile {
    name: String,
    overrides: Vec<FetchOverride>,
}

impl FetchProfile {
    /// Create an empty profile.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overrides: Vec::new(),
        }
    }

    /// Add one override.
    #[must_use]
    pub fn with_override(mut self, fetch_override: FetchOverride) -> Self {
        self.overrides.push(fetch_override);
        self
    }

    /// Profile name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The overrides this profile carries.
    pub fn overrides(&self) -> &[FetchOverride] {
        &self.overrides
    }

    /// The strategy this profile selects for an entity/role pair, if any.
    pub fn strategy_for(&self, entity: &str, role: &str) -> Option<FetchStrategy> {
        self.overrides
            .iter()
            .find(|o| o.entity() == entity && o.role() == role)
            .map(FetchOverride::strategy)
    }
}
