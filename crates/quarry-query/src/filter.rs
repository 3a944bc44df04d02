//! Filter definitions and enabled filter instances.
//!
//! A filter definition is registered once with the session factory: a name,
//! a raw condition template, and an auto-enable flag. The template is
//! compiled (through the factory's [`ConditionInterner`]) at registration,
//! so malformed templates fail at build time. Sessions enable filters by
//! name, producing a [`FilterInstance`] that holds parameter values and
//! renders the applicable condition against the query's alias resolver.

use crate::alias::AliasResolver;
use crate::condition::CompiledCondition;
use crate::interner::ConditionInterner;
use quarry_core::error::{Error, FilterError, FilterErrorKind};
use quarry_core::{Result, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Attach a filter name to a filter error that was raised without one.
fn name_error(err: Error, filter: &str) -> Error {
    match err {
        Error::Filter(mut e) => {
            if e.filter.is_none() {
                e.filter = Some(filter.to_string());
            }
            Error::Filter(e)
        }
        other => other,
    }
}

/// A named, factory-registered filter.
///
/// Immutable once built; sessions share definitions behind an `Arc`.
#[derive(Debug, Clone)]
pub struct FilterDefinition {
    name: String,
    condition: Arc<CompiledCondition>,
    auto_enabled: bool,
}

impl FilterDefinition {
    /// Build a definition, compiling its template through the interner.
    ///
    /// Compilation failures carry the filter name.
    pub fn build(
        name: impl Into<String>,
        template: &str,
        auto_enabled: bool,
        interner: &mut ConditionInterner,
    ) -> Result<Self> {
        let name = name.into();
        let condition = interner
            .intern(template)
            .map_err(|err| name_error(err, &name))?;
        Ok(Self {
            name,
            condition,
            auto_enabled,
        })
    }

    /// Filter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The compiled condition this filter renders.
    pub fn condition(&self) -> &Arc<CompiledCondition> {
        &self.condition
    }

    /// Parameter names declared by the condition template.
    pub fn parameter_names(&self) -> &[String] {
        self.condition.parameter_names()
    }

    /// Should sessions enable this filter when they open?
    pub const fn is_auto_enabled(&self) -> bool {
        self.auto_enabled
    }
}

/// One enabled filter on a session, with its bound parameter values.
#[derive(Debug, Clone)]
pub struct FilterInstance {
    definition: Arc<FilterDefinition>,
    values: HashMap<String, Value>,
}

impl FilterInstance {
    /// Enable a definition with no parameters bound yet.
    pub fn new(definition: Arc<FilterDefinition>) -> Self {
        Self {
            definition,
            values: HashMap::new(),
        }
    }

    /// Filter name.
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    /// The definition this instance was enabled from.
    pub fn definition(&self) -> &Arc<FilterDefinition> {
        &self.definition
    }

    /// Bind a parameter value, validating the name against the template.
    pub fn set_parameter(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<&mut Self> {
        let name = name.into();
        if !self.definition.parameter_names().iter().any(|p| p == &name) {
            return Err(Error::Filter(FilterError {
                kind: FilterErrorKind::UnknownParameter,
                filter: Some(self.name().to_string()),
                message: format!("filter declares no parameter named '{name}'"),
            }));
        }
        self.values.insert(name, value.into());
        Ok(self)
    }

    /// The bound value for a parameter, if any.
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Declared parameters that have no bound value yet.
    pub fn unbound_parameters(&self) -> Vec<&str> {
        self.definition
            .parameter_names()
            .iter()
            .filter(|name| !self.values.contains_key(name.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Render the applicable condition against the query's alias resolver.
    pub fn render(&self, resolver: &dyn AliasResolver) -> Result<String> {
        self.definition
            .condition
            .render(resolver)
            .map_err(|err| name_error(err, self.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::StaticAliasResolver;

    fn tenant_filter(interner: &mut ConditionInterner) -> Arc<FilterDefinition> {
        Arc::new(
            FilterDefinition::build("tenant", "{alias}.tenant_id = :tenant", false, interner)
                .unwrap(),
        )
    }

    #[test]
    fn definition_scans_parameters() {
        let mut interner = ConditionInterner::new();
        let definition = tenant_filter(&mut interner);
        assert_eq!(definition.name(), "tenant");
        assert_eq!(definition.parameter_names(), ["tenant".to_string()]);
        assert!(!definition.is_auto_enabled());
    }

    #[test]
    fn definitions_share_interned_conditions() {
        let mut interner = ConditionInterner::new();
        let a = tenant_filter(&mut interner);
        let b = Arc::new(
            FilterDefinition::build("tenant_b", "{alias}.tenant_id = :tenant", true, &mut interner)
                .unwrap(),
        );
        assert!(Arc::ptr_eq(a.condition(), b.condition()));
        assert_eq!(interner.hits(), 1);
    }

    #[test]
    fn build_failure_names_the_filter() {
        let mut interner = ConditionInterner::new();
        let err = FilterDefinition::build("broken", "{alias.x = 1", false, &mut interner)
            .unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn instance_validates_parameter_names() {
        let mut interner = ConditionInterner::new();
        let mut instance = FilterInstance::new(tenant_filter(&mut interner));
        assert_eq!(instance.unbound_parameters(), vec!["tenant"]);

        instance.set_parameter("tenant", 42i64).unwrap();
        assert_eq!(instance.parameter("tenant"), Some(&Value::BigInt(42)));
        assert!(instance.unbound_parameters().is_empty());

        let err = instance.set_parameter("region", "emea").unwrap_err();
        match err {
            Error::Filter(e) => {
                assert_eq!(e.kind, FilterErrorKind::UnknownParameter);
                assert_eq!(e.filter.as_deref(), Some("tenant"));
            }
            other => panic!("expected filter error, got {other}"),
        }
    }

    #[test]
    fn instance_renders_through_resolver() {
        let mut interner = ConditionInterner::new();
        let instance = FilterInstance::new(tenant_filter(&mut interner));
        let rendered = instance.render(&StaticAliasResolver::new("t1")).unwrap();
        assert_eq!(rendered, "t1.tenant_id = :tenant");
    }
}
