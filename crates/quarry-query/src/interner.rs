//! Compiled-condition interning.
//!
//! Filter definitions compile their condition templates at metadata-build
//! time; the interner keys compiled forms by template hash so definitions
//! sharing a template share one [`CompiledCondition`]. The population is
//! bounded by registered definitions, so there is no eviction, just hit and
//! miss counters for visibility.
//!
//! # Example
//!
//! ```
//! use quarry_query::interner::ConditionInterner;
//!
//! let mut interner = ConditionInterner::new();
//! let a = interner.intern("{alias}.tenant_id = :tenant").unwrap();
//! let b = interner.intern("{alias}.tenant_id = :tenant").unwrap();
//! assert!(std::sync::Arc::ptr_eq(&a, &b));
//! assert_eq!(interner.hits(), 1);
//! assert_eq!(interner.misses(), 1);
//! ```

use crate::condition::CompiledCondition;
use quarry_core::Result;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

/// Hash key for one template string.
pub fn template_key(template: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    template.hash(&mut hasher);
    hasher.finish()
}

/// Interns compiled conditions by template hash.
#[derive(Debug, Default)]
pub struct ConditionInterner {
    entries: HashMap<u64, Arc<CompiledCondition>>,
    hits: u64,
    misses: u64,
}

impl ConditionInterner {
    /// Create an empty interner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the compiled form of a template, compiling on first sight.
    ///
    /// Compilation failures are not cached; a corrected template under the
    /// same text would be a different string anyway.
    pub fn intern(&mut self, template: &str) -> Result<Arc<CompiledCondition>> {
        let key = template_key(template);
        if let Some(found) = self.entries.get(&key) {
            self.hits += 1;
            tracing::trace!(template, "condition interner hit");
            return Ok(Arc::clone(found));
        }
        let compiled = Arc::new(CompiledCondition::compile(template)?);
        self.entries.insert(key, Arc::clone(&compiled));
        self.misses += 1;
        tracing::debug!(template, "compiled and interned filter condition");
        Ok(compiled)
    }

    /// Number of interned conditions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Is the interner empty?
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookups that found an interned condition.
    pub const fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookups that had to compile.
    pub const fn misses(&self) -> u64 {
        self.misses
    }

    /// Drop all interned conditions and reset the counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_shares_compiled_form() {
        let mut interner = ConditionInterner::new();
        let first = interner.intern("{alias}.active = 1").unwrap();
        let second = interner.intern("{alias}.active = 1").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(interner.len(), 1);
        assert_eq!(interner.hits(), 1);
        assert_eq!(interner.misses(), 1);
    }

    #[test]
    fn distinct_templates_get_distinct_entries() {
        let mut interner = ConditionInterner::new();
        interner.intern("{alias}.a = 1").unwrap();
        interner.intern("{alias}.b = 2").unwrap();
        assert_eq!(interner.len(), 2);
        assert_eq!(interner.misses(), 2);
    }

    #[test]
    fn failed_compilation_is_not_cached() {
        let mut interner = ConditionInterner::new();
        assert!(interner.intern("{broken").is_err());
        assert!(interner.is_empty());
        assert_eq!(interner.misses(), 0);
    }

    #[test]
    fn clear_resets_everything() {
        let mut interner = ConditionInterner::new();
        interner.intern("{alias}.a = 1").unwrap();
        interner.intern("{alias}.a = 1").unwrap();
        interner.clear();
        assert!(interner.is_empty());
        assert_eq!(interner.hits(), 0);
        assert_eq!(interner.misses(), 0);
    }
}
