//! Query specifications, dialects, and filter-condition rendering for Quarry.
//!
//! This crate covers everything between "the application described a query"
//! and "the connectivity layer received final SQL":
//!
//! - [`QuerySpec`]/[`QueryOptions`] executable query descriptions with named
//!   scalar and list parameters
//! - [`expand::expand`] named-parameter expansion into dialect placeholders
//!   and the flat bind vector
//! - [`Dialect`] placeholder, quoting, row-window, and lock-suffix rendering
//! - [`AliasResolver`] strategies and [`CompiledCondition`] filter-condition
//!   templates with alias markers
//! - [`FilterDefinition`]/[`FilterInstance`] factory-registered filters and
//!   the [`ConditionInterner`] that shares compiled templates

pub mod alias;
pub mod condition;
pub mod dialect;
pub mod expand;
pub mod filter;
pub mod interner;
pub mod statement;

pub use alias::{
    AliasResolver, GroupAliasResolver, IndexedAliasResolver, StaticAliasResolver, TableGroup,
};
pub use condition::CompiledCondition;
pub use dialect::Dialect;
pub use expand::{scan_parameters, ExpandedQuery};
pub use filter::{FilterDefinition, FilterInstance};
pub use interner::ConditionInterner;
pub use statement::{ParamValue, QueryOptions, QuerySpec};
