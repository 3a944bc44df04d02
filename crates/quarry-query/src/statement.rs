//! Query specifications.
//!
//! A [`QuerySpec`] is the executable description of one SQL query: the text
//! with `:name` parameter tokens, the bound parameter values (scalar or
//! list), and the per-execution options. Parameter names are scanned from
//! the text up front, so binding an undeclared name fails at bind time, not
//! at execution.

use crate::expand;
use quarry_core::error::{Error, QueryError, QueryErrorKind};
use quarry_core::{CacheMode, LockOptions, Result, Value};
use std::collections::HashMap;

/// A bound parameter value: one scalar or an expandable list.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Single value bound to one placeholder
    Scalar(Value),
    /// List expanded to a comma-joined placeholder run
    List(Vec<Value>),
}

/// Per-execution query options.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Cache-mode override for the duration of this query
    pub cache_mode: Option<CacheMode>,
    /// Row locks to request
    pub lock: LockOptions,
    /// Zero-based index of the first row to return
    pub first_row: Option<usize>,
    /// Maximum number of rows to return
    pub max_rows: Option<usize>,
    /// Driver fetch-size hint
    pub fetch_size: Option<u32>,
    /// Statement timeout hint in milliseconds
    pub timeout_ms: Option<u64>,
    /// SQL comment prefixed to the statement text
    pub comment: Option<String>,
}

impl QueryOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cache-mode override.
    pub fn cache_mode(mut self, mode: CacheMode) -> Self {
        self.cache_mode = Some(mode);
        self
    }

    /// Set the lock request.
    pub fn lock(mut self, lock: LockOptions) -> Self {
        self.lock = lock;
        self
    }

    /// Set the zero-based first row.
    pub fn first_row(mut self, row: usize) -> Self {
        self.first_row = Some(row);
        self
    }

    /// Cap the number of returned rows.
    pub fn max_rows(mut self, rows: usize) -> Self {
        self.max_rows = Some(rows);
        self
    }

    /// Set the driver fetch-size hint.
    pub fn fetch_size(mut self, rows: u32) -> Self {
        self.fetch_size = Some(rows);
        self
    }

    /// Set the statement timeout hint.
    pub fn timeout(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }

    /// Prefix the statement with a SQL comment.
    pub fn comment(mut self, text: impl Into<String>) -> Self {
        self.comment = Some(text.into());
        self
    }
}

/// One executable query: SQL text, bound parameters, options.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    sql: String,
    declared: Vec<String>,
    params: HashMap<String, ParamValue>,
    options: QueryOptions,
    collection_filter: bool,
}

impl QuerySpec {
    /// Create a spec over the given SQL text, scanning its `:name` tokens.
    pub fn new(sql: impl Into<String>) -> Self {
        let sql = sql.into();
        let declared = expand::scan_parameters(&sql);
        Self {
            sql,
            declared,
            params: HashMap::new(),
            options: QueryOptions::default(),
            collection_filter: false,
        }
    }

    /// Bind a scalar parameter by name.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        let name = name.into();
        self.check_declared(&name)?;
        self.params.insert(name, ParamValue::Scalar(value.into()));
        Ok(self)
    }

    /// Bind a list parameter by name.
    ///
    /// An empty list is legal at bind time; execution short-circuits to an
    /// empty result instead of producing SQL with a zero-width placeholder
    /// run.
    pub fn bind_list<I, V>(mut self, name: impl Into<String>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let name = name.into();
        self.check_declared(&name)?;
        let values = values.into_iter().map(Into::into).collect();
        self.params.insert(name, ParamValue::List(values));
        Ok(self)
    }

    /// Attach per-execution options.
    #[must_use]
    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// Mark this spec as a collection-filter query.
    ///
    /// Collection filters execute against a loaded collection owner and do
    /// not support scrolling.
    #[must_use]
    pub fn as_collection_filter(mut self) -> Self {
        self.collection_filter = true;
        self
    }

    /// The raw SQL text with `:name` tokens.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Parameter names declared in the SQL text, in first-occurrence order.
    pub fn declared_parameters(&self) -> &[String] {
        &self.declared
    }

    /// The bound value for a parameter, if any.
    pub fn parameter(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// Per-execution options.
    pub fn query_options(&self) -> &QueryOptions {
        &self.options
    }

    /// Is this a collection-filter query?
    pub const fn is_collection_filter(&self) -> bool {
        self.collection_filter
    }

    /// Is any bound list parameter empty?
    pub fn has_empty_list_param(&self) -> bool {
        self.params
            .values()
            .any(|p| matches!(p, ParamValue::List(values) if values.is_empty()))
    }

    /// Declared parameter names that have no bound value yet.
    pub fn unbound_parameters(&self) -> Vec<&str> {
        self.declared
            .iter()
            .filter(|name| !self.params.contains_key(name.as_str()))
            .map(String::as_str)
            .collect()
    }

    fn check_declared(&self, name: &str) -> Result<()> {
        if self.declared.iter().any(|declared| declared == name) {
            Ok(())
        } else {
            Err(Error::Query(QueryError {
                kind: QueryErrorKind::UnknownParameter,
                name: name.to_string(),
                message: format!("statement declares no parameter named '{name}'"),
            }))
        }
    }
}
