//! Named-parameter expansion.
//!
//! Turns a [`QuerySpec`]'s `:name` tokens into dialect placeholders and the
//! flat bind vector the connectivity layer consumes. List parameters expand
//! to comma-joined placeholder runs; `::` type casts are left untouched.

use crate::dialect::Dialect;
use crate::statement::{ParamValue, QuerySpec};
use quarry_core::error::{Error, QueryError, QueryErrorKind};
use quarry_core::{Result, Value};
use regex::Regex;
use std::sync::OnceLock;

/// Matches `:name` tokens and `::cast` sequences; the latter are skipped.
fn param_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r":{1,2}[A-Za-z_][A-Za-z0-9_]*").expect("parameter token pattern is valid")
    })
}

/// Scan the `:name` parameter tokens out of SQL text.
///
/// Returns each distinct name once, in first-occurrence order. `::` cast
/// sequences do not count as parameters.
pub fn scan_parameters(sql: &str) -> Vec<String> {
    let mut names = Vec::new();
    for token in param_token_re().find_iter(sql) {
        let text = token.as_str();
        if text.starts_with("::") {
            continue;
        }
        let name = &text[1..];
        if !names.iter().any(|existing| existing == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// A fully expanded statement: final SQL and bind values in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedQuery {
    /// SQL with dialect placeholders, window clause, and lock suffix applied
    pub sql: String,
    /// Bind values in placeholder order
    pub binds: Vec<Value>,
}

/// Expand a spec for one dialect.
///
/// Fails when a declared parameter has no bound value. An empty bound list
/// expands to a single NULL bind, which matches no rows under `IN`; callers
/// that want to skip execution entirely check
/// [`QuerySpec::has_empty_list_param`] first.
pub fn expand(spec: &QuerySpec, dialect: Dialect) -> Result<ExpandedQuery> {
    if let Some(name) = spec.unbound_parameters().first() {
        return Err(Error::Query(QueryError {
            kind: QueryErrorKind::UnboundParameter,
            name: (*name).to_string(),
            message: format!("no value bound for parameter '{name}'"),
        }));
    }

    let source = spec.sql();
    let mut sql = String::with_capacity(source.len());
    let mut binds = Vec::new();
    let mut next_index = 1usize;
    let mut cursor = 0usize;

    for token in param_token_re().find_iter(source) {
        sql.push_str(&source[cursor..token.start()]);
        cursor = token.end();

        let text = token.as_str();
        if text.starts_with("::") {
            sql.push_str(text);
            continue;
        }

        let name = &text[1..];
        // unbound_parameters() was empty, so the lookup cannot miss
        match spec.parameter(name) {
            Some(ParamValue::Scalar(value)) => {
                sql.push_str(&dialect.placeholder(next_index));
                next_index += 1;
                binds.push(value.clone());
            }
            Some(ParamValue::List(values)) if values.is_empty() => {
                sql.push_str(&dialect.placeholder(next_index));
                next_index += 1;
                binds.push(Value::Null);
            }
            Some(ParamValue::List(values)) => {
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(", ");
                    }
                    sql.push_str(&dialect.placeholder(next_index));
                    next_index += 1;
                    binds.push(value.clone());
                }
            }
            None => {
                return Err(Error::Query(QueryError {
                    kind: QueryErrorKind::UnboundParameter,
                    name: name.to_string(),
                    message: format!("no value bound for parameter '{name}'"),
                }));
            }
        }
    }
    sql.push_str(&source[cursor..]);

    let options = spec.query_options();
    if let Some(comment) = &options.comment {
        let safe = comment.replace("*/", "* /");
        sql = format!("/* {safe} */ {sql}");
    }
    let window = dialect.window_clause(options.first_row, options.max_rows);
    if !window.is_empty() {
        sql.push(' ');
        sql.push_str(&window);
    }
    let lock = dialect.lock_suffix(&options.lock);
    if !lock.is_empty() {
        sql.push(' ');
        sql.push_str(&lock);
    }

    Ok(ExpandedQuery { sql, binds })
}
