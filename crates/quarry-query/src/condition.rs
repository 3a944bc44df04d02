//! Compiled filter conditions.
//!
//! A condition template is raw SQL with alias markers: `{alias}` for the
//! implicit root alias, `{name}` for a named table, and `:param` tokens for
//! runtime parameters. Compilation splits the template into segments once;
//! rendering substitutes resolved aliases per use. Templates are compiled
//! at definition-build time so malformed ones fail before any query runs.

use crate::alias::AliasResolver;
use crate::expand;
use quarry_core::error::{Error, FilterError, FilterErrorKind};
use quarry_core::Result;
use regex::Regex;
use std::sync::OnceLock;

/// The marker name that addresses the implicit root alias.
const IMPLICIT_MARKER: &str = "alias";

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("alias marker pattern is valid")
    })
}

/// One piece of a compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Literal SQL text
    Text(String),
    /// `{alias}`: the implicit root alias
    ImplicitAlias,
    /// `{name}`: the alias of a named table
    NamedAlias(String),
}

/// A condition template compiled into renderable segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledCondition {
    template: String,
    segments: Vec<Segment>,
    parameters: Vec<String>,
}

impl CompiledCondition {
    /// Compile a raw condition template.
    ///
    /// Fails when the template contains brace characters outside wellformed
    /// `{name}` markers.
    pub fn compile(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut cursor = 0usize;

        for marker in marker_re().find_iter(template) {
            if marker.start() > cursor {
                segments.push(Segment::Text(template[cursor..marker.start()].to_string()));
            }
            cursor = marker.end();

            let name = &marker.as_str()[1..marker.as_str().len() - 1];
            if name == IMPLICIT_MARKER {
                segments.push(Segment::ImplicitAlias);
            } else {
                segments.push(Segment::NamedAlias(name.to_string()));
            }
        }
        if cursor < template.len() {
            segments.push(Segment::Text(template[cursor..].to_string()));
        }

        for segment in &segments {
            if let Segment::Text(text) = segment {
                if text.contains('{') || text.contains('}') {
                    return Err(Error::Filter(FilterError {
                        kind: FilterErrorKind::BadTemplate,
                        filter: None,
                        message: format!("stray brace in condition template '{template}'"),
                    }));
                }
            }
        }

        Ok(Self {
            template: template.to_string(),
            segments,
            parameters: expand::scan_parameters(template),
        })
    }

    /// The raw template this condition was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Parameter names scanned from the template, in first-occurrence order.
    pub fn parameter_names(&self) -> &[String] {
        &self.parameters
    }

    /// Does this condition contain any alias marker?
    pub fn has_alias_markers(&self) -> bool {
        self.segments
            .iter()
            .any(|s| !matches!(s, Segment::Text(_)))
    }

    /// Render the condition against the query's alias resolver.
    ///
    /// Fails when the resolver cannot supply an alias for a marker, naming
    /// the placeholder that missed.
    pub fn render(&self, resolver: &dyn AliasResolver) -> Result<String> {
        let mut out = String::with_capacity(self.template.len());
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::ImplicitAlias => match resolver.alias_for(None) {
                    Some(alias) => out.push_str(&alias),
                    None => return Err(unresolved(IMPLICIT_MARKER)),
                },
                Segment::NamedAlias(name) => match resolver.alias_for(Some(name)) {
                    Some(alias) => out.push_str(&alias),
                    None => return Err(unresolved(name)),
                },
            }
        }
        Ok(out)
    }
}

fn unresolved(name: &str) -> Error {
    Error::Filter(FilterError {
        kind: FilterErrorKind::UnresolvedAlias,
        filter: None,
        message: format!("no alias available for placeholder '{name}'"),
    })
}
