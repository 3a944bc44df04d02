//! Table-alias resolution strategies.
//!
//! Filter conditions are written against placeholder aliases; at
//! SQL-generation time a resolver supplies the actual alias for each table
//! in the current query. Three strategies cover the query shapes:
//!
//! - [`StaticAliasResolver`]: one fixed alias, whatever the table
//! - [`IndexedAliasResolver`]: aliases derived from a table's position in
//!   the entity's table list, all hanging off one root alias
//! - [`GroupAliasResolver`]: lookup into an already-built [`TableGroup`]

/// Resolve a table name to its SQL alias in the current query.
///
/// `None` asks for the implicit alias (the root/primary table);
/// resolution returns `None` when the table has no alias in this query.
pub trait AliasResolver {
    fn alias_for(&self, table: Option<&str>) -> Option<String>;
}

/// Always the same alias, regardless of table.
#[derive(Debug, Clone)]
pub struct StaticAliasResolver {
    alias: String,
}

impl StaticAliasResolver {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
        }
    }
}

impl AliasResolver for StaticAliasResolver {
    fn alias_for(&self, _table: Option<&str>) -> Option<String> {
        Some(self.alias.clone())
    }
}

/// Derive the alias for a table at `index` in an entity's table list.
///
/// Index 0 is the root alias itself; index n appends `n_` with an
/// underscore join.
fn indexed_alias(root: &str, index: usize) -> String {
    if index == 0 {
        return root.to_string();
    }
    let mut alias = root.to_string();
    if !alias.ends_with('_') {
        alias.push('_');
    }
    alias.push_str(&index.to_string());
    alias.push('_');
    alias
}

/// Alias from a table's position in a fixed table list.
///
/// Used when the query joins an entity's secondary tables in declaration
/// order and every join alias is derived from the root alias.
#[derive(Debug, Clone)]
pub struct IndexedAliasResolver {
    root_alias: String,
    tables: Vec<String>,
}

impl IndexedAliasResolver {
    pub fn new(root_alias: impl Into<String>, tables: Vec<String>) -> Self {
        Self {
            root_alias: root_alias.into(),
            tables,
        }
    }
}

impl AliasResolver for IndexedAliasResolver {
    fn alias_for(&self, table: Option<&str>) -> Option<String> {
        match table {
            None => Some(self.root_alias.clone()),
            Some(table) => self
                .tables
                .iter()
                .position(|t| t == table)
                .map(|index| indexed_alias(&self.root_alias, index)),
        }
    }
}

/// One table reference inside a built query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    table: String,
    alias: String,
}

/// The tables participating in one query, with their assigned aliases.
#[derive(Debug, Clone)]
pub struct TableGroup {
    root: TableRef,
    joined: Vec<TableRef>,
}

impl TableGroup {
    /// Start a group from the root table and its alias.
    pub fn new(root_table: impl Into<String>, root_alias: impl Into<String>) -> Self {
        Self {
            root: TableRef {
                table: root_table.into(),
                alias: root_alias.into(),
            },
            joined: Vec::new(),
        }
    }

    /// Add a joined table with its alias.
    #[must_use]
    pub fn join(mut self, table: impl Into<String>, alias: impl Into<String>) -> Self {
        self.joined.push(TableRef {
            table: table.into(),
            alias: alias.into(),
        });
        self
    }

    /// Alias of the root table.
    pub fn root_alias(&self) -> &str {
        &self.root.alias
    }

    /// Alias of a table in this group, root included.
    pub fn alias_of(&self, table: &str) -> Option<&str> {
        if self.root.table == table {
            return Some(&self.root.alias);
        }
        self.joined
            .iter()
            .find(|r| r.table == table)
            .map(|r| r.alias.as_str())
    }
}

/// Alias lookup against an already-built query structure.
///
/// Returns `None` for tables outside the group, which surfaces as a
/// rendering error instead of guessing an alias.
#[derive(Debug, Clone)]
pub struct GroupAliasResolver<'g> {
    group: &'g TableGroup,
}

impl<'g> GroupAliasResolver<'g> {
    pub fn new(group: &'g TableGroup) -> Self {
        Self { group }
    }
}

impl AliasResolver for GroupAliasResolver<'_> {
    fn alias_for(&self, table: Option<&str>) -> Option<String> {
        match table {
            None => Some(self.group.root_alias().to_string()),
            Some(table) => self.group.alias_of(table).map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_resolver_ignores_input() {
        let resolver = StaticAliasResolver::new("o");
        assert_eq!(resolver.alias_for(None), Some("o".to_string()));
        assert_eq!(resolver.alias_for(Some("orders")), Some("o".to_string()));
        assert_eq!(resolver.alias_for(Some("anything")), Some("o".to_string()));
    }

    #[test]
    fn indexed_resolver_positions() {
        let resolver = IndexedAliasResolver::new(
            "ord",
            vec![
                "orders".to_string(),
                "order_details".to_string(),
                "order_audit".to_string(),
            ],
        );
        assert_eq!(resolver.alias_for(None), Some("ord".to_string()));
        assert_eq!(resolver.alias_for(Some("orders")), Some("ord".to_string()));
        assert_eq!(
            resolver.alias_for(Some("order_details")),
            Some("ord_1_".to_string())
        );
        assert_eq!(
            resolver.alias_for(Some("order_audit")),
            Some("ord_2_".to_string())
        );
        assert_eq!(resolver.alias_for(Some("unrelated")), None);
    }

    #[test]
    fn indexed_alias_respects_trailing_underscore() {
        assert_eq!(indexed_alias("o_", 1), "o_1_");
        assert_eq!(indexed_alias("o", 1), "o_1_");
        assert_eq!(indexed_alias("o", 0), "o");
    }

    #[test]
    fn group_resolver_lookup() {
        let group = TableGroup::new("orders", "o")
            .join("customers", "c")
            .join("regions", "r");
        let resolver = GroupAliasResolver::new(&group);
        assert_eq!(resolver.alias_for(None), Some("o".to_string()));
        assert_eq!(resolver.alias_for(Some("orders")), Some("o".to_string()));
        assert_eq!(resolver.alias_for(Some("customers")), Some("c".to_string()));
        assert_eq!(resolver.alias_for(Some("suppliers")), None);
    }
}
