//! SQL dialect differences that matter at statement-render time.

use quarry_core::{LockMode, LockOptions, LockWait};

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// PostgreSQL dialect (uses $1, $2 placeholders)
    #[default]
    Postgres,
    /// SQLite dialect (uses ?1, ?2 placeholders)
    Sqlite,
    /// MySQL dialect (uses ? placeholders)
    Mysql,
}

impl Dialect {
    /// Generate a placeholder for the given parameter index (1-based).
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Sqlite => format!("?{index}"),
            Dialect::Mysql => "?".to_string(),
        }
    }

    /// Quote an identifier for this dialect.
    ///
    /// Properly escapes embedded quote characters by doubling them:
    /// - For Postgres/SQLite: `"` becomes `""`
    /// - For MySQL: `` ` `` becomes ``` `` ```
    pub fn quote_identifier(self, name: &str) -> String {
        match self {
            Dialect::Postgres | Dialect::Sqlite => {
                let escaped = name.replace('"', "\"\"");
                format!("\"{}\"", escaped)
            }
            Dialect::Mysql => {
                let escaped = name.replace('`', "``");
                format!("`{}`", escaped)
            }
        }
    }

    /// Does this dialect have row-lock clause syntax at all?
    pub const fn supports_row_locks(self) -> bool {
        !matches!(self, Dialect::Sqlite)
    }

    /// Render the row-lock suffix for the given lock request.
    ///
    /// Empty when no lock is requested or the dialect has no row-lock
    /// syntax (SQLite locks at the database level instead).
    pub fn lock_suffix(self, options: &LockOptions) -> String {
        if options.is_none() || !self.supports_row_locks() {
            return String::new();
        }
        let clause = match options.mode() {
            LockMode::None => return String::new(),
            LockMode::Share => "FOR SHARE",
            LockMode::Update => "FOR UPDATE",
        };
        match options.wait_policy() {
            LockWait::Wait => clause.to_string(),
            LockWait::NoWait => format!("{clause} NOWAIT"),
            LockWait::SkipLocked => format!("{clause} SKIP LOCKED"),
        }
    }

    /// Render the row-window clause for a first-row offset and row cap.
    ///
    /// Dialects disagree on offset-without-limit: PostgreSQL allows a bare
    /// `OFFSET`, SQLite needs `LIMIT -1`, MySQL needs an effectively
    /// unbounded limit.
    pub fn window_clause(self, first_row: Option<usize>, max_rows: Option<usize>) -> String {
        match (first_row, max_rows) {
            (None, None) => String::new(),
            (None, Some(max)) => format!("LIMIT {max}"),
            (Some(first), Some(max)) => format!("LIMIT {max} OFFSET {first}"),
            (Some(first), None) => match self {
                Dialect::Postgres => format!("OFFSET {first}"),
                Dialect::Sqlite => format!("LIMIT -1 OFFSET {first}"),
                Dialect::Mysql => format!("LIMIT 18446744073709551615 OFFSET {first}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_per_dialect() {
        assert_eq!(Dialect::Postgres.placeholder(2), "$2");
        assert_eq!(Dialect::Sqlite.placeholder(2), "?2");
        assert_eq!(Dialect::Mysql.placeholder(2), "?");
    }

    #[test]
    fn identifier_quoting_escapes_embedded_quotes() {
        assert_eq!(Dialect::Postgres.quote_identifier("or\"der"), "\"or\"\"der\"");
        assert_eq!(Dialect::Mysql.quote_identifier("or`der"), "`or``der`");
    }

    #[test]
    fn lock_suffix_rendering() {
        let update = LockOptions::new(LockMode::Update);
        assert_eq!(Dialect::Postgres.lock_suffix(&update), "FOR UPDATE");
        assert_eq!(
            Dialect::Postgres.lock_suffix(&update.wait(LockWait::SkipLocked)),
            "FOR UPDATE SKIP LOCKED"
        );
        assert_eq!(
            Dialect::Mysql.lock_suffix(&LockOptions::new(LockMode::Share).wait(LockWait::NoWait)),
            "FOR SHARE NOWAIT"
        );
        assert_eq!(Dialect::Sqlite.lock_suffix(&update), "");
        assert_eq!(Dialect::Postgres.lock_suffix(&LockOptions::none()), "");
    }

    #[test]
    fn window_clause_rendering() {
        assert_eq!(Dialect::Postgres.window_clause(None, None), "");
        assert_eq!(Dialect::Postgres.window_clause(None, Some(10)), "LIMIT 10");
        assert_eq!(
            Dialect::Postgres.window_clause(Some(5), Some(10)),
            "LIMIT 10 OFFSET 5"
        );
        assert_eq!(Dialect::Postgres.window_clause(Some(5), None), "OFFSET 5");
        assert_eq!(
            Dialect::Sqlite.window_clause(Some(5), None),
            "LIMIT -1 OFFSET 5"
        );
    }
}
