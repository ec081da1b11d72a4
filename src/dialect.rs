//! SQL dialect definitions and formatting rules.
//!
//! Each dialect decides:
//!
//! - Bind marker style: `$1` (PostgreSQL/H2), `?` (MySQL/SQLite),
//!   `@P0` (SQL Server), `:P0` (Oracle)
//! - Identifier quoting: `"` (ANSI/PG/SQLite/Oracle/H2), `` ` `` (MySQL), `[]` (T-SQL)
//! - Pagination: LIMIT/OFFSET, `LIMIT offset, count`, or OFFSET FETCH
//! - Boolean literals: TRUE/FALSE vs 1/0
//! - How generated keys are returned from an INSERT
//!
//! | Feature | PostgreSQL | H2 | MySQL | SQLite | SQL Server | Oracle |
//! |---------|-----------|----|-------|--------|------------|--------|
//! | NULLS FIRST/LAST | ✓ | ✓ | ❌ | ✓ | ❌ | ✓ |
//! | RETURNING | ✓ | ❌ | ❌ | ✓ | OUTPUT | ❌ |
//! | Array containment | ✓ | ❌ | ❌ | ❌ | ❌ | ❌ |
//! | OFFSET needs ORDER BY | ❌ | ❌ | ❌ | ❌ | ✓ | ❌ |

use serde::{Deserialize, Serialize};

use crate::marker::BindMarkerFactory;

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Postgres,
    H2,
    MySql,
    Sqlite,
    SqlServer,
    Oracle,
}

/// How an INSERT hands generated keys back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratedKeys {
    /// `INSERT ... RETURNING col`
    Returning,
    /// `INSERT ... OUTPUT INSERTED.col VALUES ...`
    Output,
    /// Statement text is unchanged; the driver reports the keys.
    Driver,
}

impl Dialect {
    /// Dialect name for display/logging.
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::H2 => "h2",
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
            Dialect::SqlServer => "sqlserver",
            Dialect::Oracle => "oracle",
        }
    }

    /// Marker factory issuing this dialect's placeholder syntax.
    pub fn bind_markers(&self) -> BindMarkerFactory {
        match self {
            Dialect::Postgres | Dialect::H2 => BindMarkerFactory::indexed("$", 1),
            Dialect::MySql | Dialect::Sqlite => BindMarkerFactory::anonymous("?"),
            Dialect::SqlServer => BindMarkerFactory::named("@", "P", 32),
            Dialect::Oracle => BindMarkerFactory::named(":", "P", 30),
        }
    }

    /// Quote an identifier (table, column, alias).
    pub fn quote_identifier(&self, ident: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", ident.replace('`', "``")),
            Dialect::SqlServer => format!("[{}]", ident.replace(']', "]]")),
            _ => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    /// Format a boolean literal.
    pub fn format_bool(&self, b: bool) -> &'static str {
        match (self, b) {
            (Dialect::SqlServer | Dialect::Oracle, true) => "1",
            (Dialect::SqlServer | Dialect::Oracle, false) => "0",
            (_, true) => "TRUE",
            (_, false) => "FALSE",
        }
    }

    /// Whether ORDER BY accepts NULLS FIRST/LAST.
    pub fn supports_nulls_ordering(&self) -> bool {
        !matches!(self, Dialect::MySql | Dialect::SqlServer)
    }

    /// Whether array containment (`@>`) can be rendered.
    pub fn supports_array_comparison(&self) -> bool {
        matches!(self, Dialect::Postgres)
    }

    pub fn generated_keys(&self) -> GeneratedKeys {
        match self {
            Dialect::Postgres | Dialect::Sqlite => GeneratedKeys::Returning,
            Dialect::SqlServer => GeneratedKeys::Output,
            Dialect::MySql | Dialect::H2 | Dialect::Oracle => GeneratedKeys::Driver,
        }
    }

    /// SQL Server rejects OFFSET FETCH without ORDER BY.
    pub fn requires_order_by_for_offset(&self) -> bool {
        matches!(self, Dialect::SqlServer)
    }

    /// Emit the pagination clause, or `None` when neither bound is set.
    pub fn limit_offset_clause(&self, limit: Option<u64>, offset: Option<u64>) -> Option<String> {
        let clause = match (self, limit, offset) {
            (_, None, None) => return None,
            (Dialect::SqlServer | Dialect::Oracle, limit, offset) => {
                let mut clause = format!("OFFSET {} ROWS", offset.unwrap_or(0));
                if let Some(l) = limit {
                    clause.push_str(&format!(" FETCH NEXT {l} ROWS ONLY"));
                }
                clause
            }
            (Dialect::MySql, Some(l), Some(o)) => format!("LIMIT {o}, {l}"),
            (Dialect::MySql, None, Some(o)) => format!("LIMIT {o}, {}", u64::MAX),
            (Dialect::Sqlite, None, Some(o)) => format!("LIMIT -1 OFFSET {o}"),
            (_, Some(l), Some(o)) => format!("LIMIT {l} OFFSET {o}"),
            (_, Some(l), None) => format!("LIMIT {l}"),
            (_, None, Some(o)) => format!("OFFSET {o}"),
        };
        Some(clause)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(Dialect::Postgres.quote_identifier("user"), "\"user\"");
        assert_eq!(Dialect::MySql.quote_identifier("user"), "`user`");
        assert_eq!(Dialect::SqlServer.quote_identifier("a]b"), "[a]]b]");
    }

    #[test]
    fn test_limit_offset_clause() {
        assert_eq!(
            Dialect::Postgres.limit_offset_clause(Some(10), Some(20)).as_deref(),
            Some("LIMIT 10 OFFSET 20")
        );
        assert_eq!(
            Dialect::MySql.limit_offset_clause(Some(10), Some(20)).as_deref(),
            Some("LIMIT 20, 10")
        );
        assert_eq!(
            Dialect::Sqlite.limit_offset_clause(None, Some(5)).as_deref(),
            Some("LIMIT -1 OFFSET 5")
        );
        assert_eq!(
            Dialect::SqlServer.limit_offset_clause(Some(10), None).as_deref(),
            Some("OFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY")
        );
        assert_eq!(Dialect::Oracle.limit_offset_clause(None, None), None);
    }

    #[test]
    fn test_dialect_from_name() {
        let dialect: Dialect = serde_json::from_str("\"sqlserver\"").unwrap();
        assert_eq!(dialect, Dialect::SqlServer);
        assert_eq!(Dialect::MySql.to_string(), "mysql");
    }
}
