use crate::dialect::Dialect;
use crate::expander::{expand, MapParameterSource};
use crate::parser::parse_named_parameters;

/// Converts named placeholders (`:name`) to the bind markers of `dialect`.
///
/// No values are involved: every occurrence becomes exactly one marker.
/// Quoted text, comments, `::` casts and escaped `\:` are left alone.
///
/// # Examples
///
/// ```
/// use sqlx_statement::builder::build_query;
/// use sqlx_statement::Dialect;
///
/// let sql = build_query("SELECT * FROM users WHERE id = :id AND name = :name", Dialect::MySql)?;
/// assert_eq!(sql, "SELECT * FROM users WHERE id = ? AND name = ?");
///
/// let sql = build_query("SELECT * FROM users WHERE id = :id", Dialect::Postgres)?;
/// assert_eq!(sql, "SELECT * FROM users WHERE id = $1");
/// # Ok::<(), sqlx_statement::Error>(())
/// ```
pub fn build_query(template: &str, dialect: Dialect) -> crate::Result<String> {
    let parsed = parse_named_parameters(template)?;
    let expanded = expand(&parsed, &dialect.bind_markers(), &MapParameterSource::new())?;
    Ok(expanded.sql().to_owned())
}
