use std::marker::PhantomData;

use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::query::QueryAs;
use sqlx::{Executor, MySql};

use crate::assembler::PreparedStatement;
use crate::bindings::Bindings;
use crate::error::Result;
use crate::expander::ParameterSource;
use crate::query::PreparedQuery;

/// Type alias for SQLx QueryAs with MySQL arguments
pub type QA<'q, R> = QueryAs<'q, MySql, R, MySqlArguments>;

/// A prepared MySQL statement returning rows decoded into `R`.
///
/// Like [`PreparedQuery`], the bind plan is replayed once, so every fetch
/// consumes the query.
///
/// # Examples
///
/// ```rust,no_run
/// use sqlx::{MySqlPool, FromRow};
/// use sqlx_statement::{MapParameterSource, PreparedQueryAs};
///
/// #[derive(FromRow)]
/// struct User {
///     id: i32,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let pool = MySqlPool::connect("mysql://localhost/test").await?;
/// let source = MapParameterSource::new().with("id", 42);
/// let query = PreparedQueryAs::<User>::new("SELECT id, name FROM users WHERE id = :id", &source)?;
///
/// let user: User = query.fetch_one(&pool).await?;
/// println!("User: {} ({})", user.name, user.id);
/// # Ok(())
/// # }
/// ```
pub struct PreparedQueryAs<R> {
    inner: PreparedQuery,
    _pd: PhantomData<fn() -> R>,
}

impl<R> std::fmt::Debug for PreparedQueryAs<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedQueryAs")
            .field("inner", &self.inner)
            .finish()
    }
}

impl<R> PreparedQueryAs<R>
where
    for<'row> R: sqlx::FromRow<'row, MySqlRow> + Send + Unpin,
{
    /// Expands `template` with MySQL markers and values from `source`.
    ///
    /// # Errors
    ///
    /// Any parse or expansion error, and [`crate::Error::UnresolvedParameter`]
    /// when `source` lacks a value for a parameter.
    pub fn new(template: &str, source: &dyn ParameterSource) -> Result<Self> {
        PreparedQuery::new(template, source).map(Self::wrap)
    }

    /// Wraps a SELECT built by [`crate::StatementAssembler`] for MySQL.
    ///
    /// ```rust,no_run
    /// use sqlx::{MySqlPool, FromRow};
    /// use sqlx_statement::{Criteria, Dialect, PreparedQueryAs, SelectSpec, StatementAssembler};
    ///
    /// #[derive(FromRow)]
    /// struct User {
    ///     id: i32,
    ///     name: String,
    /// }
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// # let pool = MySqlPool::connect("mysql://localhost/test").await?;
    /// let spec = SelectSpec::new("users")
    ///     .with_projection(["id", "name"])
    ///     .with_criteria(Criteria::r#where("age").greater_than(18));
    /// let statement = StatementAssembler::new(Dialect::MySql).build_select(&spec)?;
    ///
    /// let users: Vec<User> = PreparedQueryAs::<User>::from_statement(statement).fetch_all(&pool).await?;
    /// println!("Found {} users", users.len());
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_statement(statement: PreparedStatement) -> Self {
        Self::wrap(PreparedQuery::from_statement(statement))
    }

    fn wrap(inner: PreparedQuery) -> Self {
        Self {
            inner,
            _pd: PhantomData,
        }
    }

    pub fn sql(&self) -> &str {
        self.inner.sql()
    }

    pub fn bindings(&self) -> &Bindings {
        self.inner.bindings()
    }

    /// Executes the query and returns all matching rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or if any row cannot be converted to type `R`.
    pub async fn fetch_all<'e, E>(self, executor: E) -> Result<Vec<R>>
    where
        E: Executor<'e, Database = MySql>,
    {
        let (sql, arguments) = self.inner.into_arguments()?;
        let q: QA<'_, R> = sqlx::query_as_with(&sql, arguments);
        Ok(q.fetch_all(executor).await?)
    }

    /// Executes the query and returns exactly one row.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No rows are found
    /// - The query fails
    /// - The row cannot be converted to type `R`
    pub async fn fetch_one<'e, E>(self, executor: E) -> Result<R>
    where
        E: Executor<'e, Database = MySql>,
    {
        let (sql, arguments) = self.inner.into_arguments()?;
        let q: QA<'_, R> = sqlx::query_as_with(&sql, arguments);
        Ok(q.fetch_one(executor).await?)
    }

    /// Executes the query and returns at most one row.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row cannot be converted to type `R`.
    pub async fn fetch_optional<'e, E>(self, executor: E) -> Result<Option<R>>
    where
        E: Executor<'e, Database = MySql>,
    {
        let (sql, arguments) = self.inner.into_arguments()?;
        let q: QA<'_, R> = sqlx::query_as_with(&sql, arguments);
        Ok(q.fetch_optional(executor).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expander::MapParameterSource;
    use crate::value::Value;

    #[derive(sqlx::FromRow)]
    struct TestRow {
        #[allow(dead_code)]
        id: i32,
    }

    #[test]
    fn test_prepared_query_as_new() {
        let source = MapParameterSource::new().with("id", 1);
        let result = PreparedQueryAs::<TestRow>::new("SELECT id FROM users WHERE id = :id", &source);
        assert!(result.is_ok());
    }

    #[test]
    fn test_prepared_query_as_placeholder_order() {
        let source = MapParameterSource::new().with("id", 1).with("ids", Value::list([2, 3]));
        let query = PreparedQueryAs::<TestRow>::new(
            "SELECT id FROM users WHERE id = :id OR id IN (:ids)",
            &source,
        )
        .unwrap();

        assert_eq!(query.sql(), "SELECT id FROM users WHERE id = ? OR id IN (?, ?)");
        assert_eq!(
            query.bindings().values(),
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );
    }
}
