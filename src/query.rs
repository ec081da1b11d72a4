use sqlx::encode::Encode;
use sqlx::mysql::{MySqlArguments, MySqlQueryResult};
use sqlx::{Arguments, Executor, MySql, Type};

use crate::assembler::PreparedStatement;
use crate::bindings::{Bindings, ExecutionSink};
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::expander::{expand, ParameterSource};
use crate::marker::BindTarget;
use crate::parser::parse_named_parameters;
use crate::value::{TypeDescriptor, Value};

/// Execution sink collecting positional MySQL arguments.
///
/// Markers must arrive in position order, which is the order [`Bindings`]
/// hold them in for positional dialects. Named markers are rejected.
#[derive(Default)]
pub struct MySqlArgumentSink {
    arguments: MySqlArguments,
    position: usize,
}

impl MySqlArgumentSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of arguments added so far.
    pub fn len(&self) -> usize {
        self.position
    }

    pub fn is_empty(&self) -> bool {
        self.position == 0
    }

    pub fn into_arguments(self) -> MySqlArguments {
        self.arguments
    }

    fn advance(&mut self, target: &BindTarget) -> Result<()> {
        match target {
            BindTarget::Index(index) if *index == self.position => {
                self.position += 1;
                Ok(())
            }
            BindTarget::Index(index) => Err(Error::UnsupportedBinding(format!(
                "argument {index} bound out of order, expected {}",
                self.position
            ))),
            BindTarget::Name(name) => Err(Error::UnsupportedBinding(format!(
                "named marker '{name}' cannot be bound positionally"
            ))),
        }
    }

    fn add<T>(&mut self, value: T) -> Result<()>
    where
        T: Encode<'static, MySql> + Type<MySql> + 'static,
    {
        self.arguments.add(value).map_err(sqlx::Error::Encode)?;
        Ok(())
    }
}

impl ExecutionSink for MySqlArgumentSink {
    fn bind_value(&mut self, target: &BindTarget, value: &Value) -> Result<()> {
        self.advance(target)?;
        match value {
            Value::Null => self.add(None::<String>),
            Value::Bool(b) => self.add(*b),
            Value::Int(i) => self.add(*i),
            Value::Float(f) => self.add(*f),
            Value::Text(s) => self.add(s.clone()),
            Value::Bytes(b) => self.add(b.clone()),
            Value::Array(_) | Value::List(_) | Value::Tuple(_) => Err(Error::UnsupportedBinding(
                format!("MySQL has no parameter type for {value:?}"),
            )),
        }
    }

    fn bind_null(&mut self, target: &BindTarget, ty: &TypeDescriptor) -> Result<()> {
        self.advance(target)?;
        match ty {
            TypeDescriptor::Bool => self.add(None::<bool>),
            TypeDescriptor::Int => self.add(None::<i64>),
            TypeDescriptor::Float => self.add(None::<f64>),
            TypeDescriptor::Bytes => self.add(None::<Vec<u8>>),
            TypeDescriptor::Text | TypeDescriptor::Unknown => self.add(None::<String>),
            TypeDescriptor::Array(_) => Err(Error::UnsupportedBinding(
                "MySQL has no array parameter type".to_owned(),
            )),
        }
    }
}

/// A MySQL statement with its bind plan, ready to run on any executor.
///
/// The query is consumed by execution since the bind plan is applied once.
///
/// # Examples
///
/// ```rust,no_run
/// use sqlx::MySqlPool;
/// use sqlx_statement::{MapParameterSource, PreparedQuery};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let pool = MySqlPool::connect("mysql://localhost/test").await?;
/// let source = MapParameterSource::new()
///     .with("user_id", 42)
///     .with("name", "John Doe");
///
/// let query = PreparedQuery::new(
///     "INSERT INTO users (user_id, name) VALUES (:user_id, :name)",
///     &source,
/// )?;
///
/// let result = query.execute(&pool).await?;
/// println!("Inserted {} rows", result.rows_affected());
/// # Ok(())
/// # }
/// ```
///
/// # Using with Transactions
///
/// ```rust,no_run
/// use sqlx::{MySqlPool, Transaction, MySql};
/// use sqlx_statement::{MapParameterSource, PreparedQuery, Value};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let pool = MySqlPool::connect("mysql://localhost/test").await?;
/// let mut tx: Transaction<MySql> = pool.begin().await?;
///
/// let source = MapParameterSource::new()
///     .with("ids", Value::list([1, 2, 3]))
///     .with("name", "Jane Doe");
/// PreparedQuery::new("UPDATE users SET name = :name WHERE user_id IN (:ids)", &source)?
///     .execute(&mut *tx)
///     .await?;
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PreparedQuery {
    sql: String,
    bindings: Bindings,
}

impl PreparedQuery {
    /// Expands `template` with MySQL markers and values from `source`.
    ///
    /// # Errors
    ///
    /// Any parse or expansion error, and [`Error::UnresolvedParameter`] when
    /// `source` lacks a value for a parameter.
    pub fn new(template: &str, source: &dyn ParameterSource) -> Result<Self> {
        let parsed = parse_named_parameters(template)?;
        let (sql, bindings) = expand(&parsed, &Dialect::MySql.bind_markers(), source)?.finish()?;
        Ok(Self { sql, bindings })
    }

    /// Wraps a statement built by [`crate::StatementAssembler`] for MySQL.
    pub fn from_statement(statement: PreparedStatement) -> Self {
        let (sql, bindings) = statement.into_parts();
        Self { sql, bindings }
    }

    /// Pairs MySQL text with its bind plan, e.g. from [`crate::SqlEngine::prepare`].
    pub fn from_parts(sql: String, bindings: Bindings) -> Self {
        Self { sql, bindings }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub(crate) fn into_arguments(self) -> Result<(String, MySqlArguments)> {
        let mut sink = MySqlArgumentSink::new();
        self.bindings.apply_to(&mut sink)?;
        Ok((self.sql, sink.into_arguments()))
    }

    /// Executes the statement on `executor`: a pool, a connection or a
    /// transaction.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedBinding`] when a bound value has no MySQL
    /// encoding, otherwise any database error.
    pub async fn execute<'e, E>(self, executor: E) -> Result<MySqlQueryResult>
    where
        E: Executor<'e, Database = MySql>,
    {
        let (sql, arguments) = self.into_arguments()?;
        Ok(sqlx::query_with::<MySql, _>(&sql, arguments)
            .execute(executor)
            .await?)
    }
}

impl From<PreparedStatement> for PreparedQuery {
    fn from(statement: PreparedStatement) -> Self {
        Self::from_statement(statement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::StatementAssembler;
    use crate::criteria::Criteria;
    use crate::expander::MapParameterSource;
    use crate::statement::{DeleteSpec, UpdateSpec};

    #[test]
    fn test_prepared_query_new() {
        let source = MapParameterSource::new().with("id", 42);
        let result = PreparedQuery::new("SELECT * FROM users WHERE id = :id", &source);
        assert!(result.is_ok());
    }

    #[test]
    fn test_prepared_query_placeholder_order() {
        let source = MapParameterSource::new().with("name", "Ann").with("id", 1);
        let query = PreparedQuery::new(
            "SELECT * FROM users WHERE id = :id AND name = :name",
            &source,
        )
        .unwrap();

        assert_eq!(query.sql(), "SELECT * FROM users WHERE id = ? AND name = ?");
        assert_eq!(query.bindings().values(), vec![Value::Int(1), Value::from("Ann")]);
    }

    #[test]
    fn test_prepared_query_repeated_placeholders() {
        let source = MapParameterSource::new().with("id", 5);
        let query = PreparedQuery::new(
            "SELECT * FROM users WHERE id = :id OR user_id = :id",
            &source,
        )
        .unwrap();

        assert_eq!(query.sql(), "SELECT * FROM users WHERE id = ? OR user_id = ?");
        assert_eq!(query.bindings().len(), 2);
        let (_, _) = query.into_arguments().unwrap();
    }

    #[test]
    fn test_prepared_query_missing_value() {
        let result = PreparedQuery::new("DELETE FROM users WHERE id = :id", &MapParameterSource::new());
        assert!(matches!(result, Err(Error::UnresolvedParameter(_))));
    }

    #[test]
    fn test_from_mysql_statement() {
        let spec = UpdateSpec::new("users")
            .set("name", "Bob")
            .set_null("email", TypeDescriptor::Text)
            .with_criteria(Criteria::r#where("id").is_in([1, 2]));
        let statement = StatementAssembler::new(Dialect::MySql).build_update(&spec).unwrap();
        let query = PreparedQuery::from(statement);
        assert_eq!(
            query.sql(),
            "UPDATE users SET name = ?, email = ? WHERE id IN (?, ?)"
        );

        let mut sink = MySqlArgumentSink::new();
        query.bindings.apply_to(&mut sink).unwrap();
        assert_eq!(sink.len(), 4);
    }

    #[test]
    fn test_named_markers_are_rejected() {
        let spec = DeleteSpec::new("users").with_criteria(Criteria::r#where("id").is(1));
        let statement = StatementAssembler::new(Dialect::SqlServer).build_delete(&spec).unwrap();
        let result = PreparedQuery::from_statement(statement).into_arguments();
        assert!(matches!(result, Err(Error::UnsupportedBinding(_))));
    }

    #[test]
    fn test_collections_have_no_mysql_encoding() {
        let mut sink = MySqlArgumentSink::new();
        let result = sink.bind_value(&BindTarget::Index(0), &Value::list([1, 2]));
        assert!(matches!(result, Err(Error::UnsupportedBinding(_))));
    }

    #[test]
    fn test_out_of_order_target() {
        let mut sink = MySqlArgumentSink::new();
        let result = sink.bind_value(&BindTarget::Index(1), &Value::Int(1));
        assert!(matches!(result, Err(Error::UnsupportedBinding(_))));
        assert!(sink.is_empty());
    }
}
