//! # sqlx-statement
//!
//! Dialect-aware SQL construction for SQLx: named parameters, criteria
//! chains and statement specs rendered to SQL text plus a bind plan.
//!
//! ## Features
//!
//! - **Named Placeholders**: Write `:name`, `&name` or `:{name}` in SQL templates; they are
//!   rewritten to the markers of the target dialect (`$1`, `?`, `@name`, `:name`)
//! - **Collection Expansion**: A list value expands to one marker per element, tuples to
//!   parenthesized groups, so `IN (:ids)` just works
//! - **Criteria Chains**: Immutable `where(..).and(..).or(..)` chains mapped to SQL conditions
//! - **Statement Specs**: SELECT/INSERT/UPDATE/DELETE built from specs with paging, sorting,
//!   NULLS ordering and generated keys handled per dialect
//! - **Template Cache**: Parsed templates are kept in a bounded LRU cache
//! - **MySQL Execution**: `PreparedQuery` and `PreparedQueryAs` run the result on any SQLx
//!   `Executor`
//!
//! ## Quick Start
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! sqlx = { version = "0.8", features = ["mysql", "runtime-tokio"] }
//! sqlx-statement = "0.1"
//! ```
//!
//! ## Examples
//!
//! ### Expanding a Template
//!
//! ```
//! use sqlx_statement::{Dialect, MapParameterSource, SqlEngine, Value};
//!
//! let engine = SqlEngine::new(Dialect::Postgres);
//! let source = MapParameterSource::new()
//!     .with("ids", Value::list([7, 8]))
//!     .with("name", "Ann");
//!
//! let (sql, bindings) = engine.prepare(
//!     "SELECT * FROM users WHERE id IN (:ids) AND name = :name",
//!     &source,
//! )?;
//! assert_eq!(sql, "SELECT * FROM users WHERE id IN ($1, $2) AND name = $3");
//! assert_eq!(bindings.values(), vec![Value::Int(7), Value::Int(8), Value::from("Ann")]);
//! # Ok::<(), sqlx_statement::Error>(())
//! ```
//!
//! ### Building Statements from Criteria
//!
//! ```
//! use sqlx_statement::{Criteria, Dialect, Order, Page, SelectSpec, SqlEngine};
//!
//! let criteria = Criteria::r#where("status")
//!     .is("active")
//!     .or("role")
//!     .is("admin")
//!     .and("age")
//!     .greater_than_or_equals(18);
//! let spec = SelectSpec::new("users")
//!     .with_criteria(criteria)
//!     .with_order(Order::asc("name"))
//!     .with_page(Page::of(0, 20));
//!
//! let statement = SqlEngine::new(Dialect::MySql).statements().build_select(&spec)?;
//! assert_eq!(
//!     statement.sql(),
//!     "SELECT * FROM users WHERE (status = ? OR role = ?) AND age >= ? \
//!      ORDER BY name ASC LIMIT 0, 20"
//! );
//! # Ok::<(), sqlx_statement::Error>(())
//! ```
//!
//! ### Executing on MySQL
//!
//! ```rust,no_run
//! use sqlx::{MySqlPool, FromRow};
//! use sqlx_statement::{MapParameterSource, PreparedQuery, PreparedQueryAs};
//!
//! #[derive(FromRow)]
//! struct User {
//!     id: i32,
//!     name: String,
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = MySqlPool::connect("mysql://localhost/test").await?;
//!
//! let insert = MapParameterSource::new().with("name", "John Doe");
//! let result = PreparedQuery::new("INSERT INTO users (name) VALUES (:name)", &insert)?
//!     .execute(&pool)
//!     .await?;
//! println!("Inserted {} rows", result.rows_affected());
//!
//! let filter = MapParameterSource::new().with("min_id", 1);
//! let users: Vec<User> =
//!     PreparedQueryAs::<User>::new("SELECT id, name FROM users WHERE id >= :min_id", &filter)?
//!         .fetch_all(&pool)
//!         .await?;
//! for user in users {
//!     println!("{}: {}", user.id, user.name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## How It Works
//!
//! 1. **Parse**: Locate named parameters outside literals and comments; the result is cached
//! 2. **Expand / Map**: Allocate one bind marker per value from a per-statement allocator
//! 3. **Render**: Produce the dialect's SQL text and a `Bindings` plan in marker order
//! 4. **Execute**: Replay the plan once into the driver's arguments
//!
//! ## Limitations
//!
//! - Execution is provided for MySQL only; other dialects produce SQL and bindings for
//!   any driver through `ExecutionSink`
//! - Parameter names end at whitespace or one of `"':&,;()|=+-*%/\<>^`
//!
//! ## License
//!
//! Licensed under either of Apache License, Version 2.0 or MIT license at your option.

pub mod assembler;
pub mod ast;
pub mod bindings;
pub mod builder;
pub mod cache;
pub mod condition;
pub mod config;
pub mod criteria;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod expander;
pub mod mapper;
pub mod marker;
pub mod metadata;
pub mod parser;
pub mod query;
pub mod query_as;
pub mod render;
pub mod statement;
pub mod value;

pub use assembler::{PreparedStatement, StatementAssembler};
pub use bindings::{BindValue, Binding, Bindings, ExecutionSink};
pub use cache::TemplateCache;
pub use condition::{Column, Table};
pub use config::EngineConfig;
pub use criteria::{Comparator, Criteria, CriteriaStep};
pub use dialect::{Dialect, GeneratedKeys};
pub use engine::SqlEngine;
pub use error::{Error, Result};
pub use expander::{expand, ExpandedSql, MapParameterSource, ParameterSource};
pub use marker::{BindMarker, BindMarkerFactory, BindTarget};
pub use metadata::{EntityMapping, EntityMetadata};
pub use parser::{parse_named_parameters, NamedParameterParser, ParsedSqlTemplate};
pub use query::PreparedQuery;
pub use query_as::PreparedQueryAs;
pub use render::RenderOptions;
pub use statement::{DeleteSpec, Direction, InsertSpec, NullHandling, Order, Page, SelectSpec, UpdateSpec};
pub use value::{DefaultValueConverter, TypeDescriptor, Value, ValueConverter};

/// Convenience re-exports for common use cases
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::{Criteria, Dialect, MapParameterSource, Order, Page, SqlEngine, Value};
    pub use crate::{DeleteSpec, InsertSpec, SelectSpec, UpdateSpec};
    pub use crate::{PreparedQuery, PreparedQueryAs};
}
