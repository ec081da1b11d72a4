//! Assembly of statement specs into ASTs, bindings and rendered SQL.
//!
//! Markers are allocated from one [`BindMarkers`] per statement in textual
//! order: assignment values first, then the WHERE clause. Positional
//! dialects rely on that order.

use tracing::debug;

use crate::ast::{Delete, Insert, OrderByField, Select, Update};
use crate::bindings::Bindings;
use crate::condition::{Column, Condition, Expression, Table};
use crate::criteria::Criteria;
use crate::dialect::{Dialect, GeneratedKeys};
use crate::error::{Error, Result};
use crate::mapper::ConditionMapper;
use crate::marker::BindMarkers;
use crate::metadata::EntityMetadata;
use crate::render::{RenderOptions, Renderer};
use crate::statement::{Assignment, DeleteSpec, InsertSpec, SelectSpec, UpdateSpec};
use crate::value::{DefaultValueConverter, ValueConverter};

static DEFAULT_CONVERTER: DefaultValueConverter = DefaultValueConverter;

/// Rendered SQL with its bind plan.
#[derive(Debug)]
pub struct PreparedStatement {
    sql: String,
    bindings: Bindings,
    generated_keys: Option<GeneratedKeys>,
}

impl PreparedStatement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// How generated keys come back, when the INSERT asked for them.
    pub fn generated_keys(&self) -> Option<GeneratedKeys> {
        self.generated_keys
    }

    pub fn into_parts(self) -> (String, Bindings) {
        (self.sql, self.bindings)
    }
}

/// Builds SELECT/INSERT/UPDATE/DELETE statements for one dialect.
#[derive(Clone, Copy)]
pub struct StatementAssembler<'a> {
    dialect: Dialect,
    converter: &'a dyn ValueConverter,
    metadata: Option<&'a dyn EntityMetadata>,
    options: RenderOptions,
}

impl<'a> StatementAssembler<'a> {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            converter: &DEFAULT_CONVERTER,
            metadata: None,
            options: RenderOptions::default(),
        }
    }

    pub fn with_converter(self, converter: &'a dyn ValueConverter) -> Self {
        Self { converter, ..self }
    }

    /// Resolves property names and declared types through `metadata`.
    pub fn with_entity_metadata(self, metadata: &'a dyn EntityMetadata) -> Self {
        Self {
            metadata: Some(metadata),
            ..self
        }
    }

    pub fn with_render_options(self, options: RenderOptions) -> Self {
        Self { options, ..self }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn renderer(&self) -> Renderer {
        Renderer::new(self.dialect, self.options)
    }

    pub fn assemble_select(&self, spec: &SelectSpec) -> Result<(Select, Bindings)> {
        let mut markers = self.dialect.bind_markers().create();
        let (condition, bindings) = self.where_clause(&mut markers, &spec.criteria, &spec.table)?;

        let projection = spec
            .projection
            .iter()
            .map(|p| self.column(&spec.table, p))
            .collect();
        let order_by = spec
            .sort
            .iter()
            .map(|order| OrderByField {
                column: self.column(&spec.table, &order.property),
                direction: order.direction,
                nulls: order.nulls,
            })
            .collect();

        let select = Select {
            table: spec.table.clone(),
            projection,
            distinct: spec.distinct,
            condition,
            order_by,
            limit: spec.page.limit,
            offset: spec.page.offset,
        };
        Ok((select, bindings))
    }

    /// # Errors
    ///
    /// [`Error::EmptyAssignment`] when the spec assigns no column.
    pub fn assemble_insert(&self, spec: &InsertSpec) -> Result<(Insert, Bindings)> {
        if spec.assignments.is_empty() {
            return Err(Error::EmptyAssignment("INSERT"));
        }
        let mut markers = self.dialect.bind_markers().create();
        let mut bindings = Bindings::new();
        let mut columns = Vec::with_capacity(spec.assignments.len());
        let mut values = Vec::with_capacity(spec.assignments.len());
        for assignment in &spec.assignments {
            let (column, value) = self.assign(&mut markers, &mut bindings, assignment)?;
            columns.push(column);
            values.push(value);
        }

        let returning = spec
            .returning
            .iter()
            .map(|p| Column::new(self.column_name(p)))
            .collect();
        let insert = Insert {
            table: spec.table.clone(),
            columns,
            values,
            returning,
        };
        Ok((insert, bindings))
    }

    /// # Errors
    ///
    /// [`Error::EmptyAssignment`] when the spec assigns no column.
    pub fn assemble_update(&self, spec: &UpdateSpec) -> Result<(Update, Bindings)> {
        if spec.assignments.is_empty() {
            return Err(Error::EmptyAssignment("UPDATE"));
        }
        let mut markers = self.dialect.bind_markers().create();
        let mut bindings = Bindings::new();
        let assignments = spec
            .assignments
            .iter()
            .map(|a| self.assign(&mut markers, &mut bindings, a))
            .collect::<Result<Vec<_>>>()?;

        let (condition, where_bindings) =
            self.where_clause(&mut markers, &spec.criteria, &unaliased(&spec.table))?;
        bindings.append(where_bindings);

        let update = Update {
            table: spec.table.clone(),
            assignments,
            condition,
        };
        Ok((update, bindings))
    }

    pub fn assemble_delete(&self, spec: &DeleteSpec) -> Result<(Delete, Bindings)> {
        let mut markers = self.dialect.bind_markers().create();
        let (condition, bindings) =
            self.where_clause(&mut markers, &spec.criteria, &unaliased(&spec.table))?;
        let delete = Delete {
            table: spec.table.clone(),
            condition,
        };
        Ok((delete, bindings))
    }

    /// Builds and renders a SELECT.
    ///
    /// ```
    /// use sqlx_statement::{Criteria, Dialect, Order, SelectSpec, StatementAssembler};
    ///
    /// let spec = SelectSpec::new("person")
    ///     .with_criteria(Criteria::r#where("age").greater_than(18))
    ///     .with_order(Order::asc("name"))
    ///     .with_limit(10);
    /// let statement = StatementAssembler::new(Dialect::Postgres).build_select(&spec)?;
    /// assert_eq!(
    ///     statement.sql(),
    ///     "SELECT * FROM person WHERE age > $1 ORDER BY name ASC LIMIT 10"
    /// );
    /// # Ok::<(), sqlx_statement::Error>(())
    /// ```
    pub fn build_select(&self, spec: &SelectSpec) -> Result<PreparedStatement> {
        let (select, bindings) = self.assemble_select(spec)?;
        let sql = self.renderer().render_select(&select)?;
        Ok(self.prepared(sql, bindings, None))
    }

    /// Builds and renders an INSERT. Requested keys come back through the
    /// dialect's [`GeneratedKeys`] strategy.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyAssignment`] when the spec assigns no column, and
    /// [`Error::Conversion`] when a value cannot be stored in its column type.
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlx_statement::{Dialect, GeneratedKeys, InsertSpec, StatementAssembler};
    ///
    /// let spec = InsertSpec::new("person")
    ///     .with_column("name", "Ann")
    ///     .returning(["id"]);
    /// let statement = StatementAssembler::new(Dialect::Postgres).build_insert(&spec)?;
    /// assert_eq!(statement.sql(), "INSERT INTO person (name) VALUES ($1) RETURNING id");
    /// assert_eq!(statement.generated_keys(), Some(GeneratedKeys::Returning));
    /// # Ok::<(), sqlx_statement::Error>(())
    /// ```
    pub fn build_insert(&self, spec: &InsertSpec) -> Result<PreparedStatement> {
        let (insert, bindings) = self.assemble_insert(spec)?;
        let sql = self.renderer().render_insert(&insert);
        let keys = (!insert.returning.is_empty()).then(|| self.dialect.generated_keys());
        Ok(self.prepared(sql, bindings, keys))
    }

    /// Builds and renders an UPDATE. Assignment markers precede the WHERE
    /// markers.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyAssignment`] when the spec assigns no column, plus any
    /// error from mapping the criteria.
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlx_statement::{Criteria, Dialect, StatementAssembler, UpdateSpec};
    ///
    /// let spec = UpdateSpec::new("person")
    ///     .set("name", "Bob")
    ///     .with_criteria(Criteria::r#where("id").is(7));
    /// let statement = StatementAssembler::new(Dialect::MySql).build_update(&spec)?;
    /// assert_eq!(statement.sql(), "UPDATE person SET name = ? WHERE id = ?");
    /// assert_eq!(statement.bindings().len(), 2);
    /// # Ok::<(), sqlx_statement::Error>(())
    /// ```
    pub fn build_update(&self, spec: &UpdateSpec) -> Result<PreparedStatement> {
        let (update, bindings) = self.assemble_update(spec)?;
        let sql = self.renderer().render_update(&update)?;
        Ok(self.prepared(sql, bindings, None))
    }

    /// Builds and renders a DELETE. Empty criteria delete every row.
    ///
    /// # Errors
    ///
    /// Any error from mapping the criteria, such as
    /// [`Error::UnsupportedComparator`].
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlx_statement::{Criteria, DeleteSpec, Dialect, StatementAssembler};
    ///
    /// let spec = DeleteSpec::new("person").with_criteria(Criteria::r#where("id").is(7));
    /// let statement = StatementAssembler::new(Dialect::SqlServer).build_delete(&spec)?;
    /// assert_eq!(statement.sql(), "DELETE FROM person WHERE id = @id");
    /// # Ok::<(), sqlx_statement::Error>(())
    /// ```
    pub fn build_delete(&self, spec: &DeleteSpec) -> Result<PreparedStatement> {
        let (delete, bindings) = self.assemble_delete(spec)?;
        let sql = self.renderer().render_delete(&delete)?;
        Ok(self.prepared(sql, bindings, None))
    }

    fn prepared(
        &self,
        sql: String,
        bindings: Bindings,
        generated_keys: Option<GeneratedKeys>,
    ) -> PreparedStatement {
        debug!(dialect = %self.dialect, sql = %sql, bindings = bindings.len(), "built statement");
        PreparedStatement {
            sql,
            bindings,
            generated_keys,
        }
    }

    fn where_clause(
        &self,
        markers: &mut BindMarkers,
        criteria: &Criteria,
        table: &Table,
    ) -> Result<(Option<Condition>, Bindings)> {
        if criteria.is_empty() {
            return Ok((None, Bindings::new()));
        }
        let mapped = ConditionMapper::new(self.dialect, self.converter).map(
            markers,
            criteria,
            table,
            self.metadata,
        )?;
        Ok((Some(mapped.condition), mapped.bindings))
    }

    fn assign(
        &self,
        markers: &mut BindMarkers,
        bindings: &mut Bindings,
        assignment: &Assignment,
    ) -> Result<(Column, Expression)> {
        let name = self.column_name(&assignment.column);
        let declared = assignment
            .declared
            .clone()
            .or_else(|| self.metadata.and_then(|m| m.declared_type(&assignment.column)))
            .unwrap_or_else(|| assignment.value.type_descriptor());
        let value = self.converter.to_storable(&assignment.value, &declared)?;
        let marker = markers.next_for(&name);
        if value.is_null() {
            bindings.bind_null(marker.clone(), declared);
        } else {
            bindings.bind(marker.clone(), value);
        }
        Ok((Column::new(name), Expression::Marker(marker)))
    }

    fn column_name(&self, property: &str) -> String {
        self.metadata
            .and_then(|m| m.column_for(property))
            .unwrap_or(property)
            .to_owned()
    }

    fn column(&self, table: &Table, property: &str) -> Column {
        Column::of(table, self.column_name(property))
    }
}

/// UPDATE and DELETE name their table without an alias, so qualified WHERE
/// columns must use the table name.
fn unaliased(table: &Table) -> Table {
    Table::new(table.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::BindValue;
    use crate::metadata::EntityMapping;
    use crate::statement::{Order, Page};
    use crate::value::{TypeDescriptor, Value};

    #[test]
    fn test_select_star_without_criteria() {
        let statement = StatementAssembler::new(Dialect::Postgres)
            .build_select(&SelectSpec::new("person"))
            .unwrap();
        assert_eq!(statement.sql(), "SELECT * FROM person");
        assert!(statement.bindings().is_empty());
    }

    #[test]
    fn test_select_with_everything() {
        let spec = SelectSpec::new("person")
            .with_projection(["id", "name"])
            .with_distinct(true)
            .with_criteria(Criteria::r#where("name").is("Ann").and("age").is_in([30, 31]))
            .with_sort([Order::desc("age").nulls_first(), Order::asc("name")])
            .with_page(Page::of(1, 20));

        let (sql, bindings) = StatementAssembler::new(Dialect::Postgres)
            .build_select(&spec)
            .unwrap()
            .into_parts();
        assert_eq!(
            sql,
            "SELECT DISTINCT id, name FROM person WHERE name = $1 AND age IN ($2, $3) \
             ORDER BY age DESC NULLS FIRST, name ASC LIMIT 20 OFFSET 20"
        );
        assert_eq!(
            bindings.values(),
            vec![Value::from("Ann"), Value::Int(30), Value::Int(31)]
        );
    }

    #[test]
    fn test_select_paging_per_dialect() {
        let spec = SelectSpec::new("t").with_limit(5).with_offset(10);
        let render = |d: Dialect| {
            StatementAssembler::new(d)
                .build_select(&spec)
                .unwrap()
                .sql()
                .to_owned()
        };
        assert_eq!(render(Dialect::MySql), "SELECT * FROM t LIMIT 10, 5");
        assert_eq!(render(Dialect::Oracle), "SELECT * FROM t OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY");
        assert_eq!(
            render(Dialect::SqlServer),
            "SELECT * FROM t ORDER BY (SELECT 1) OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY"
        );
    }

    #[test]
    fn test_insert_binds_every_column() {
        let spec = InsertSpec::new("person")
            .with_column("name", "Ann")
            .with_null("email", TypeDescriptor::Text)
            .returning(["id"]);
        let statement = StatementAssembler::new(Dialect::Postgres)
            .build_insert(&spec)
            .unwrap();
        assert_eq!(
            statement.sql(),
            "INSERT INTO person (name, email) VALUES ($1, $2) RETURNING id"
        );
        assert_eq!(statement.generated_keys(), Some(GeneratedKeys::Returning));
        let values: Vec<_> = statement.bindings().iter().map(|b| b.value.clone()).collect();
        assert_eq!(
            values,
            vec![
                BindValue::Value(Value::from("Ann")),
                BindValue::Null(TypeDescriptor::Text),
            ]
        );
    }

    #[test]
    fn test_insert_returning_through_driver() {
        let spec = InsertSpec::new("person").with_column("name", "Ann").returning(["id"]);
        let statement = StatementAssembler::new(Dialect::MySql)
            .build_insert(&spec)
            .unwrap();
        assert_eq!(statement.sql(), "INSERT INTO person (name) VALUES (?)");
        assert_eq!(statement.generated_keys(), Some(GeneratedKeys::Driver));
    }

    #[test]
    fn test_insert_without_assignments_fails() {
        let result = StatementAssembler::new(Dialect::Postgres).build_insert(&InsertSpec::new("t"));
        assert!(matches!(result, Err(Error::EmptyAssignment("INSERT"))));
    }

    #[test]
    fn test_update_binds_set_before_where() {
        let spec = UpdateSpec::new("person")
            .set("name", "Bob")
            .set("age", 40)
            .with_criteria(Criteria::r#where("id").is(7));
        let (sql, bindings) = StatementAssembler::new(Dialect::Postgres)
            .build_update(&spec)
            .unwrap()
            .into_parts();
        assert_eq!(sql, "UPDATE person SET name = $1, age = $2 WHERE id = $3");
        assert_eq!(
            bindings.values(),
            vec![Value::from("Bob"), Value::Int(40), Value::Int(7)]
        );
    }

    #[test]
    fn test_update_without_assignments_fails() {
        let spec = UpdateSpec::new("person").with_criteria(Criteria::r#where("id").is(1));
        let result = StatementAssembler::new(Dialect::Postgres).build_update(&spec);
        assert!(matches!(result, Err(Error::EmptyAssignment("UPDATE"))));
    }

    #[test]
    fn test_delete_with_and_without_criteria() {
        let assembler = StatementAssembler::new(Dialect::SqlServer);
        let bare = assembler.build_delete(&DeleteSpec::new("person")).unwrap();
        assert_eq!(bare.sql(), "DELETE FROM person");

        let spec = DeleteSpec::new("person").with_criteria(Criteria::r#where("id").is_in([1, 2]));
        let filtered = assembler.build_delete(&spec).unwrap();
        assert_eq!(filtered.sql(), "DELETE FROM person WHERE id IN (@id, @id_1)");
    }

    #[test]
    fn test_entity_metadata_maps_properties() {
        let person = EntityMapping::new()
            .property("firstName", "first_name", TypeDescriptor::Text)
            .property("createdAt", "created_at", TypeDescriptor::Int);
        let assembler = StatementAssembler::new(Dialect::Postgres)
            .with_entity_metadata(&person)
            .with_render_options(RenderOptions {
                quote_identifiers: true,
                qualify_columns: true,
            });

        let spec = SelectSpec::new(Table::aliased("person", "p"))
            .with_projection(["firstName"])
            .with_criteria(Criteria::r#where("firstName").is("Ann"))
            .with_order(Order::desc("createdAt"));
        let statement = assembler.build_select(&spec).unwrap();
        assert_eq!(
            statement.sql(),
            "SELECT \"p\".\"first_name\" FROM \"person\" \"p\" WHERE \"p\".\"first_name\" = $1 \
             ORDER BY \"p\".\"created_at\" DESC"
        );

        let update = UpdateSpec::new("person").set("firstName", "Bo");
        assert_eq!(
            assembler.build_update(&update).unwrap().sql(),
            "UPDATE \"person\" SET \"first_name\" = $1"
        );
    }

    #[test]
    fn test_aliased_table_qualifies_update_and_delete_by_name() {
        let assembler = StatementAssembler::new(Dialect::Postgres).with_render_options(RenderOptions {
            quote_identifiers: false,
            qualify_columns: true,
        });

        let update = UpdateSpec::new(Table::aliased("person", "p"))
            .set("name", "Bo")
            .with_criteria(Criteria::r#where("id").is(1));
        assert_eq!(
            assembler.build_update(&update).unwrap().sql(),
            "UPDATE person SET name = $1 WHERE person.id = $2"
        );

        let delete =
            DeleteSpec::new(Table::aliased("person", "p")).with_criteria(Criteria::r#where("id").is(1));
        assert_eq!(
            assembler.build_delete(&delete).unwrap().sql(),
            "DELETE FROM person WHERE person.id = $1"
        );
    }

    #[test]
    fn test_unsupported_comparator_emits_nothing() {
        let spec = SelectSpec::new("t").with_criteria(Criteria::r#where("tags").contains(Value::list(["a"])));
        let result = StatementAssembler::new(Dialect::Sqlite).build_select(&spec);
        assert!(matches!(result, Err(Error::UnsupportedComparator { .. })));
    }
}
