//! Dialect-specific rendering of statement ASTs to SQL text.

use serde::Deserialize;

use crate::ast::{Delete, Insert, OrderByField, Select, Statement, Update};
use crate::condition::{Column, ComparisonOp, Condition, Expression, Literal, Table};
use crate::dialect::{Dialect, GeneratedKeys};
use crate::error::{Error, Result};
use crate::statement::{Direction, NullHandling};

/// Identifier rendering switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Quote table and column names with the dialect's quote characters.
    pub quote_identifiers: bool,
    /// Prefix columns with their table (or alias) outside INSERT/SET lists.
    pub qualify_columns: bool,
}

/// Renders statements for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    dialect: Dialect,
    options: RenderOptions,
}

impl Renderer {
    pub fn new(dialect: Dialect, options: RenderOptions) -> Self {
        Self { dialect, options }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn render(&self, statement: &Statement) -> Result<String> {
        match statement {
            Statement::Select(s) => self.render_select(s),
            Statement::Insert(s) => Ok(self.render_insert(s)),
            Statement::Update(s) => self.render_update(s),
            Statement::Delete(s) => self.render_delete(s),
        }
    }

    pub fn render_select(&self, select: &Select) -> Result<String> {
        let mut sql = String::from("SELECT ");
        if select.distinct {
            sql.push_str("DISTINCT ");
        }
        if select.projection.is_empty() {
            sql.push('*');
        } else {
            let columns: Vec<_> = select.projection.iter().map(|c| self.column(c, true)).collect();
            sql.push_str(&columns.join(", "));
        }
        sql.push_str(" FROM ");
        sql.push_str(&self.table(&select.table, true));

        if let Some(condition) = &select.condition {
            sql.push_str(" WHERE ");
            self.write_condition(&mut sql, condition)?;
        }

        if !select.order_by.is_empty() {
            let fields: Vec<_> = select.order_by.iter().map(|f| self.order_field(f)).collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&fields.join(", "));
        }

        Ok(self.paginate(sql, !select.order_by.is_empty(), select.limit, select.offset))
    }

    /// Appends the pagination clause to rendered SELECT text. Dialects whose
    /// OFFSET needs an ORDER BY get a neutral one when the statement has none.
    fn paginate(
        &self,
        mut sql: String,
        ordered: bool,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> String {
        let Some(clause) = self.dialect.limit_offset_clause(limit, offset) else {
            return sql;
        };
        if self.dialect.requires_order_by_for_offset() && !ordered {
            sql.push_str(" ORDER BY (SELECT 1)");
        }
        sql.push(' ');
        sql.push_str(&clause);
        sql
    }

    pub fn render_insert(&self, insert: &Insert) -> String {
        let columns: Vec<_> = insert.columns.iter().map(|c| self.column(c, false)).collect();
        let values: Vec<_> = insert.values.iter().map(|v| self.expression(v)).collect();

        let mut sql = format!(
            "INSERT INTO {} ({})",
            self.table(&insert.table, false),
            columns.join(", ")
        );
        let returning: Vec<_> = insert.returning.iter().map(|c| self.column(c, false)).collect();
        let keys = self.dialect.generated_keys();
        if !returning.is_empty() && keys == GeneratedKeys::Output {
            let inserted: Vec<_> = returning.iter().map(|c| format!("INSERTED.{c}")).collect();
            sql.push_str(" OUTPUT ");
            sql.push_str(&inserted.join(", "));
        }
        sql.push_str(" VALUES (");
        sql.push_str(&values.join(", "));
        sql.push(')');
        if !returning.is_empty() && keys == GeneratedKeys::Returning {
            sql.push_str(" RETURNING ");
            sql.push_str(&returning.join(", "));
        }
        sql
    }

    pub fn render_update(&self, update: &Update) -> Result<String> {
        let assignments: Vec<_> = update
            .assignments
            .iter()
            .map(|(c, v)| format!("{} = {}", self.column(c, false), self.expression(v)))
            .collect();
        let mut sql = format!(
            "UPDATE {} SET {}",
            self.table(&update.table, false),
            assignments.join(", ")
        );
        if let Some(condition) = &update.condition {
            sql.push_str(" WHERE ");
            self.write_condition(&mut sql, condition)?;
        }
        Ok(sql)
    }

    pub fn render_delete(&self, delete: &Delete) -> Result<String> {
        let mut sql = format!("DELETE FROM {}", self.table(&delete.table, false));
        if let Some(condition) = &delete.condition {
            sql.push_str(" WHERE ");
            self.write_condition(&mut sql, condition)?;
        }
        Ok(sql)
    }

    pub fn render_condition(&self, condition: &Condition) -> Result<String> {
        let mut sql = String::new();
        self.write_condition(&mut sql, condition)?;
        Ok(sql)
    }

    fn write_condition(&self, out: &mut String, condition: &Condition) -> Result<()> {
        match condition {
            Condition::Comparison { left, op, right } => {
                if *op == ComparisonOp::Contains && !self.dialect.supports_array_comparison() {
                    return Err(Error::UnsupportedComparator {
                        comparator: "CONTAINS",
                        dialect: self.dialect.name(),
                    });
                }
                out.push_str(&self.expression(left));
                out.push(' ');
                out.push_str(op.as_sql());
                out.push(' ');
                out.push_str(&self.expression(right));
            }
            Condition::In { left, values } => self.write_in(out, left, values, false),
            Condition::Between { expr, low, high } => {
                self.write_between(out, expr, low, high, false)
            }
            Condition::IsNull(e) => {
                out.push_str(&self.expression(e));
                out.push_str(" IS NULL");
            }
            Condition::IsNotNull(e) => {
                out.push_str(&self.expression(e));
                out.push_str(" IS NOT NULL");
            }
            Condition::Not(inner) => match inner.as_ref() {
                Condition::In { left, values } => self.write_in(out, left, values, true),
                Condition::Between { expr, low, high } => {
                    self.write_between(out, expr, low, high, true)
                }
                Condition::Nested(_) => {
                    out.push_str("NOT ");
                    self.write_condition(out, inner)?;
                }
                other => {
                    out.push_str("NOT (");
                    self.write_condition(out, other)?;
                    out.push(')');
                }
            },
            Condition::And(left, right) => {
                self.write_and_operand(out, left)?;
                out.push_str(" AND ");
                self.write_and_operand(out, right)?;
            }
            Condition::Or(left, right) => {
                self.write_condition(out, left)?;
                out.push_str(" OR ");
                self.write_condition(out, right)?;
            }
            Condition::Nested(inner) => {
                out.push('(');
                self.write_condition(out, inner)?;
                out.push(')');
            }
        }
        Ok(())
    }

    /// OR binds looser than AND, so an OR operand of AND is parenthesized.
    fn write_and_operand(&self, out: &mut String, operand: &Condition) -> Result<()> {
        if matches!(operand, Condition::Or(..)) {
            out.push('(');
            self.write_condition(out, operand)?;
            out.push(')');
            Ok(())
        } else {
            self.write_condition(out, operand)
        }
    }

    fn write_in(&self, out: &mut String, left: &Expression, values: &[Expression], negated: bool) {
        let values: Vec<_> = values.iter().map(|v| self.expression(v)).collect();
        out.push_str(&self.expression(left));
        out.push_str(if negated { " NOT IN (" } else { " IN (" });
        out.push_str(&values.join(", "));
        out.push(')');
    }

    fn write_between(
        &self,
        out: &mut String,
        expr: &Expression,
        low: &Expression,
        high: &Expression,
        negated: bool,
    ) {
        out.push_str(&self.expression(expr));
        out.push_str(if negated { " NOT BETWEEN " } else { " BETWEEN " });
        out.push_str(&self.expression(low));
        out.push_str(" AND ");
        out.push_str(&self.expression(high));
    }

    fn expression(&self, expr: &Expression) -> String {
        match expr {
            Expression::Column(c) => self.column(c, true),
            Expression::Marker(m) => m.placeholder().to_owned(),
            Expression::Literal(Literal::Bool(b)) => self.dialect.format_bool(*b).to_owned(),
            Expression::Literal(Literal::Int(i)) => i.to_string(),
            Expression::Upper(inner) => format!("UPPER({})", self.expression(inner)),
        }
    }

    fn order_field(&self, field: &OrderByField) -> String {
        let column = self.column(&field.column, true);
        let direction = match field.direction {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        };
        match field.nulls {
            NullHandling::Native => format!("{column} {direction}"),
            NullHandling::NullsFirst if self.dialect.supports_nulls_ordering() => {
                format!("{column} {direction} NULLS FIRST")
            }
            NullHandling::NullsLast if self.dialect.supports_nulls_ordering() => {
                format!("{column} {direction} NULLS LAST")
            }
            NullHandling::NullsFirst => {
                format!("CASE WHEN {column} IS NULL THEN 0 ELSE 1 END, {column} {direction}")
            }
            NullHandling::NullsLast => {
                format!("CASE WHEN {column} IS NULL THEN 1 ELSE 0 END, {column} {direction}")
            }
        }
    }

    fn ident(&self, name: &str) -> String {
        if self.options.quote_identifiers {
            self.dialect.quote_identifier(name)
        } else {
            name.to_owned()
        }
    }

    fn table(&self, table: &Table, with_alias: bool) -> String {
        match (&table.alias, with_alias) {
            (Some(alias), true) => format!("{} {}", self.ident(&table.name), self.ident(alias)),
            _ => self.ident(&table.name),
        }
    }

    fn column(&self, column: &Column, qualify: bool) -> String {
        match &column.table {
            Some(table) if qualify && self.options.qualify_columns => {
                format!("{}.{}", self.ident(table), self.ident(&column.name))
            }
            _ => self.ident(&column.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::BindMarkerFactory;

    fn select(table: Table) -> Select {
        Select {
            table,
            projection: Vec::new(),
            distinct: false,
            condition: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    #[test]
    fn test_sqlserver_offset_gets_order_by() {
        let renderer = Renderer::new(Dialect::SqlServer, RenderOptions::default());
        let mut ast = select(Table::new("person"));
        ast.limit = Some(10);
        ast.offset = Some(20);
        assert_eq!(
            renderer.render_select(&ast).unwrap(),
            "SELECT * FROM person ORDER BY (SELECT 1) OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"
        );

        ast.order_by.push(OrderByField {
            column: Column::new("id"),
            direction: Direction::Asc,
            nulls: NullHandling::Native,
        });
        assert_eq!(
            renderer.render_select(&ast).unwrap(),
            "SELECT * FROM person ORDER BY id ASC OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"
        );
    }

    #[test]
    fn test_sqlserver_order_by_detection_ignores_identifiers() {
        let renderer = Renderer::new(
            Dialect::SqlServer,
            RenderOptions {
                quote_identifiers: true,
                qualify_columns: false,
            },
        );
        let mut ast = select(Table::new("person"));
        ast.projection = vec![Column::new("sort ORDER BY x")];
        ast.offset = Some(5);
        assert_eq!(
            renderer.render_select(&ast).unwrap(),
            "SELECT [sort ORDER BY x] FROM [person] ORDER BY (SELECT 1) OFFSET 5 ROWS"
        );
    }

    #[test]
    fn test_quoting_and_qualification() {
        let options = RenderOptions {
            quote_identifiers: true,
            qualify_columns: true,
        };
        let table = Table::aliased("person", "p");
        let mut ast = select(table.clone());
        ast.projection = vec![Column::of(&table, "id")];
        ast.condition = Some(Condition::IsNull(Expression::Column(Column::of(&table, "name"))));

        let sql = Renderer::new(Dialect::MySql, options).render_select(&ast).unwrap();
        assert_eq!(sql, "SELECT `p`.`id` FROM `person` `p` WHERE `p`.`name` IS NULL");
    }

    #[test]
    fn test_nulls_ordering_native_and_emulated() {
        let field = OrderByField {
            column: Column::new("name"),
            direction: Direction::Desc,
            nulls: NullHandling::NullsLast,
        };
        let mut ast = select(Table::new("t"));
        ast.order_by.push(field);

        let pg = Renderer::new(Dialect::Postgres, RenderOptions::default());
        assert_eq!(
            pg.render_select(&ast).unwrap(),
            "SELECT * FROM t ORDER BY name DESC NULLS LAST"
        );
        let mysql = Renderer::new(Dialect::MySql, RenderOptions::default());
        assert_eq!(
            mysql.render_select(&ast).unwrap(),
            "SELECT * FROM t ORDER BY CASE WHEN name IS NULL THEN 1 ELSE 0 END, name DESC"
        );
    }

    #[test]
    fn test_insert_generated_keys() {
        let mut markers = BindMarkerFactory::named("@", "P", 32).create();
        let insert = Insert {
            table: Table::new("person"),
            columns: vec![Column::new("name")],
            values: vec![Expression::Marker(markers.next_for("name"))],
            returning: vec![Column::new("id")],
        };
        assert_eq!(
            Renderer::new(Dialect::SqlServer, RenderOptions::default()).render_insert(&insert),
            "INSERT INTO person (name) OUTPUT INSERTED.id VALUES (@name)"
        );
        assert_eq!(
            Renderer::new(Dialect::Postgres, RenderOptions::default()).render_insert(&insert),
            "INSERT INTO person (name) VALUES (@name) RETURNING id"
        );
        assert_eq!(
            Renderer::new(Dialect::MySql, RenderOptions::default()).render_insert(&insert),
            "INSERT INTO person (name) VALUES (@name)"
        );
    }

    #[test]
    fn test_generic_negation_is_parenthesized() {
        let condition = Condition::comparison(
            Expression::Column(Column::new("a")),
            ComparisonOp::Eq,
            Expression::Literal(Literal::Int(1)),
        )
        .not();
        let sql = Renderer::new(Dialect::Postgres, RenderOptions::default())
            .render_condition(&condition)
            .unwrap();
        assert_eq!(sql, "NOT (a = 1)");
    }
}
