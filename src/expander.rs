//! Expansion of parsed templates into dialect SQL and a bind plan.
//!
//! Every occurrence of a named parameter becomes one or more bind markers:
//!
//! - a scalar becomes one marker
//! - a list becomes one marker per element joined by `", "`; tuple elements
//!   render as `(m1, m2)`
//! - a name missing from the source still gets one marker, to be bound later
//!   through [`ExpandedSql::bind`]

use std::collections::{BTreeMap, HashMap};

use tracing::trace;

use crate::bindings::{BindValue, Bindings};
use crate::error::{Error, Result};
use crate::marker::{BindMarker, BindMarkerFactory};
use crate::parser::ParsedSqlTemplate;
use crate::value::{TypeDescriptor, Value};

/// Supplies values for named parameters.
pub trait ParameterSource {
    fn value(&self, name: &str) -> Option<&Value>;

    fn has_value(&self, name: &str) -> bool {
        self.value(name).is_some()
    }

    /// Declared type, used for typed NULLs.
    fn declared_type(&self, _name: &str) -> Option<TypeDescriptor> {
        None
    }
}

impl ParameterSource for HashMap<String, Value> {
    fn value(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

impl ParameterSource for BTreeMap<String, Value> {
    fn value(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

/// Map-backed source that also records declared types.
#[derive(Debug, Clone, Default)]
pub struct MapParameterSource {
    values: BTreeMap<String, Value>,
    types: HashMap<String, TypeDescriptor>,
}

impl MapParameterSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Adds a NULL carrying its type.
    pub fn with_null(mut self, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        let name = name.into();
        self.types.insert(name.clone(), ty);
        self.values.insert(name, Value::Null);
        self
    }

    /// Builds a source from the members of a JSON object. Arrays become lists.
    pub fn from_json(object: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            values: object.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            types: HashMap::new(),
        }
    }
}

impl ParameterSource for MapParameterSource {
    fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    fn declared_type(&self, name: &str) -> Option<TypeDescriptor> {
        self.types.get(name).cloned()
    }
}

#[derive(Debug)]
struct ExpandedOccurrence {
    name: String,
    markers: Vec<BindMarker>,
}

/// Expanded SQL with markers remembered per parameter name.
#[derive(Debug)]
pub struct ExpandedSql {
    sql: String,
    occurrences: Vec<ExpandedOccurrence>,
    values: HashMap<String, BindValue>,
}

/// Expands `template` with markers from `factory` and values from `source`.
///
/// # Errors
///
/// Returns [`Error::EmptyCollection`] when a list parameter has no elements.
///
/// # Examples
///
/// ```
/// use sqlx_statement::{expand, Dialect, MapParameterSource, ParsedSqlTemplate, Value};
///
/// let template = ParsedSqlTemplate::parse("SELECT * FROM t WHERE id IN (:ids)")?;
/// let source = MapParameterSource::new().with("ids", Value::list([1, 2, 3]));
/// let (sql, bindings) = expand(&template, &Dialect::Postgres.bind_markers(), &source)?.finish()?;
/// assert_eq!(sql, "SELECT * FROM t WHERE id IN ($1, $2, $3)");
/// assert_eq!(bindings.len(), 3);
/// # Ok::<(), sqlx_statement::Error>(())
/// ```
pub fn expand(
    template: &ParsedSqlTemplate,
    factory: &BindMarkerFactory,
    source: &dyn ParameterSource,
) -> Result<ExpandedSql> {
    let text = template.rewritten_sql();
    let mut markers = factory.create();
    let mut sql = String::with_capacity(text.len() + 8 * template.total_occurrence_count());
    let mut occurrences = Vec::with_capacity(template.total_occurrence_count());
    let mut values = HashMap::new();
    let mut last = 0;

    for occurrence in template.occurrences() {
        sql.push_str(&text[last..occurrence.start]);
        last = occurrence.end;

        let name = occurrence.name.as_str();
        let mut allocated = Vec::new();
        match source.value(name) {
            Some(Value::List(items)) => {
                if items.is_empty() {
                    return Err(Error::EmptyCollection(name.to_owned()));
                }
                for (k, item) in items.iter().enumerate() {
                    if k > 0 {
                        sql.push_str(", ");
                    }
                    match item {
                        Value::List(row) | Value::Tuple(row) => {
                            sql.push('(');
                            push_markers(&mut sql, &mut allocated, &mut markers, name, row.len());
                            sql.push(')');
                        }
                        _ => push_markers(&mut sql, &mut allocated, &mut markers, name, 1),
                    }
                }
            }
            Some(Value::Tuple(row)) => {
                push_markers(&mut sql, &mut allocated, &mut markers, name, row.len().max(1))
            }
            _ => push_markers(&mut sql, &mut allocated, &mut markers, name, 1),
        }
        trace!(parameter = name, markers = allocated.len(), "expanded parameter");

        if let Some(value) = source.value(name) {
            values
                .entry(name.to_owned())
                .or_insert_with(|| bind_value(value.clone(), source.declared_type(name)));
        }
        occurrences.push(ExpandedOccurrence {
            name: name.to_owned(),
            markers: allocated,
        });
    }
    sql.push_str(&text[last..]);

    Ok(ExpandedSql {
        sql,
        occurrences,
        values,
    })
}

fn push_markers(
    sql: &mut String,
    allocated: &mut Vec<BindMarker>,
    markers: &mut crate::marker::BindMarkers,
    name: &str,
    count: usize,
) {
    for k in 0..count {
        if k > 0 {
            sql.push_str(", ");
        }
        let marker = markers.next_for(name);
        sql.push_str(marker.placeholder());
        allocated.push(marker);
    }
}

fn bind_value(value: Value, declared: Option<TypeDescriptor>) -> BindValue {
    match value {
        Value::Null => BindValue::Null(declared.unwrap_or_default()),
        other => BindValue::Value(other),
    }
}

impl ExpandedSql {
    /// The expanded statement text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Every marker allocated for `name`, in encounter order.
    pub fn markers_for(&self, name: &str) -> Vec<&BindMarker> {
        self.occurrences
            .iter()
            .filter(|o| o.name == name)
            .flat_map(|o| o.markers.iter())
            .collect()
    }

    /// Names that still lack a value.
    pub fn unbound(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for o in &self.occurrences {
            if !self.values.contains_key(&o.name) && !names.contains(&o.name.as_str()) {
                names.push(&o.name);
            }
        }
        names
    }

    /// Binds (or rebinds) `name`. The value fans out to every occurrence.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownParameter`] when the statement never mentions `name`,
    /// [`Error::BindingArity`] when the flattened value count differs from the
    /// markers of any occurrence.
    pub fn bind(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let actual = value.flatten().len();
        let mut found = false;
        for occurrence in self.occurrences.iter().filter(|o| o.name == name) {
            found = true;
            if occurrence.markers.len() != actual {
                return Err(Error::BindingArity {
                    name: name.to_owned(),
                    expected: occurrence.markers.len(),
                    actual,
                });
            }
        }
        if !found {
            return Err(Error::UnknownParameter(name.to_owned()));
        }
        self.values.insert(name.to_owned(), bind_value(value, None));
        Ok(())
    }

    /// Binds a typed NULL to every marker of `name`.
    pub fn bind_null(&mut self, name: &str, ty: TypeDescriptor) -> Result<()> {
        if !self.occurrences.iter().any(|o| o.name == name) {
            return Err(Error::UnknownParameter(name.to_owned()));
        }
        self.values.insert(name.to_owned(), BindValue::Null(ty));
        Ok(())
    }

    /// Produces the SQL text and bindings in textual marker order.
    ///
    /// # Errors
    ///
    /// [`Error::UnresolvedParameter`] for the first name without a value,
    /// [`Error::BindingArity`] when a value supplied by the source does not
    /// fill its markers.
    pub fn finish(self) -> Result<(String, Bindings)> {
        let mut bindings = Bindings::new();
        for occurrence in self.occurrences {
            let value = self
                .values
                .get(&occurrence.name)
                .ok_or_else(|| Error::UnresolvedParameter(occurrence.name.clone()))?;
            match value {
                BindValue::Null(ty) => {
                    for marker in occurrence.markers {
                        bindings.bind_null(marker, ty.clone());
                    }
                }
                BindValue::Value(v) => {
                    let elements = v.flatten();
                    if elements.len() != occurrence.markers.len() {
                        return Err(Error::BindingArity {
                            name: occurrence.name,
                            expected: occurrence.markers.len(),
                            actual: elements.len(),
                        });
                    }
                    for (marker, element) in occurrence.markers.into_iter().zip(elements) {
                        bindings.bind(marker, element.clone());
                    }
                }
            }
        }
        Ok((self.sql, bindings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::marker::BindTarget;

    fn template(sql: &str) -> ParsedSqlTemplate {
        ParsedSqlTemplate::parse(sql).unwrap()
    }

    fn targets(bindings: &Bindings) -> Vec<String> {
        bindings
            .iter()
            .map(|b| b.marker.placeholder().to_owned())
            .collect()
    }

    #[test]
    fn test_expand_end_to_end_positional() {
        let source = MapParameterSource::new().with("id", 7).with("name", "Ann");
        let (sql, bindings) = expand(
            &template("SELECT * FROM t WHERE id = :id AND name = :name"),
            &Dialect::Postgres.bind_markers(),
            &source,
        )
        .unwrap()
        .finish()
        .unwrap();

        assert_eq!(sql, "SELECT * FROM t WHERE id = $1 AND name = $2");
        assert_eq!(targets(&bindings), vec!["$1", "$2"]);
        assert_eq!(bindings.values(), vec![Value::Int(7), Value::from("Ann")]);
    }

    #[test]
    fn test_every_occurrence_gets_a_marker() {
        let source = MapParameterSource::new().with("a", 1).with("b", 2);
        let (sql, bindings) = expand(
            &template("SELECT :a, :b, :a, :a"),
            &Dialect::Postgres.bind_markers(),
            &source,
        )
        .unwrap()
        .finish()
        .unwrap();

        assert_eq!(sql, "SELECT $1, $2, $3, $4");
        assert_eq!(
            bindings.values(),
            vec![Value::Int(1), Value::Int(2), Value::Int(1), Value::Int(1)]
        );
    }

    #[test]
    fn test_list_expands_without_trailing_separator() {
        let source = MapParameterSource::new().with("ids", Value::list([1, 2, 3]));
        let expanded = expand(
            &template("DELETE FROM t WHERE id IN (:ids)"),
            &Dialect::MySql.bind_markers(),
            &source,
        )
        .unwrap();
        assert_eq!(expanded.sql(), "DELETE FROM t WHERE id IN (?, ?, ?)");
        let (_, bindings) = expanded.finish().unwrap();
        let positions: Vec<_> = bindings.iter().map(|b| b.marker.target().clone()).collect();
        assert_eq!(
            positions,
            vec![BindTarget::Index(0), BindTarget::Index(1), BindTarget::Index(2)]
        );
    }

    #[test]
    fn test_list_of_tuples_renders_rows() {
        let source = MapParameterSource::new().with("pairs", Value::list([(1, "a"), (2, "b")]));
        let (sql, bindings) = expand(
            &template("SELECT * FROM t WHERE (id, code) IN (:pairs)"),
            &Dialect::Postgres.bind_markers(),
            &source,
        )
        .unwrap()
        .finish()
        .unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE (id, code) IN (($1, $2), ($3, $4))");
        assert_eq!(
            bindings.values(),
            vec![Value::Int(1), Value::from("a"), Value::Int(2), Value::from("b")]
        );
    }

    #[test]
    fn test_json_rows_render_as_tuples() {
        let json = serde_json::json!({ "pairs": [[1, "a"], [2, "b"]] });
        let serde_json::Value::Object(object) = json else {
            unreachable!()
        };
        let source = MapParameterSource::from_json(object);
        let (sql, bindings) = expand(
            &template("SELECT * FROM t WHERE (id, code) IN (:pairs)"),
            &Dialect::Postgres.bind_markers(),
            &source,
        )
        .unwrap()
        .finish()
        .unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE (id, code) IN (($1, $2), ($3, $4))");
        assert_eq!(
            bindings.values(),
            vec![Value::Int(1), Value::from("a"), Value::Int(2), Value::from("b")]
        );
    }

    #[test]
    fn test_empty_list_is_rejected() {
        let source = MapParameterSource::new().with("ids", Value::List(vec![]));
        let result = expand(
            &template("SELECT * FROM t WHERE id IN (:ids)"),
            &Dialect::Postgres.bind_markers(),
            &source,
        );
        assert!(matches!(result, Err(Error::EmptyCollection(name)) if name == "ids"));
    }

    #[test]
    fn test_absent_parameter_keeps_shape_and_binds_later() {
        let mut expanded = expand(
            &template("UPDATE t SET a = :a WHERE b = :b OR c = :b"),
            &Dialect::SqlServer.bind_markers(),
            &MapParameterSource::new().with("a", 1),
        )
        .unwrap();
        assert_eq!(expanded.sql(), "UPDATE t SET a = @a WHERE b = @b OR c = @b_2");
        assert_eq!(expanded.unbound(), vec!["b"]);
        assert_eq!(expanded.markers_for("b").len(), 2);

        expanded.bind("b", "x").unwrap();
        let (_, bindings) = expanded.finish().unwrap();
        assert_eq!(
            bindings.values(),
            vec![Value::Int(1), Value::from("x"), Value::from("x")]
        );
    }

    #[test]
    fn test_unbound_parameter_fails_on_finish() {
        let expanded = expand(
            &template("SELECT * FROM t WHERE id = :id"),
            &Dialect::Postgres.bind_markers(),
            &MapParameterSource::new(),
        )
        .unwrap();
        assert_eq!(expanded.sql(), "SELECT * FROM t WHERE id = $1");
        assert!(matches!(
            expanded.finish(),
            Err(Error::UnresolvedParameter(name)) if name == "id"
        ));
    }

    #[test]
    fn test_bind_arity_mismatch() {
        let mut expanded = expand(
            &template("SELECT * FROM t WHERE id IN (:ids)"),
            &Dialect::Postgres.bind_markers(),
            &MapParameterSource::new(),
        )
        .unwrap();
        let err = expanded.bind("ids", Value::list([1, 2])).unwrap_err();
        assert!(matches!(
            err,
            Error::BindingArity { expected: 1, actual: 2, .. }
        ));
        assert!(matches!(
            expanded.bind("missing", 1),
            Err(Error::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_list_fans_out_to_repeated_occurrences() {
        let source = MapParameterSource::new().with("ids", Value::list([1, 2]));
        let (sql, bindings) = expand(
            &template("SELECT * FROM a WHERE x IN (:ids) OR y IN (:ids)"),
            &Dialect::Postgres.bind_markers(),
            &source,
        )
        .unwrap()
        .finish()
        .unwrap();
        assert_eq!(sql, "SELECT * FROM a WHERE x IN ($1, $2) OR y IN ($3, $4)");
        assert_eq!(bindings.len(), 4);
    }

    #[test]
    fn test_typed_null_from_source() {
        let source = MapParameterSource::new().with_null("n", TypeDescriptor::Int);
        let (_, bindings) = expand(
            &template("UPDATE t SET n = :n"),
            &Dialect::Postgres.bind_markers(),
            &source,
        )
        .unwrap()
        .finish()
        .unwrap();
        let binding = bindings.iter().next().unwrap();
        assert_eq!(binding.value, BindValue::Null(TypeDescriptor::Int));
    }

    #[test]
    fn test_escape_and_quotes_survive_expansion() {
        let source = MapParameterSource::new().with("v", 1);
        let (sql, bindings) = expand(
            &template("SELECT '\\:v', ':v', \\:v, :v::int -- :v"),
            &Dialect::Postgres.bind_markers(),
            &source,
        )
        .unwrap()
        .finish()
        .unwrap();
        assert_eq!(sql, "SELECT '\\:v', ':v', :v, $1::int -- :v");
        assert_eq!(bindings.len(), 1);
    }

    #[test]
    fn test_source_from_json() {
        let json = serde_json::json!({ "ids": [1, 2], "name": "Ann" });
        let serde_json::Value::Object(object) = json else {
            unreachable!()
        };
        let source = MapParameterSource::from_json(object);
        let (sql, _) = expand(
            &template("SELECT * FROM t WHERE id IN (:ids) AND name = :name"),
            &Dialect::Postgres.bind_markers(),
            &source,
        )
        .unwrap()
        .finish()
        .unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE id IN ($1, $2) AND name = $3");
    }
}
