//! Maps a [`Criteria`] chain to a [`Condition`] tree plus bindings.
//!
//! The chain is replayed oldest to newest. Each node's condition joins the
//! accumulator with that node's own combinator, so
//! `where(a).or(b).and(c)` maps to `(a OR b) AND c`. Groups map recursively
//! and come back nested.

use tracing::trace;

use crate::bindings::Bindings;
use crate::condition::{Column, ComparisonOp, Condition, Expression, Literal, Table};
use crate::criteria::{Combinator, Comparator, Criteria, Predicate};
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::marker::BindMarkers;
use crate::metadata::EntityMetadata;
use crate::value::{TypeDescriptor, Value, ValueConverter};

/// Mapped condition with the bindings for its markers.
#[derive(Debug)]
pub struct MappedCondition {
    pub condition: Condition,
    pub bindings: Bindings,
}

/// Criteria to condition mapper for one dialect.
#[derive(Clone, Copy)]
pub struct ConditionMapper<'a> {
    dialect: Dialect,
    converter: &'a dyn ValueConverter,
}

struct MappingContext<'m> {
    markers: &'m mut BindMarkers,
    bindings: Bindings,
    table: &'m Table,
    metadata: Option<&'m dyn EntityMetadata>,
}

impl<'a> ConditionMapper<'a> {
    /// Mapper converting bound values through `converter`.
    ///
    /// ```
    /// use sqlx_statement::mapper::ConditionMapper;
    /// use sqlx_statement::render::Renderer;
    /// use sqlx_statement::{Criteria, DefaultValueConverter, Dialect, RenderOptions, Table};
    ///
    /// let converter = DefaultValueConverter;
    /// let mapper = ConditionMapper::new(Dialect::Postgres, &converter);
    /// let mut markers = Dialect::Postgres.bind_markers().create();
    /// let criteria = Criteria::r#where("age").greater_than(18).and("name").is("Ann");
    ///
    /// let mapped = mapper.map(&mut markers, &criteria, &Table::new("person"), None)?;
    /// let sql = Renderer::new(Dialect::Postgres, RenderOptions::default())
    ///     .render_condition(&mapped.condition)?;
    /// assert_eq!(sql, "age > $1 AND name = $2");
    /// assert_eq!(mapped.bindings.len(), 2);
    /// # Ok::<(), sqlx_statement::Error>(())
    /// ```
    pub fn new(dialect: Dialect, converter: &'a dyn ValueConverter) -> Self {
        Self { dialect, converter }
    }

    /// Maps `criteria` against `table`, allocating markers from `markers`.
    ///
    /// Property names resolve through `metadata`; without it names are used
    /// as columns and the declared type defaults to the value's own type.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyCriteria`] when the chain holds no predicate,
    /// [`Error::UnsupportedComparator`] for comparators the dialect cannot
    /// render, and any error from the value converter.
    pub fn map(
        &self,
        markers: &mut BindMarkers,
        criteria: &Criteria,
        table: &Table,
        metadata: Option<&dyn EntityMetadata>,
    ) -> Result<MappedCondition> {
        let mut cx = MappingContext {
            markers,
            bindings: Bindings::new(),
            table,
            metadata,
        };
        let condition = self
            .map_chain(criteria, &mut cx)?
            .ok_or(Error::EmptyCriteria)?;
        Ok(MappedCondition {
            condition,
            bindings: cx.bindings,
        })
    }

    fn map_chain(&self, criteria: &Criteria, cx: &mut MappingContext<'_>) -> Result<Option<Condition>> {
        let mut accumulated: Option<Condition> = None;
        for node in criteria.chain() {
            let next = if let Some(members) = node.group() {
                self.map_group(members, cx)?
            } else if let Some(predicate) = node.predicate() {
                Some(self.map_predicate(predicate, cx)?)
            } else {
                None
            };
            let Some(next) = next else {
                continue;
            };
            accumulated = Some(match accumulated {
                None => next,
                Some(acc) => match node.combinator() {
                    Combinator::Or => acc.or(next),
                    Combinator::And | Combinator::Initial => acc.and(next),
                },
            });
        }
        Ok(accumulated)
    }

    fn map_group(&self, members: &[Criteria], cx: &mut MappingContext<'_>) -> Result<Option<Condition>> {
        let mut accumulated: Option<Condition> = None;
        for member in members {
            if let Some(condition) = self.map_chain(member, cx)? {
                accumulated = Some(match accumulated {
                    None => condition,
                    Some(acc) => acc.and(condition),
                });
            }
        }
        Ok(accumulated.map(Condition::nest))
    }

    fn map_predicate(&self, predicate: &Predicate, cx: &mut MappingContext<'_>) -> Result<Condition> {
        let property = predicate.column.as_str();
        let column_name = cx
            .metadata
            .and_then(|m| m.column_for(property))
            .unwrap_or(property)
            .to_owned();
        let declared = cx
            .metadata
            .and_then(|m| m.declared_type(property))
            .unwrap_or_else(|| predicate.value.type_descriptor());
        let column = Expression::Column(Column::of(cx.table, column_name.as_str()));

        trace!(
            column = %column_name,
            comparator = predicate.comparator.keyword(),
            "mapping predicate"
        );

        let condition = match predicate.comparator {
            Comparator::IsNull => Condition::IsNull(column),
            Comparator::IsNotNull => Condition::IsNotNull(column),
            Comparator::IsTrue | Comparator::IsFalse => Condition::comparison(
                column,
                ComparisonOp::Eq,
                Expression::Literal(Literal::Bool(predicate.comparator == Comparator::IsTrue)),
            ),
            Comparator::In | Comparator::NotIn => {
                let negated = predicate.comparator == Comparator::NotIn;
                let elements = match &predicate.value {
                    Value::List(items) | Value::Tuple(items) | Value::Array(items) => items.as_slice(),
                    scalar => std::slice::from_ref(scalar),
                };
                if elements.is_empty() {
                    return Ok(if negated {
                        Condition::always_true()
                    } else {
                        Condition::always_false()
                    });
                }
                let element_type = declared.element().clone();
                let values = elements
                    .iter()
                    .map(|v| self.bind(cx, &column_name, v, &element_type))
                    .collect::<Result<Vec<_>>>()?;
                let condition = Condition::In {
                    left: column,
                    values,
                };
                if negated {
                    condition.not()
                } else {
                    condition
                }
            }
            Comparator::Between | Comparator::NotBetween => {
                let bounds = predicate.value.flatten();
                let [low, high] = bounds.as_slice() else {
                    return Err(Error::BindingArity {
                        name: property.to_owned(),
                        expected: 2,
                        actual: bounds.len(),
                    });
                };
                let element_type = declared.element().clone();
                let low = self.bind(cx, &column_name, low, &element_type)?;
                let high = self.bind(cx, &column_name, high, &element_type)?;
                let condition = Condition::Between {
                    expr: column,
                    low,
                    high,
                };
                if predicate.comparator == Comparator::NotBetween {
                    condition.not()
                } else {
                    condition
                }
            }
            Comparator::Contains => {
                if !self.dialect.supports_array_comparison() {
                    return Err(Error::UnsupportedComparator {
                        comparator: predicate.comparator.keyword(),
                        dialect: self.dialect.name(),
                    });
                }
                let array = self.converter.to_array(&predicate.value, declared.element())?;
                let marker = cx.markers.next_for(&column_name);
                cx.bindings.bind(marker.clone(), array);
                Condition::comparison(column, ComparisonOp::Contains, Expression::Marker(marker))
            }
            Comparator::Eq
            | Comparator::Neq
            | Comparator::Lt
            | Comparator::Lte
            | Comparator::Gt
            | Comparator::Gte
            | Comparator::Like
            | Comparator::NotLike => {
                let op = match predicate.comparator {
                    Comparator::Eq => ComparisonOp::Eq,
                    Comparator::Neq => ComparisonOp::NotEq,
                    Comparator::Lt => ComparisonOp::Lt,
                    Comparator::Lte => ComparisonOp::LtEq,
                    Comparator::Gt => ComparisonOp::Gt,
                    Comparator::Gte => ComparisonOp::GtEq,
                    Comparator::Like => ComparisonOp::Like,
                    _ => ComparisonOp::NotLike,
                };
                let value = self.bind(cx, &column_name, &predicate.value, &declared)?;
                if predicate.ignore_case && is_textual(&declared, &predicate.value) {
                    Condition::comparison(column.upper(), op, value.upper())
                } else {
                    Condition::comparison(column, op, value)
                }
            }
        };
        Ok(condition)
    }

    fn bind(
        &self,
        cx: &mut MappingContext<'_>,
        column: &str,
        value: &Value,
        declared: &TypeDescriptor,
    ) -> Result<Expression> {
        let converted = self.converter.to_storable(value, declared)?;
        let marker = cx.markers.next_for(column);
        if converted.is_null() {
            cx.bindings.bind_null(marker.clone(), declared.clone());
        } else {
            cx.bindings.bind(marker.clone(), converted);
        }
        Ok(Expression::Marker(marker))
    }
}

fn is_textual(declared: &TypeDescriptor, value: &Value) -> bool {
    match declared {
        TypeDescriptor::Text => true,
        TypeDescriptor::Unknown => matches!(value, Value::Text(_)),
        _ => false,
    }
}
