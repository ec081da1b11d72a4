//! Condition AST produced by criteria mapping.

use crate::marker::BindMarker;

/// A table reference, optionally aliased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub alias: Option<String>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: Some(alias.into()),
        }
    }

    /// Name used to qualify columns of this table.
    pub fn reference(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

impl From<&str> for Table {
    fn from(name: &str) -> Self {
        Table::new(name)
    }
}

impl From<String> for Table {
    fn from(name: String) -> Self {
        Table::new(name)
    }
}

/// A column, with the table reference it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub table: Option<String>,
    pub name: String,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: None,
            name: name.into(),
        }
    }

    pub fn of(table: &Table, name: impl Into<String>) -> Self {
        Self {
            table: Some(table.reference().to_owned()),
            name: name.into(),
        }
    }
}

/// Inline literal, rendered without a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Column(Column),
    Marker(BindMarker),
    Literal(Literal),
    /// `UPPER(expr)`, for case-insensitive comparison.
    Upper(Box<Expression>),
}

impl Expression {
    pub fn upper(self) -> Self {
        Expression::Upper(Box::new(self))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    NotLike,
    /// Array containment, `left @> right`.
    Contains,
}

impl ComparisonOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::NotEq => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::LtEq => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::GtEq => ">=",
            ComparisonOp::Like => "LIKE",
            ComparisonOp::NotLike => "NOT LIKE",
            ComparisonOp::Contains => "@>",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Comparison {
        left: Expression,
        op: ComparisonOp,
        right: Expression,
    },
    In {
        left: Expression,
        values: Vec<Expression>,
    },
    Between {
        expr: Expression,
        low: Expression,
        high: Expression,
    },
    IsNull(Expression),
    IsNotNull(Expression),
    Not(Box<Condition>),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    /// A parenthesized group.
    Nested(Box<Condition>),
}

impl Condition {
    pub fn comparison(left: Expression, op: ComparisonOp, right: Expression) -> Self {
        Condition::Comparison { left, op, right }
    }

    /// `1 = 0`
    pub fn always_false() -> Self {
        Self::comparison(
            Expression::Literal(Literal::Int(1)),
            ComparisonOp::Eq,
            Expression::Literal(Literal::Int(0)),
        )
    }

    /// `1 = 1`
    pub fn always_true() -> Self {
        Self::comparison(
            Expression::Literal(Literal::Int(1)),
            ComparisonOp::Eq,
            Expression::Literal(Literal::Int(1)),
        )
    }

    pub fn and(self, other: Condition) -> Self {
        Condition::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Condition) -> Self {
        Condition::Or(Box::new(self), Box::new(other))
    }

    pub fn not(self) -> Self {
        Condition::Not(Box::new(self))
    }

    pub fn nest(self) -> Self {
        Condition::Nested(Box::new(self))
    }

    /// Markers referenced by the condition, in textual order.
    pub fn markers(&self) -> Vec<&BindMarker> {
        let mut out = Vec::new();
        self.collect_markers(&mut out);
        out
    }

    fn collect_markers<'a>(&'a self, out: &mut Vec<&'a BindMarker>) {
        match self {
            Condition::Comparison { left, right, .. } => {
                expression_markers(left, out);
                expression_markers(right, out);
            }
            Condition::In { left, values } => {
                expression_markers(left, out);
                values.iter().for_each(|v| expression_markers(v, out));
            }
            Condition::Between { expr, low, high } => {
                expression_markers(expr, out);
                expression_markers(low, out);
                expression_markers(high, out);
            }
            Condition::IsNull(e) | Condition::IsNotNull(e) => expression_markers(e, out),
            Condition::Not(c) | Condition::Nested(c) => c.collect_markers(out),
            Condition::And(l, r) | Condition::Or(l, r) => {
                l.collect_markers(out);
                r.collect_markers(out);
            }
        }
    }
}

fn expression_markers<'a>(expr: &'a Expression, out: &mut Vec<&'a BindMarker>) {
    match expr {
        Expression::Marker(m) => out.push(m),
        Expression::Upper(inner) => expression_markers(inner, out),
        Expression::Column(_) | Expression::Literal(_) => {}
    }
}
