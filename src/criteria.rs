//! Immutable filter predicates composed with AND/OR and nested groups.
//!
//! A [`Criteria`] is the newest node of a backward-linked chain. Extending a
//! chain allocates one node pointing at its predecessor, so every prefix stays
//! valid and shareable.
//!
//! ```
//! use sqlx_statement::Criteria;
//!
//! let adults = Criteria::r#where("age").greater_than_or_equals(18);
//! let named = adults.and("name").like("A%");
//! let either = adults.or("vip").is_true();
//! assert_eq!(named.chain().len(), 2);
//! assert_eq!(either.chain().len(), 2);
//! ```

use std::sync::Arc;

use crate::value::Value;

/// How a node joins the condition accumulated before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Initial,
    And,
    Or,
}

/// Comparison applied by a leaf predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    NotLike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    IsTrue,
    IsFalse,
    Between,
    NotBetween,
    /// Array containment.
    Contains,
}

impl Comparator {
    pub fn keyword(&self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Neq => "!=",
            Comparator::Lt => "<",
            Comparator::Lte => "<=",
            Comparator::Gt => ">",
            Comparator::Gte => ">=",
            Comparator::Like => "LIKE",
            Comparator::NotLike => "NOT LIKE",
            Comparator::In => "IN",
            Comparator::NotIn => "NOT IN",
            Comparator::IsNull => "IS NULL",
            Comparator::IsNotNull => "IS NOT NULL",
            Comparator::IsTrue => "IS TRUE",
            Comparator::IsFalse => "IS FALSE",
            Comparator::Between => "BETWEEN",
            Comparator::NotBetween => "NOT BETWEEN",
            Comparator::Contains => "CONTAINS",
        }
    }
}

/// A single `column <comparator> value` test.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Logical property name, resolved to a column during mapping.
    pub column: String,
    pub comparator: Comparator,
    pub value: Value,
    pub ignore_case: bool,
}

#[derive(Debug)]
enum NodeKind {
    Empty,
    Leaf(Predicate),
    Group(Vec<Criteria>),
}

#[derive(Debug)]
struct Node {
    previous: Option<Criteria>,
    combinator: Combinator,
    kind: NodeKind,
}

/// A filter predicate chain. Cloning is O(1).
#[derive(Debug, Clone)]
pub struct Criteria {
    node: Arc<Node>,
}

impl Criteria {
    fn link(previous: Option<Criteria>, combinator: Combinator, kind: NodeKind) -> Self {
        Self {
            node: Arc::new(Node {
                previous,
                combinator,
                kind,
            }),
        }
    }

    /// A chain with no predicate.
    pub fn empty() -> Self {
        Self::link(None, Combinator::Initial, NodeKind::Empty)
    }

    /// Starts a chain on `column`.
    pub fn r#where(column: impl Into<String>) -> CriteriaStep {
        CriteriaStep {
            previous: None,
            combinator: Combinator::Initial,
            column: column.into(),
        }
    }

    /// A group of chains combined with AND.
    pub fn from_group(group: impl IntoIterator<Item = Criteria>) -> Self {
        Self::link(None, Combinator::Initial, NodeKind::Group(group.into_iter().collect()))
    }

    /// Continues the chain with an AND-combined predicate on `column`.
    pub fn and(&self, column: impl Into<String>) -> CriteriaStep {
        self.step(Combinator::And, column.into())
    }

    /// Continues the chain with an OR-combined predicate on `column`.
    pub fn or(&self, column: impl Into<String>) -> CriteriaStep {
        self.step(Combinator::Or, column.into())
    }

    /// AND-combines a parenthesized group.
    pub fn and_group(&self, group: impl IntoIterator<Item = Criteria>) -> Criteria {
        Self::link(
            Some(self.clone()),
            Combinator::And,
            NodeKind::Group(group.into_iter().collect()),
        )
    }

    /// OR-combines a parenthesized group.
    pub fn or_group(&self, group: impl IntoIterator<Item = Criteria>) -> Criteria {
        Self::link(
            Some(self.clone()),
            Combinator::Or,
            NodeKind::Group(group.into_iter().collect()),
        )
    }

    /// Copy of this node with case-insensitive matching toggled. Only leaf
    /// predicates are affected.
    pub fn ignore_case(&self, ignore_case: bool) -> Criteria {
        match &self.node.kind {
            NodeKind::Leaf(predicate) => Self::link(
                self.node.previous.clone(),
                self.node.combinator,
                NodeKind::Leaf(Predicate {
                    ignore_case,
                    ..predicate.clone()
                }),
            ),
            _ => self.clone(),
        }
    }

    fn step(&self, combinator: Combinator, column: String) -> CriteriaStep {
        CriteriaStep {
            previous: Some(self.clone()),
            combinator,
            column,
        }
    }

    pub fn previous(&self) -> Option<&Criteria> {
        self.node.previous.as_ref()
    }

    pub fn combinator(&self) -> Combinator {
        self.node.combinator
    }

    /// The predicate of a leaf node.
    pub fn predicate(&self) -> Option<&Predicate> {
        match &self.node.kind {
            NodeKind::Leaf(p) => Some(p),
            _ => None,
        }
    }

    /// Members of a group node.
    pub fn group(&self) -> Option<&[Criteria]> {
        match &self.node.kind {
            NodeKind::Group(members) => Some(members),
            _ => None,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.node.kind, NodeKind::Group(_))
    }

    /// Whether neither this node nor any predecessor holds a predicate.
    pub fn is_empty(&self) -> bool {
        self.chain().into_iter().all(Criteria::is_node_empty)
    }

    fn is_node_empty(&self) -> bool {
        match &self.node.kind {
            NodeKind::Empty => true,
            NodeKind::Leaf(_) => false,
            NodeKind::Group(members) => members.iter().all(Criteria::is_empty),
        }
    }

    /// Nodes of the chain, oldest first.
    pub fn chain(&self) -> Vec<&Criteria> {
        let mut nodes = Vec::new();
        let mut current = Some(self);
        while let Some(node) = current {
            nodes.push(node);
            current = node.previous();
        }
        nodes.reverse();
        nodes
    }
}

impl Default for Criteria {
    fn default() -> Self {
        Self::empty()
    }
}

/// A chain awaiting the comparator for `column`.
#[derive(Debug, Clone)]
#[must_use = "a criteria step does nothing until a comparator is applied"]
pub struct CriteriaStep {
    previous: Option<Criteria>,
    combinator: Combinator,
    column: String,
}

impl CriteriaStep {
    fn finish(self, comparator: Comparator, value: Value) -> Criteria {
        Criteria::link(
            self.previous,
            self.combinator,
            NodeKind::Leaf(Predicate {
                column: self.column,
                comparator,
                value,
                ignore_case: false,
            }),
        )
    }

    /// `column = value`
    pub fn is(self, value: impl Into<Value>) -> Criteria {
        self.finish(Comparator::Eq, value.into())
    }

    /// `column != value`
    pub fn not(self, value: impl Into<Value>) -> Criteria {
        self.finish(Comparator::Neq, value.into())
    }

    pub fn less_than(self, value: impl Into<Value>) -> Criteria {
        self.finish(Comparator::Lt, value.into())
    }

    pub fn less_than_or_equals(self, value: impl Into<Value>) -> Criteria {
        self.finish(Comparator::Lte, value.into())
    }

    pub fn greater_than(self, value: impl Into<Value>) -> Criteria {
        self.finish(Comparator::Gt, value.into())
    }

    pub fn greater_than_or_equals(self, value: impl Into<Value>) -> Criteria {
        self.finish(Comparator::Gte, value.into())
    }

    pub fn like(self, pattern: impl Into<Value>) -> Criteria {
        self.finish(Comparator::Like, pattern.into())
    }

    pub fn not_like(self, pattern: impl Into<Value>) -> Criteria {
        self.finish(Comparator::NotLike, pattern.into())
    }

    /// `column IN (...)`. A single value still renders as a one-element list.
    pub fn is_in<I, T>(self, values: I) -> Criteria
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        self.finish(Comparator::In, Value::list(values))
    }

    pub fn is_not_in<I, T>(self, values: I) -> Criteria
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        self.finish(Comparator::NotIn, Value::list(values))
    }

    pub fn is_null(self) -> Criteria {
        self.finish(Comparator::IsNull, Value::Null)
    }

    pub fn is_not_null(self) -> Criteria {
        self.finish(Comparator::IsNotNull, Value::Null)
    }

    pub fn is_true(self) -> Criteria {
        self.finish(Comparator::IsTrue, Value::Bool(true))
    }

    pub fn is_false(self) -> Criteria {
        self.finish(Comparator::IsFalse, Value::Bool(false))
    }

    pub fn between(self, low: impl Into<Value>, high: impl Into<Value>) -> Criteria {
        self.finish(Comparator::Between, Value::Tuple(vec![low.into(), high.into()]))
    }

    pub fn not_between(self, low: impl Into<Value>, high: impl Into<Value>) -> Criteria {
        self.finish(
            Comparator::NotBetween,
            Value::Tuple(vec![low.into(), high.into()]),
        )
    }

    /// Array column contains every element of `value`.
    pub fn contains(self, value: impl Into<Value>) -> Criteria {
        self.finish(Comparator::Contains, value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_is_oldest_first() {
        let criteria = Criteria::r#where("a").is(1).and("b").is(2).or("c").is(3);
        let columns: Vec<_> = criteria
            .chain()
            .iter()
            .map(|c| c.predicate().unwrap().column.clone())
            .collect();
        assert_eq!(columns, vec!["a", "b", "c"]);
        assert_eq!(criteria.combinator(), Combinator::Or);
    }

    #[test]
    fn test_extending_does_not_touch_prefix() {
        let base = Criteria::r#where("a").is(1);
        let left = base.and("b").is(2);
        let right = base.or("c").is(3);
        assert_eq!(base.chain().len(), 1);
        assert_eq!(left.combinator(), Combinator::And);
        assert_eq!(right.combinator(), Combinator::Or);
        assert!(Arc::ptr_eq(
            &left.previous().unwrap().node,
            &right.previous().unwrap().node
        ));
    }

    #[test]
    fn test_emptiness() {
        assert!(Criteria::empty().is_empty());
        assert!(Criteria::from_group([Criteria::empty(), Criteria::empty()]).is_empty());
        assert!(Criteria::empty().and_group([Criteria::empty()]).is_empty());
        assert!(!Criteria::empty().and("a").is_null().is_empty());
    }

    #[test]
    fn test_group_node_carries_no_predicate() {
        let group = Criteria::r#where("a").is(1).or_group([Criteria::r#where("b").is(2)]);
        assert!(group.is_group());
        assert!(group.predicate().is_none());
        assert_eq!(group.group().unwrap().len(), 1);
    }

    #[test]
    fn test_ignore_case_replaces_head_only() {
        let criteria = Criteria::r#where("a").is(1).and("name").is("x").ignore_case(true);
        assert!(criteria.predicate().unwrap().ignore_case);
        assert!(!criteria.previous().unwrap().predicate().unwrap().ignore_case);
    }

    #[test]
    fn test_is_in_single_value_is_a_list() {
        let criteria = Criteria::r#where("id").is_in([5]);
        assert_eq!(
            criteria.predicate().unwrap().value,
            Value::List(vec![Value::Int(5)])
        );
    }
}
