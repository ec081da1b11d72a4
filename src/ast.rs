//! Statement AST, the input of [`crate::render::Renderer`].

use crate::condition::{Column, Condition, Expression, Table};
use crate::statement::{Direction, NullHandling};

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByField {
    pub column: Column,
    pub direction: Direction,
    pub nulls: NullHandling,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub table: Table,
    /// Empty means `*`.
    pub projection: Vec<Column>,
    pub distinct: bool,
    pub condition: Option<Condition>,
    pub order_by: Vec<OrderByField>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: Table,
    pub columns: Vec<Column>,
    pub values: Vec<Expression>,
    pub returning: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: Table,
    pub assignments: Vec<(Column, Expression)>,
    pub condition: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: Table,
    pub condition: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Select),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
}

impl From<Select> for Statement {
    fn from(s: Select) -> Self {
        Statement::Select(s)
    }
}

impl From<Insert> for Statement {
    fn from(s: Insert) -> Self {
        Statement::Insert(s)
    }
}

impl From<Update> for Statement {
    fn from(s: Update) -> Self {
        Statement::Update(s)
    }
}

impl From<Delete> for Statement {
    fn from(s: Delete) -> Self {
        Statement::Delete(s)
    }
}
