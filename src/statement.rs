//! Statement specifications.
//!
//! Specs are immutable values: every `with_*` method returns a new spec and
//! leaves the receiver untouched.

use crate::condition::Table;
use crate::criteria::Criteria;
use crate::value::{TypeDescriptor, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullHandling {
    /// Leave NULL placement to the database.
    #[default]
    Native,
    NullsFirst,
    NullsLast,
}

/// One ORDER BY field, by logical property name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub property: String,
    pub direction: Direction,
    pub nulls: NullHandling,
}

impl Order {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Asc,
            nulls: NullHandling::Native,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            direction: Direction::Desc,
            ..Self::asc(property)
        }
    }

    pub fn nulls_first(self) -> Self {
        Self {
            nulls: NullHandling::NullsFirst,
            ..self
        }
    }

    pub fn nulls_last(self) -> Self {
        Self {
            nulls: NullHandling::NullsLast,
            ..self
        }
    }
}

/// Row window of a SELECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Page {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Page {
    /// Zero-based page `number` of `size` rows. The offset saturates at
    /// `u64::MAX`.
    pub fn of(number: u64, size: u64) -> Self {
        Self {
            limit: Some(size),
            offset: Some(number.saturating_mul(size)),
        }
    }

    pub fn is_unpaged(&self) -> bool {
        self.limit.is_none() && self.offset.is_none()
    }
}

/// A column receiving a value in INSERT or UPDATE.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: Value,
    /// Type for a NULL value.
    pub declared: Option<TypeDescriptor>,
}

#[derive(Debug, Clone)]
pub struct SelectSpec {
    pub(crate) table: Table,
    pub(crate) projection: Vec<String>,
    pub(crate) distinct: bool,
    pub(crate) criteria: Criteria,
    pub(crate) sort: Vec<Order>,
    pub(crate) page: Page,
}

impl SelectSpec {
    pub fn new(table: impl Into<Table>) -> Self {
        Self {
            table: table.into(),
            projection: Vec::new(),
            distinct: false,
            criteria: Criteria::empty(),
            sort: Vec::new(),
            page: Page::default(),
        }
    }

    /// Replaces the projection. Empty means `*`.
    pub fn with_projection<I, S>(&self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            projection: columns.into_iter().map(Into::into).collect(),
            ..self.clone()
        }
    }

    pub fn with_distinct(&self, distinct: bool) -> Self {
        Self {
            distinct,
            ..self.clone()
        }
    }

    pub fn with_criteria(&self, criteria: Criteria) -> Self {
        Self {
            criteria,
            ..self.clone()
        }
    }

    pub fn with_sort(&self, sort: impl IntoIterator<Item = Order>) -> Self {
        Self {
            sort: sort.into_iter().collect(),
            ..self.clone()
        }
    }

    /// Appends one ORDER BY field.
    pub fn with_order(&self, order: Order) -> Self {
        let mut next = self.clone();
        next.sort.push(order);
        next
    }

    pub fn with_page(&self, page: Page) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    pub fn with_limit(&self, limit: u64) -> Self {
        self.with_page(Page {
            limit: Some(limit),
            ..self.page
        })
    }

    pub fn with_offset(&self, offset: u64) -> Self {
        self.with_page(Page {
            offset: Some(offset),
            ..self.page
        })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn projection(&self) -> &[String] {
        &self.projection
    }

    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    pub fn sort(&self) -> &[Order] {
        &self.sort
    }

    pub fn page(&self) -> Page {
        self.page
    }
}

#[derive(Debug, Clone)]
pub struct InsertSpec {
    pub(crate) table: Table,
    pub(crate) assignments: Vec<Assignment>,
    pub(crate) returning: Vec<String>,
}

impl InsertSpec {
    pub fn new(table: impl Into<Table>) -> Self {
        Self {
            table: table.into(),
            assignments: Vec::new(),
            returning: Vec::new(),
        }
    }

    pub fn with_column(&self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut next = self.clone();
        next.assignments.push(Assignment {
            column: column.into(),
            value: value.into(),
            declared: None,
        });
        next
    }

    pub fn with_null(&self, column: impl Into<String>, ty: TypeDescriptor) -> Self {
        let mut next = self.clone();
        next.assignments.push(Assignment {
            column: column.into(),
            value: Value::Null,
            declared: Some(ty),
        });
        next
    }

    /// Requests generated values of `columns` back from the INSERT.
    pub fn returning<I, S>(&self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            returning: columns.into_iter().map(Into::into).collect(),
            ..self.clone()
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }
}

#[derive(Debug, Clone)]
pub struct UpdateSpec {
    pub(crate) table: Table,
    pub(crate) assignments: Vec<Assignment>,
    pub(crate) criteria: Criteria,
}

impl UpdateSpec {
    pub fn new(table: impl Into<Table>) -> Self {
        Self {
            table: table.into(),
            assignments: Vec::new(),
            criteria: Criteria::empty(),
        }
    }

    pub fn set(&self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut next = self.clone();
        next.assignments.push(Assignment {
            column: column.into(),
            value: value.into(),
            declared: None,
        });
        next
    }

    pub fn set_null(&self, column: impl Into<String>, ty: TypeDescriptor) -> Self {
        let mut next = self.clone();
        next.assignments.push(Assignment {
            column: column.into(),
            value: Value::Null,
            declared: Some(ty),
        });
        next
    }

    pub fn with_criteria(&self, criteria: Criteria) -> Self {
        Self {
            criteria,
            ..self.clone()
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }
}

#[derive(Debug, Clone)]
pub struct DeleteSpec {
    pub(crate) table: Table,
    pub(crate) criteria: Criteria,
}

impl DeleteSpec {
    pub fn new(table: impl Into<Table>) -> Self {
        Self {
            table: table.into(),
            criteria: Criteria::empty(),
        }
    }

    pub fn with_criteria(&self, criteria: Criteria) -> Self {
        Self {
            criteria,
            ..self.clone()
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }
}
