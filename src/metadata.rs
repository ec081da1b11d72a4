//! Entity metadata: logical property names mapped to columns and types.

use std::collections::HashMap;

use crate::value::TypeDescriptor;

/// Resolves logical property names of an entity.
pub trait EntityMetadata: Send + Sync {
    fn column_for(&self, property: &str) -> Option<&str>;

    fn declared_type(&self, property: &str) -> Option<TypeDescriptor>;
}

#[derive(Debug, Clone)]
struct PropertyMapping {
    column: String,
    ty: TypeDescriptor,
}

/// Table-driven [`EntityMetadata`].
///
/// ```
/// use sqlx_statement::{EntityMapping, EntityMetadata, TypeDescriptor};
///
/// let person = EntityMapping::new()
///     .property("firstName", "first_name", TypeDescriptor::Text)
///     .property("age", "age", TypeDescriptor::Int);
/// assert_eq!(person.column_for("firstName"), Some("first_name"));
/// assert_eq!(person.column_for("unknown"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EntityMapping {
    properties: HashMap<String, PropertyMapping>,
}

impl EntityMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property(
        mut self,
        property: impl Into<String>,
        column: impl Into<String>,
        ty: TypeDescriptor,
    ) -> Self {
        self.properties.insert(
            property.into(),
            PropertyMapping {
                column: column.into(),
                ty,
            },
        );
        self
    }
}

impl EntityMetadata for EntityMapping {
    fn column_for(&self, property: &str) -> Option<&str> {
        self.properties.get(property).map(|p| p.column.as_str())
    }

    fn declared_type(&self, property: &str) -> Option<TypeDescriptor> {
        self.properties.get(property).map(|p| p.ty.clone())
    }
}
