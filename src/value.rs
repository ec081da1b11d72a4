//! Bindable values, their type descriptors and the conversion seam.
//!
//! [`Value`] distinguishes three collection shapes:
//!
//! - [`Value::List`] is a multi-valued parameter. Templates expand it into one
//!   marker per element and criteria render it as an `IN` list.
//! - [`Value::Tuple`] is a row value. Inside a list it renders as a
//!   parenthesized group of markers, and so does a nested list.
//! - [`Value::Array`] is a single storable array bound to one marker.

use crate::error::{Error, Result};

/// A value that can be bound to a marker.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    List(Vec<Value>),
    Tuple(Vec<Value>),
}

/// Declared storage type of a column or parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum TypeDescriptor {
    #[default]
    Unknown,
    Bool,
    Int,
    Float,
    Text,
    Bytes,
    Array(Box<TypeDescriptor>),
}

impl Value {
    /// Builds a multi-valued parameter from anything convertible.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    /// Builds a row value.
    pub fn tuple<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Value::Tuple(items.into_iter().map(Into::into).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Value::List(_) | Value::Tuple(_))
    }

    /// Runtime type of the value. Collections report the type of their first
    /// non-null element.
    pub fn type_descriptor(&self) -> TypeDescriptor {
        match self {
            Value::Null => TypeDescriptor::Unknown,
            Value::Bool(_) => TypeDescriptor::Bool,
            Value::Int(_) => TypeDescriptor::Int,
            Value::Float(_) => TypeDescriptor::Float,
            Value::Text(_) => TypeDescriptor::Text,
            Value::Bytes(_) => TypeDescriptor::Bytes,
            Value::Array(items) => TypeDescriptor::Array(Box::new(first_type(items))),
            Value::List(items) | Value::Tuple(items) => first_type(items),
        }
    }

    /// Elements of a list or tuple flattened one level, as bound to markers.
    /// Scalars and arrays yield themselves.
    pub fn flatten(&self) -> Vec<&Value> {
        match self {
            Value::List(items) => items
                .iter()
                .flat_map(|item| match item {
                    Value::List(row) | Value::Tuple(row) => row.iter().collect::<Vec<_>>(),
                    other => vec![other],
                })
                .collect(),
            Value::Tuple(row) => row.iter().collect(),
            other => vec![other],
        }
    }
}

fn first_type(items: &[Value]) -> TypeDescriptor {
    items
        .iter()
        .find(|v| !v.is_null())
        .map(Value::type_descriptor)
        .unwrap_or_default()
}

impl TypeDescriptor {
    /// Element type of an array descriptor, or the descriptor itself.
    pub fn element(&self) -> &TypeDescriptor {
        match self {
            TypeDescriptor::Array(inner) => inner,
            other => other,
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u16 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    String => Text,
    &str => Text,
    Vec<u8> => Bytes,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>, U: Into<Value>> From<(T, U)> for Value {
    fn from((a, b): (T, U)) -> Self {
        Value::Tuple(vec![a.into(), b.into()])
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match v {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::Text(s),
            Json::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            object @ Json::Object(_) => Value::Text(object.to_string()),
        }
    }
}

/// Converts caller values into values the driver can store.
pub trait ValueConverter: Send + Sync {
    /// Converts a scalar value for a column of the declared type.
    fn to_storable(&self, value: &Value, declared: &TypeDescriptor) -> Result<Value>;

    /// Converts a value into a storable array of the element type.
    fn to_array(&self, value: &Value, element: &TypeDescriptor) -> Result<Value>;
}

/// Converter applying lossless widenings and passing everything else through.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultValueConverter;

impl ValueConverter for DefaultValueConverter {
    fn to_storable(&self, value: &Value, declared: &TypeDescriptor) -> Result<Value> {
        let converted = match (value, declared) {
            (Value::Int(i), TypeDescriptor::Float) => Value::Float(*i as f64),
            (Value::Int(i), TypeDescriptor::Text) => Value::Text(i.to_string()),
            (Value::Bool(b), TypeDescriptor::Int) => Value::Int(i64::from(*b)),
            (Value::Int(i @ (0 | 1)), TypeDescriptor::Bool) => Value::Bool(*i == 1),
            (Value::Int(i), TypeDescriptor::Bool) => {
                return Err(Error::Conversion(format!("{i} is not a boolean")))
            }
            (Value::Text(s), TypeDescriptor::Bytes) => Value::Bytes(s.clone().into_bytes()),
            (Value::List(items) | Value::Array(items), TypeDescriptor::Array(element)) => {
                return self.to_array(&Value::Array(items.clone()), element)
            }
            (other, _) => other.clone(),
        };
        Ok(converted)
    }

    fn to_array(&self, value: &Value, element: &TypeDescriptor) -> Result<Value> {
        let items = match value {
            Value::Array(items) | Value::List(items) | Value::Tuple(items) => items.as_slice(),
            scalar => std::slice::from_ref(scalar),
        };
        items
            .iter()
            .map(|item| self.to_storable(item, element))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }
}
