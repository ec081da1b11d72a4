//! Accumulated marker/value pairs replayed against an execution sink.

use crate::error::Result;
use crate::marker::{BindMarker, BindTarget};
use crate::value::{TypeDescriptor, Value};

/// What a marker receives.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Value(Value),
    /// A typed NULL, for drivers that need the type of an absent value.
    Null(TypeDescriptor),
}

/// One marker paired with its value.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub marker: BindMarker,
    pub value: BindValue,
}

/// Receives bind instructions when [`Bindings`] are applied.
pub trait ExecutionSink {
    fn bind_value(&mut self, target: &BindTarget, value: &Value) -> Result<()>;

    fn bind_null(&mut self, target: &BindTarget, ty: &TypeDescriptor) -> Result<()>;
}

/// Append-only bind plan for one statement.
///
/// `Bindings` are applied exactly once: [`Bindings::apply_to`] consumes them.
#[derive(Debug, Default, PartialEq)]
pub struct Bindings {
    entries: Vec<Binding>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a value. `Value::Null` becomes a NULL of unknown type.
    pub fn bind(&mut self, marker: BindMarker, value: Value) {
        let value = match value {
            Value::Null => BindValue::Null(TypeDescriptor::Unknown),
            other => BindValue::Value(other),
        };
        self.entries.push(Binding { marker, value });
    }

    pub fn bind_null(&mut self, marker: BindMarker, ty: TypeDescriptor) {
        self.entries.push(Binding {
            marker,
            value: BindValue::Null(ty),
        });
    }

    /// Appends every binding of `other` after the existing ones.
    pub fn append(&mut self, other: Bindings) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.entries.iter()
    }

    /// Bound values in binding order, typed NULLs shown as `Value::Null`.
    pub fn values(&self) -> Vec<Value> {
        self.entries
            .iter()
            .map(|b| match &b.value {
                BindValue::Value(v) => v.clone(),
                BindValue::Null(_) => Value::Null,
            })
            .collect()
    }

    /// Replays every binding against the sink, in order.
    pub fn apply_to<S>(self, sink: &mut S) -> Result<()>
    where
        S: ExecutionSink + ?Sized,
    {
        for Binding { marker, value } in self.entries {
            match value {
                BindValue::Value(v) => sink.bind_value(marker.target(), &v)?,
                BindValue::Null(ty) => sink.bind_null(marker.target(), &ty)?,
            }
        }
        Ok(())
    }
}

impl IntoIterator for Bindings {
    type Item = Binding;
    type IntoIter = std::vec::IntoIter<Binding>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::BindMarkerFactory;

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl ExecutionSink for Recorder {
        fn bind_value(&mut self, target: &BindTarget, value: &Value) -> Result<()> {
            self.0.push(format!("{target:?}={value:?}"));
            Ok(())
        }

        fn bind_null(&mut self, target: &BindTarget, ty: &TypeDescriptor) -> Result<()> {
            self.0.push(format!("{target:?}=NULL::{ty:?}"));
            Ok(())
        }
    }

    #[test]
    fn test_apply_replays_in_order() {
        let mut markers = BindMarkerFactory::indexed("$", 1).create();
        let mut bindings = Bindings::new();
        bindings.bind(markers.next(), Value::Int(7));
        bindings.bind_null(markers.next(), TypeDescriptor::Text);
        bindings.bind(markers.next(), Value::Null);

        let mut sink = Recorder::default();
        bindings.apply_to(&mut sink).unwrap();
        assert_eq!(
            sink.0,
            vec![
                "Index(0)=Int(7)",
                "Index(1)=NULL::Text",
                "Index(2)=NULL::Unknown",
            ]
        );
    }

    #[test]
    fn test_append_keeps_order() {
        let mut markers = BindMarkerFactory::anonymous("?").create();
        let mut first = Bindings::new();
        first.bind(markers.next(), Value::from("a"));
        let mut second = Bindings::new();
        second.bind(markers.next(), Value::from("b"));
        first.append(second);
        assert_eq!(first.values(), vec![Value::from("a"), Value::from("b")]);
    }
}
