use std::fmt::Display;

use crate::object::Obj;

/// Runtime value. Heap-allocated variants hold references into the arena the
/// VM was built over, so values are plain `Copy` data.
#[derive(Copy, Clone, Debug)]
pub enum Value<'heap> {
    Nil,
    Bool(bool),
    Number(f64),
    Obj(Obj<'heap>),
}

impl<'heap> Value<'heap> {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match *self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_obj(&self) -> Option<Obj<'heap>> {
        match *self {
            Value::Obj(obj) => Some(obj),
            _ => None,
        }
    }

    /// Only `nil` and `false` are falsy; every number and string is truthy.
    pub fn is_falsy(&self) -> bool {
        matches!(self, Value::Nil | Value::Bool(false))
    }
}

/// Equality never coerces: comparing values of different types is `false`.
/// Object comparison dispatches on the variant; see [`Obj`].
impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Obj(a), Value::Obj(b)) => a == b,
            _ => false,
        }
    }
}

impl Display for Value<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Obj(obj) => write!(f, "{}", obj),
        }
    }
}
