use bytes::Bytes;

use super::layout::FieldKind;
use super::record::Record;

/// A field value held by a [`Record`].
///
/// Integer kinds share variants by Rust type, i.e. `int32`, `sint32`, `sfixed32`, and
/// `enum` fields all hold an [`Value::Int32`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Bytes),
    Message(Record),
    Repeated(Vec<Value>),
}

impl Value {
    /// Whether this value can be stored in a single (non-repeated) field of `kind`.
    pub fn fits(&self, kind: FieldKind) -> bool {
        matches!(
            (kind, self),
            (FieldKind::Bool, Value::Bool(_))
                | (
                    FieldKind::Int32 | FieldKind::Sint32 | FieldKind::Sfixed32 | FieldKind::Enum,
                    Value::Int32(_)
                )
                | (
                    FieldKind::Int64 | FieldKind::Sint64 | FieldKind::Sfixed64,
                    Value::Int64(_)
                )
                | (FieldKind::UInt32 | FieldKind::Fixed32, Value::UInt32(_))
                | (FieldKind::UInt64 | FieldKind::Fixed64, Value::UInt64(_))
                | (FieldKind::Float, Value::Float(_))
                | (FieldKind::Double, Value::Double(_))
                | (FieldKind::String, Value::String(_))
                | (FieldKind::Bytes, Value::Bytes(_))
        ) || match (kind, self) {
            (FieldKind::Message(layout) | FieldKind::Group(layout), Value::Message(record)) => {
                core::ptr::eq(layout, record.layout())
            }
            _ => false,
        }
    }

    /// The kind used to encode this value when there is no declaration for it.
    pub fn natural_kind(&self) -> Option<FieldKind> {
        let kind = match self {
            Value::Bool(_) => FieldKind::Bool,
            Value::Int32(_) => FieldKind::Int32,
            Value::Int64(_) => FieldKind::Int64,
            Value::UInt32(_) => FieldKind::UInt32,
            Value::UInt64(_) => FieldKind::UInt64,
            Value::Float(_) => FieldKind::Float,
            Value::Double(_) => FieldKind::Double,
            Value::String(_) => FieldKind::String,
            Value::Bytes(_) => FieldKind::Bytes,
            Value::Message(record) => FieldKind::Message(record.layout()),
            Value::Repeated(_) => return None,
        };
        Some(kind)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::UInt32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&Record> {
        match self {
            Value::Message(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),+ $(,)?) => {$(
        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::$variant(value)
            }
        }
    )+};
}

impl_from! {
    bool => Bool,
    i32 => Int32,
    i64 => Int64,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
    String => String,
    Bytes => Bytes,
    Record => Message,
    Vec<Value> => Repeated,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Bytes(Bytes::copy_from_slice(value))
    }
}
