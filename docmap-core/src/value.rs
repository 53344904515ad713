//! Runtime property values and the compile-time mapping of Rust types onto them.
//!
//! [`Value`] is what an entity hands to the mapper for each property and what codecs
//! produce when decoding. [`Mappable`] ties a Rust type to its [`ValueType`] descriptor
//! and converts between the type and [`Value`], so typed reads resolve their codec from
//! the type parameter alone.

use bson::{Decimal128, Uuid, oid::ObjectId};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta};
use rust_decimal::Decimal;
use std::fmt;

use crate::{
    error::{MappingError, MappingResult},
    types::ValueType,
};

/// The current value of a mapped property.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No value.
    Null,
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Single(f32),
    Double(f64),
    Decimal(Decimal),
    Decimal128(Decimal128),
    Char(char),
    String(String),
    Uuid(Uuid),
    ObjectId(ObjectId),
    Duration(TimeDelta),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
    /// An enumerant, identified by name.
    Enum(String),
    /// The elements of an array or sequence.
    Array(Vec<Value>),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in mismatch diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "bool",
            Value::Int8(_) => "i8",
            Value::Int16(_) => "i16",
            Value::Int32(_) => "i32",
            Value::Int64(_) => "i64",
            Value::UInt8(_) => "u8",
            Value::UInt16(_) => "u16",
            Value::UInt32(_) => "u32",
            Value::UInt64(_) => "u64",
            Value::Single(_) => "f32",
            Value::Double(_) => "f64",
            Value::Decimal(_) => "Decimal",
            Value::Decimal128(_) => "Decimal128",
            Value::Char(_) => "char",
            Value::String(_) => "String",
            Value::Uuid(_) => "Uuid",
            Value::ObjectId(_) => "ObjectId",
            Value::Duration(_) => "TimeDelta",
            Value::DateTime(_) => "NaiveDateTime",
            Value::DateTimeOffset(_) => "DateTime<FixedOffset>",
            Value::Enum(_) => "enum",
            Value::Array(_) => "array",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Int8(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt8(v) => write!(f, "{v}"),
            Value::UInt16(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Single(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::Decimal128(v) => write!(f, "{v:?}"),
            Value::Char(v) => write!(f, "{v:?}"),
            Value::String(v) => write!(f, "{v:?}"),
            Value::Uuid(v) => write!(f, "{v}"),
            Value::ObjectId(v) => write!(f, "{v}"),
            Value::Duration(v) => write!(f, "{v}"),
            Value::DateTime(v) => write!(f, "{v}"),
            Value::DateTimeOffset(v) => write!(f, "{v}"),
            Value::Enum(v) => f.write_str(v),
            Value::Array(items) => {
                f.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// A Rust type that can be stored in, and read back from, a mapped document field.
///
/// The descriptor returned by [`Mappable::value_type`] drives codec resolution, so a
/// typed read such as `read_element::<Option<String>>` needs no further type hints.
/// Enumerations implement this through `#[derive(Enumeration)]`.
pub trait Mappable: Sized {
    /// Returns the descriptor of this type.
    fn value_type() -> ValueType;

    /// Converts a reference to this type into a [`Value`].
    fn to_value(&self) -> Value;

    /// Converts a [`Value`] back into this type.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::TypeMismatch`] when the value has another shape.
    fn from_value(value: Value) -> MappingResult<Self>;
}

macro_rules! impl_mappable {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Mappable for $ty {
                fn value_type() -> ValueType {
                    ValueType::$variant
                }

                fn to_value(&self) -> Value {
                    Value::$variant(self.clone())
                }

                fn from_value(value: Value) -> MappingResult<Self> {
                    match value {
                        Value::$variant(inner) => Ok(inner),
                        other => Err(MappingError::type_mismatch(Self::value_type(), other.kind())),
                    }
                }
            }
        )*
    };
}

impl_mappable! {
    bool => Boolean,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Single,
    f64 => Double,
    Decimal => Decimal,
    Decimal128 => Decimal128,
    char => Char,
    String => String,
    Uuid => Uuid,
    ObjectId => ObjectId,
    TimeDelta => Duration,
    NaiveDateTime => DateTime,
    DateTime<FixedOffset> => DateTimeOffset,
}

// Stored the same way as the BSON uuid; only the Rust-side type differs.
impl Mappable for uuid::Uuid {
    fn value_type() -> ValueType {
        ValueType::Uuid
    }

    fn to_value(&self) -> Value {
        Value::Uuid(Uuid::from_bytes(self.into_bytes()))
    }

    fn from_value(value: Value) -> MappingResult<Self> {
        match value {
            Value::Uuid(inner) => Ok(uuid::Uuid::from_bytes(inner.bytes())),
            other => Err(MappingError::type_mismatch(Self::value_type(), other.kind())),
        }
    }
}

impl<T: Mappable> Mappable for Option<T> {
    fn value_type() -> ValueType {
        ValueType::nullable(T::value_type())
    }

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> MappingResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: Mappable> Mappable for Vec<T> {
    fn value_type() -> ValueType {
        ValueType::sequence(T::value_type())
    }

    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(Mappable::to_value).collect())
    }

    fn from_value(value: Value) -> MappingResult<Self> {
        match value {
            Value::Array(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(MappingError::type_mismatch(Self::value_type(), other.kind())),
        }
    }
}

impl<T: Mappable, const N: usize> Mappable for [T; N] {
    fn value_type() -> ValueType {
        ValueType::array(T::value_type())
    }

    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(Mappable::to_value).collect())
    }

    fn from_value(value: Value) -> MappingResult<Self> {
        let items = match value {
            Value::Array(items) => items,
            other => return Err(MappingError::type_mismatch(Self::value_type(), other.kind())),
        };
        let length = items.len();
        let elements = items
            .into_iter()
            .map(T::from_value)
            .collect::<MappingResult<Vec<_>>>()?;

        elements.try_into().map_err(|_| {
            MappingError::type_mismatch(format!("array of {N} elements"), format!("{length} elements"))
        })
    }
}
