//! Type descriptors for mapped properties.
//!
//! A [`ValueType`] is the closed, runtime description of a property's type. It is what
//! the codec resolver dispatches on and what the embedding convention classifies. Rust
//! types obtain their descriptor through [`Mappable::value_type`](crate::value::Mappable),
//! hosts that describe models dynamically build them directly or load them from JSON.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Describes the type of a mapped property.
///
/// Scalar variants map one-to-one onto built-in codecs. The remaining variants describe
/// enumerations, wrappers and containers, plus composite kinds (`Record`, `Generic`, maps)
/// that only matter to the embedding convention.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Single,
    Double,
    /// High-precision decimal (`rust_decimal::Decimal`).
    Decimal,
    /// IEEE 754-2008 128-bit decimal as stored natively by BSON.
    Decimal128,
    Char,
    String,
    Uuid,
    ObjectId,
    /// A signed time span.
    Duration,
    /// Date and time with a fixed UTC offset.
    DateTimeOffset,
    /// Date and time without an offset. Its codec depends on the property's date-time kind.
    DateTime,
    /// A named enumeration with a fixed set of enumerants.
    Enum(EnumType),
    /// The optional wrapper over exactly one other type.
    Nullable(Box<ValueType>),
    /// A fixed-size array of elements.
    Array(Box<ValueType>),
    /// A generic, growable sequence of elements.
    Sequence(Box<ValueType>),
    /// A generic map with typed keys and values.
    Map {
        key: Box<ValueType>,
        value: Box<ValueType>,
    },
    /// The string-keyed map of untyped values.
    UntypedMap,
    /// A plain, non-generic composite type.
    Record(String),
    /// Any other generic type that is not a container.
    Generic {
        name: String,
        arguments: Vec<ValueType>,
    },
}

impl ValueType {
    /// Wraps `inner` in [`ValueType::Nullable`].
    pub fn nullable(inner: ValueType) -> Self {
        ValueType::Nullable(Box::new(inner))
    }

    /// Creates a [`ValueType::Array`] of `element`.
    pub fn array(element: ValueType) -> Self {
        ValueType::Array(Box::new(element))
    }

    /// Creates a [`ValueType::Sequence`] of `element`.
    pub fn sequence(element: ValueType) -> Self {
        ValueType::Sequence(Box::new(element))
    }

    /// Creates a [`ValueType::Map`] from `key` to `value`.
    pub fn map(key: ValueType, value: ValueType) -> Self {
        ValueType::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Creates a [`ValueType::Record`] with the given name.
    pub fn record(name: impl Into<String>) -> Self {
        ValueType::Record(name.into())
    }

    /// Creates a [`ValueType::Generic`] with the given name and type arguments.
    pub fn generic(name: impl Into<String>, arguments: impl IntoIterator<Item = ValueType>) -> Self {
        ValueType::Generic {
            name: name.into(),
            arguments: arguments.into_iter().collect(),
        }
    }

    /// Returns `true` for the optional wrapper.
    pub fn is_nullable(&self) -> bool {
        matches!(self, ValueType::Nullable(_))
    }

    /// Returns `true` for types parameterized over other types.
    ///
    /// Fixed-size arrays are not generic; the nullable wrapper, sequences and maps are.
    pub fn is_generic(&self) -> bool {
        matches!(
            self,
            ValueType::Nullable(_)
                | ValueType::Sequence(_)
                | ValueType::Map { .. }
                | ValueType::UntypedMap
                | ValueType::Generic { .. }
        )
    }

    /// Returns `true` for types that can be iterated as a homogeneous set of elements.
    pub fn is_iterable(&self) -> bool {
        matches!(
            self,
            ValueType::Array(_)
                | ValueType::Sequence(_)
                | ValueType::Map { .. }
                | ValueType::UntypedMap
                | ValueType::String
        )
    }

    /// Returns the element type of an array or sequence.
    pub fn element_type(&self) -> Option<&ValueType> {
        match self {
            ValueType::Array(element) | ValueType::Sequence(element) => Some(element),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Boolean => f.write_str("bool"),
            ValueType::Int8 => f.write_str("i8"),
            ValueType::Int16 => f.write_str("i16"),
            ValueType::Int32 => f.write_str("i32"),
            ValueType::Int64 => f.write_str("i64"),
            ValueType::UInt8 => f.write_str("u8"),
            ValueType::UInt16 => f.write_str("u16"),
            ValueType::UInt32 => f.write_str("u32"),
            ValueType::UInt64 => f.write_str("u64"),
            ValueType::Single => f.write_str("f32"),
            ValueType::Double => f.write_str("f64"),
            ValueType::Decimal => f.write_str("Decimal"),
            ValueType::Decimal128 => f.write_str("Decimal128"),
            ValueType::Char => f.write_str("char"),
            ValueType::String => f.write_str("String"),
            ValueType::Uuid => f.write_str("Uuid"),
            ValueType::ObjectId => f.write_str("ObjectId"),
            ValueType::Duration => f.write_str("TimeDelta"),
            ValueType::DateTimeOffset => f.write_str("DateTime<FixedOffset>"),
            ValueType::DateTime => f.write_str("NaiveDateTime"),
            ValueType::Enum(enumeration) => f.write_str(&enumeration.name),
            ValueType::Nullable(inner) => write!(f, "Option<{inner}>"),
            ValueType::Array(element) => write!(f, "[{element}]"),
            ValueType::Sequence(element) => write!(f, "Vec<{element}>"),
            ValueType::Map { key, value } => write!(f, "HashMap<{key}, {value}>"),
            ValueType::UntypedMap => f.write_str("HashMap<String, Bson>"),
            ValueType::Record(name) => f.write_str(name),
            ValueType::Generic { name, arguments } => {
                write!(f, "{name}<")?;
                for (index, argument) in arguments.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{argument}")?;
                }
                f.write_str(">")
            }
        }
    }
}

/// How an enumeration is stored in a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnumRepresentation {
    /// The underlying discriminant as a 32-bit integer.
    #[default]
    Int32,
    /// The underlying discriminant as a 64-bit integer.
    Int64,
    /// The enumerant's name.
    String,
}

/// A single named value of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumVariant {
    pub name: String,
    pub value: i64,
}

/// Describes an enumeration: its name, enumerants and storage representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumType {
    pub name: String,
    pub variants: Vec<EnumVariant>,
    #[serde(default)]
    pub representation: EnumRepresentation,
}

impl EnumType {
    /// Creates an enumeration stored by its underlying 32-bit value.
    pub fn new<N: Into<String>>(
        name: impl Into<String>,
        variants: impl IntoIterator<Item = (N, i64)>,
    ) -> Self {
        EnumType {
            name: name.into(),
            variants: variants
                .into_iter()
                .map(|(name, value)| EnumVariant { name: name.into(), value })
                .collect(),
            representation: EnumRepresentation::default(),
        }
    }

    /// Sets the storage representation.
    pub fn with_representation(mut self, representation: EnumRepresentation) -> Self {
        self.representation = representation;
        self
    }

    /// Looks an enumerant up by name.
    pub fn by_name(&self, name: &str) -> Option<&EnumVariant> {
        self.variants.iter().find(|variant| variant.name == name)
    }

    /// Looks an enumerant up by its underlying value.
    pub fn by_value(&self, value: i64) -> Option<&EnumVariant> {
        self.variants.iter().find(|variant| variant.value == value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_nest() {
        let value_type = ValueType::sequence(ValueType::nullable(ValueType::Int32));
        assert_eq!(value_type.to_string(), "Vec<Option<i32>>");

        let generic = ValueType::generic("Pair", [ValueType::String, ValueType::record("Address")]);
        assert_eq!(generic.to_string(), "Pair<String, Address>");
        assert_eq!(
            ValueType::map(ValueType::String, ValueType::Int64).to_string(),
            "HashMap<String, i64>"
        );
    }

    #[test]
    fn arrays_are_iterable_but_not_generic() {
        let array = ValueType::array(ValueType::Int32);
        assert!(array.is_iterable());
        assert!(!array.is_generic());
        assert_eq!(array.element_type(), Some(&ValueType::Int32));

        let sequence = ValueType::sequence(ValueType::String);
        assert!(sequence.is_iterable());
        assert!(sequence.is_generic());
    }

    #[test]
    fn enum_lookup_by_name_and_value() {
        let status = EnumType::new("Status", [("Active", 1), ("Closed", 5)]);
        assert_eq!(status.by_name("Closed").map(|v| v.value), Some(5));
        assert_eq!(status.by_value(1).map(|v| v.name.as_str()), Some("Active"));
        assert!(status.by_value(2).is_none());
        assert_eq!(status.representation, EnumRepresentation::Int32);
    }

    #[test]
    fn descriptors_round_trip_through_json() {
        let value_type = ValueType::nullable(ValueType::Enum(
            EnumType::new("Level", [("Low", 0), ("High", 1)])
                .with_representation(EnumRepresentation::String),
        ));
        let json = serde_json::to_string(&value_type).unwrap();
        let parsed: ValueType = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, value_type);
    }
}
