//! Codec for enumerations.

use bson::Bson;

use super::{Codec, value_mismatch};
use crate::{
    error::{MappingError, MappingResult},
    types::{EnumRepresentation, EnumType},
    value::Value,
};

/// Maps each enumerant to its underlying value (or name) and back.
///
/// Decoding rejects any document value that does not match a known enumerant with
/// [`MappingError::EnumValueInvalid`].
#[derive(Debug, Clone)]
pub struct EnumCodec {
    enumeration: EnumType,
}

impl EnumCodec {
    pub fn new(enumeration: EnumType) -> Self {
        EnumCodec { enumeration }
    }

    fn invalid(&self, value: impl ToString) -> MappingError {
        MappingError::EnumValueInvalid {
            enumeration: self.enumeration.name.clone(),
            value: value.to_string(),
        }
    }
}

impl Codec for EnumCodec {
    fn encode(&self, value: &Value) -> MappingResult<Bson> {
        let name = match value {
            Value::Enum(name) => name,
            other => return Err(value_mismatch(&self.enumeration.name, other)),
        };
        let variant = self
            .enumeration
            .by_name(name)
            .ok_or_else(|| self.invalid(name))?;

        match self.enumeration.representation {
            EnumRepresentation::Int32 => i32::try_from(variant.value)
                .map(Bson::Int32)
                .map_err(|_| MappingError::out_of_range("Int32", variant.value)),
            EnumRepresentation::Int64 => Ok(Bson::Int64(variant.value)),
            EnumRepresentation::String => Ok(Bson::String(variant.name.clone())),
        }
    }

    fn decode(&self, bson: &Bson) -> MappingResult<Value> {
        let variant = match bson {
            Bson::Int32(v) => self.enumeration.by_value(i64::from(*v)),
            Bson::Int64(v) => self.enumeration.by_value(*v),
            Bson::String(s) => self.enumeration.by_name(s),
            _ => None,
        };

        variant
            .map(|variant| Value::Enum(variant.name.clone()))
            .ok_or_else(|| self.invalid(bson))
    }
}
