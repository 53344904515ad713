//! Type-driven codec resolution.
//!
//! [`CodecResolver::resolve`] selects the codec for a [`ValueType`] in a fixed order:
//!
//! 1. Built-in scalar kinds, looked up in a registry of shared codec instances.
//! 2. `DateTime`, configured from the property's [`DateTimeKind`].
//! 3. Enumerations, with a codec built for that enumeration.
//! 4. The nullable wrapper, resolving the wrapped type and adapting it.
//! 5. Arrays and generic types, through the collection provider.
//! 6. Anything else fails with [`MappingError::CodecUnsupported`].
//!
//! Resolution is referentially transparent: the same `(type, property)` pair always
//! yields codecs with identical behavior.

use std::{
    collections::HashMap,
    sync::{Arc, LazyLock},
};
use tracing::trace;

use crate::{
    codec::*,
    error::{MappingError, MappingResult},
    model::{DateTimeKind, Property},
    types::ValueType,
};

static GLOBAL: LazyLock<CodecResolver> = LazyLock::new(CodecResolver::new);

/// Resolves the codec for a value type.
#[derive(Debug, Clone)]
pub struct CodecResolver {
    builtins: HashMap<ValueType, CodecRef>,
}

impl Default for CodecResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CodecResolver {
    /// Creates a resolver with the built-in scalar registry.
    pub fn new() -> Self {
        let entries: [(ValueType, CodecRef); 19] = [
            (ValueType::Boolean, Arc::new(BooleanCodec)),
            (ValueType::Int8, Arc::new(Int8Codec)),
            (ValueType::Int16, Arc::new(Int16Codec)),
            (ValueType::Int32, Arc::new(Int32Codec)),
            (ValueType::Int64, Arc::new(Int64Codec)),
            (ValueType::UInt8, Arc::new(UInt8Codec)),
            (ValueType::UInt16, Arc::new(UInt16Codec)),
            (ValueType::UInt32, Arc::new(UInt32Codec)),
            (ValueType::UInt64, Arc::new(UInt64Codec)),
            (ValueType::Single, Arc::new(SingleCodec)),
            (ValueType::Double, Arc::new(DoubleCodec)),
            (ValueType::Decimal, Arc::new(DecimalCodec)),
            (ValueType::Decimal128, Arc::new(Decimal128Codec)),
            (ValueType::Char, Arc::new(CharCodec)),
            (ValueType::String, Arc::new(StringCodec)),
            (ValueType::Uuid, Arc::new(UuidCodec)),
            (ValueType::ObjectId, Arc::new(ObjectIdCodec)),
            (ValueType::Duration, Arc::new(DurationCodec)),
            (ValueType::DateTimeOffset, Arc::new(DateTimeOffsetCodec)),
        ];

        CodecResolver {
            builtins: entries.into_iter().collect(),
        }
    }

    /// Returns the process-wide resolver.
    pub fn global() -> &'static CodecResolver {
        &GLOBAL
    }

    /// Resolves the codec for `value_type`.
    ///
    /// `property` is only consulted for `DateTime`, whose codec follows the property's
    /// date-time kind.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::CodecUnsupported`] carrying the type's display name when
    /// no rule matches, including for unsupported element types of a sequence.
    pub fn resolve(&self, value_type: &ValueType, property: Option<&Property>) -> MappingResult<CodecRef> {
        if let Some(codec) = self.builtins.get(value_type) {
            return Ok(Arc::clone(codec));
        }

        match value_type {
            ValueType::DateTime => Ok(Arc::new(Self::date_time_codec(property))),
            ValueType::Enum(enumeration) => {
                trace!(enumeration = %enumeration.name, "building enum codec");
                Ok(Arc::new(EnumCodec::new(enumeration.clone())))
            }
            ValueType::Nullable(inner) => {
                let inner = self.resolve(inner, property)?;
                Ok(Arc::new(NullableCodec::new(inner)))
            }
            other if other.is_generic() || matches!(other, ValueType::Array(_)) => {
                self.collection_codec(other, property)
            }
            other => Err(MappingError::CodecUnsupported(other.to_string())),
        }
    }

    fn date_time_codec(property: Option<&Property>) -> DateTimeCodec {
        match property.map(Property::date_time_kind).unwrap_or_default() {
            DateTimeKind::Unspecified => DateTimeCodec::unspecified(),
            DateTimeKind::Local | DateTimeKind::Utc => DateTimeCodec::local(),
        }
    }

    /// Builds a sequence codec by introspecting the element type.
    fn collection_codec(&self, value_type: &ValueType, property: Option<&Property>) -> MappingResult<CodecRef> {
        let element_type = value_type
            .element_type()
            .ok_or_else(|| MappingError::CodecUnsupported(value_type.to_string()))?;

        trace!(sequence = %value_type, "building collection codec");
        let element = self
            .resolve(element_type, property)
            .map_err(|_| MappingError::CodecUnsupported(value_type.to_string()))?;

        Ok(Arc::new(CollectionCodec::new(element_type.clone(), element)))
    }
}
