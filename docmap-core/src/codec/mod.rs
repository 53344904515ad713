//! Value codecs: stateless converters between [`Value`]s and BSON values.
//!
//! Every supported [`ValueType`](crate::types::ValueType) has exactly one canonical codec.
//! Scalar codecs are unit structs shared across the process; enumeration, nullable and
//! collection codecs are composed per type by the [`resolver`](crate::resolver).
//!
//! # Document representations
//!
//! | Value | BSON |
//! |---|---|
//! | `bool` | Boolean |
//! | `i8`, `u8`, `i16`, `u16`, `i32`, `char` | Int32 |
//! | `u32`, `i64`, `u64` | Int64 |
//! | `f32`, `f64` | Double |
//! | `Decimal` | String |
//! | `Decimal128` | Decimal128 |
//! | `String` | String |
//! | `Uuid` | Binary (subtype 4) |
//! | `ObjectId` | ObjectId |
//! | `TimeDelta` | String, `[-][d.]hh:mm:ss[.fffffff]` |
//! | `NaiveDateTime` | DateTime |
//! | `DateTime<FixedOffset>` | Array `[ticks, offset minutes]` |

use bson::Bson;
use std::{fmt::Debug, sync::Arc};

use crate::{
    error::{MappingError, MappingResult},
    value::Value,
};

pub mod collection;
pub mod enumeration;
pub mod nullable;
pub mod scalar;
pub mod temporal;

pub use collection::CollectionCodec;
pub use enumeration::EnumCodec;
pub use nullable::NullableCodec;
pub use scalar::*;
pub use temporal::{DateTimeCodec, DateTimeOffsetCodec, DurationCodec};

/// Converts between one value type and the BSON value model.
///
/// Codecs hold no mutable state, so a single instance can be shared by any number of
/// threads. Encoding and decoding the same input always yields the same output.
pub trait Codec: Debug + Send + Sync {
    /// Encodes a value into its BSON representation.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::TypeMismatch`] if `value` is not of the codec's type, or
    /// [`MappingError::ValueOutOfRange`] if it cannot be represented in BSON.
    fn encode(&self, value: &Value) -> MappingResult<Bson>;

    /// Decodes a BSON value.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::TypeMismatch`] if the BSON value has an unexpected kind,
    /// or a codec-specific error when its content is invalid.
    fn decode(&self, bson: &Bson) -> MappingResult<Value>;
}

/// A shared, type-erased codec.
pub type CodecRef = Arc<dyn Codec>;

pub(crate) fn value_mismatch(expected: impl ToString, found: &Value) -> MappingError {
    MappingError::type_mismatch(expected, found.kind())
}

pub(crate) fn bson_mismatch(expected: impl ToString, found: &Bson) -> MappingError {
    MappingError::type_mismatch(expected, format!("{:?}", found.element_type()))
}
