//! Error types and result types for mapping operations.
//!
//! Every fallible operation in this crate returns [`MappingResult<T>`]. Failures are
//! fatal to the single operation that raised them and are never logged here; callers
//! decide how to surface them.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors raised while mapping entities to and from documents.
#[derive(Error, Debug)]
pub enum MappingError {
    /// No codec exists for the given type. Carries the type's display name.
    #[error("No known codec for type '{0}'")]
    CodecUnsupported(String),
    /// A required (non-nullable) field was absent after full path traversal.
    #[error("Document does not contain value for non-nullable field '{0}'")]
    FieldMissing(String),
    /// A document value does not match any enumerant of the enumeration.
    #[error("Value {value} is not a valid {enumeration}")]
    EnumValueInvalid {
        /// The enumeration's name.
        enumeration: String,
        /// The offending value, rendered for diagnostics.
        value: String,
    },
    /// A value did not have the shape the codec or target type expected.
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The expected kind.
        expected: String,
        /// The kind actually found.
        actual: String,
    },
    /// A numeric value cannot be represented by the target type.
    #[error("Value {value} is out of range for {target}")]
    ValueOutOfRange {
        /// The target type.
        target: String,
        /// The offending value, rendered for diagnostics.
        value: String,
    },
    /// The entity type declares no property with the given name.
    #[error("Entity type {entity} has no property {property}")]
    PropertyNotFound {
        /// The entity type's name.
        entity: String,
        /// The requested property name.
        property: String,
    },
    /// The property has an empty element name and is never persisted.
    #[error("Property {0} is not mapped to a document field")]
    PropertyNotMapped(String),
    /// An entity model failed validation.
    #[error("Invalid model: {0}")]
    InvalidModel(String),
    /// A document writer was driven out of order.
    #[error("Invalid writer state: {0}")]
    InvalidWriterState(String),
    /// Serialization/deserialization error from the underlying formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl MappingError {
    /// Builds a [`MappingError::TypeMismatch`] from anything displayable.
    pub fn type_mismatch(expected: impl ToString, actual: impl ToString) -> Self {
        MappingError::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Builds a [`MappingError::ValueOutOfRange`] from anything displayable.
    pub fn out_of_range(target: impl ToString, value: impl ToString) -> Self {
        MappingError::ValueOutOfRange {
            target: target.to_string(),
            value: value.to_string(),
        }
    }
}

/// A specialized `Result` type for mapping operations.
pub type MappingResult<T> = Result<T, MappingError>;

impl From<BsonError> for MappingError {
    fn from(err: BsonError) -> Self {
        MappingError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for MappingError {
    fn from(err: SerdeJsonError) -> Self {
        MappingError::Serialization(err.to_string())
    }
}
