//! Convenient re-exports of commonly used types from docmap.
//!
//! ```ignore
//! use docmap::prelude::*;
//! ```
//!
//! This provides access to the entity model and its traits, the mapper, type
//! descriptors and values, and the error types. The `Entity` derive shares its name
//! with the `Entity` trait, so one import brings in both.

pub use docmap_core::{
    codec::{Codec, CodecRef},
    conventions::should_be_embedded,
    error::{MappingError, MappingResult},
    mapper::{EntityMapper, FieldPath, SerializationInfo, KEY_FIELD_NAME},
    model::{DateTimeKind, Entity, EntityEntry, EntityType, EntityTypeBuilder, Property, TrackedEntry},
    resolver::CodecResolver,
    types::{EnumRepresentation, EnumType, ValueType},
    value::{Mappable, Value},
    writer::{BsonDocumentWriter, DocumentWriter},
};

pub use docmap_macros::{Entity, Enumeration};
