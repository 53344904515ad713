//! Codec for homogeneous sequences.

use bson::Bson;

use super::{Codec, CodecRef, bson_mismatch, value_mismatch};
use crate::{error::MappingResult, types::ValueType, value::Value};

/// Reads and writes a document array, delegating each element to the element codec.
///
/// A [`Value::Null`] sequence is written as document null and read back the same way.
#[derive(Debug, Clone)]
pub struct CollectionCodec {
    element_type: ValueType,
    element: CodecRef,
}

impl CollectionCodec {
    pub fn new(element_type: ValueType, element: CodecRef) -> Self {
        CollectionCodec { element_type, element }
    }
}

impl Codec for CollectionCodec {
    fn encode(&self, value: &Value) -> MappingResult<Bson> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| self.element.encode(item))
                .collect::<MappingResult<Vec<_>>>()
                .map(Bson::Array),
            Value::Null => Ok(Bson::Null),
            other => Err(value_mismatch(format!("sequence of {}", self.element_type), other)),
        }
    }

    fn decode(&self, bson: &Bson) -> MappingResult<Value> {
        match bson {
            Bson::Array(items) => items
                .iter()
                .map(|item| self.element.decode(item))
                .collect::<MappingResult<Vec<_>>>()
                .map(Value::Array),
            Bson::Null => Ok(Value::Null),
            other => Err(bson_mismatch(format!("array of {}", self.element_type), other)),
        }
    }
}
