//! Adapter codec for the nullable wrapper.

use bson::Bson;

use super::{Codec, CodecRef};
use crate::{error::MappingResult, value::Value};

/// Passes document null through as [`Value::Null`] and delegates everything else.
#[derive(Debug, Clone)]
pub struct NullableCodec {
    inner: CodecRef,
}

impl NullableCodec {
    pub fn new(inner: CodecRef) -> Self {
        NullableCodec { inner }
    }
}

impl Codec for NullableCodec {
    fn encode(&self, value: &Value) -> MappingResult<Bson> {
        if value.is_null() {
            return Ok(Bson::Null);
        }
        self.inner.encode(value)
    }

    fn decode(&self, bson: &Bson) -> MappingResult<Value> {
        match bson {
            Bson::Null => Ok(Value::Null),
            other => self.inner.decode(other),
        }
    }
}
