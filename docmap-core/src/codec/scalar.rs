//! Built-in scalar codecs.

use bson::{Binary, Bson};
use rust_decimal::Decimal;
use std::str::FromStr;

use super::{Codec, bson_mismatch, value_mismatch};
use crate::{
    error::{MappingError, MappingResult},
    value::Value,
};

/// Reads an integral BSON value, accepting both integer widths.
fn read_integer(bson: &Bson, target: &str) -> MappingResult<i64> {
    match bson {
        Bson::Int32(v) => Ok(i64::from(*v)),
        Bson::Int64(v) => Ok(*v),
        other => Err(bson_mismatch(target, other)),
    }
}

macro_rules! integer_codec {
    ($(#[$meta:meta])* $codec:ident, $ty:ty, $variant:ident, $repr:ident, $repr_ty:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $codec;

        impl Codec for $codec {
            fn encode(&self, value: &Value) -> MappingResult<Bson> {
                match value {
                    Value::$variant(v) => <$repr_ty>::try_from(*v)
                        .map(Bson::$repr)
                        .map_err(|_| MappingError::out_of_range(stringify!($repr), v)),
                    other => Err(value_mismatch(stringify!($ty), other)),
                }
            }

            fn decode(&self, bson: &Bson) -> MappingResult<Value> {
                let raw = read_integer(bson, stringify!($ty))?;
                <$ty>::try_from(raw)
                    .map(Value::$variant)
                    .map_err(|_| MappingError::out_of_range(stringify!($ty), raw))
            }
        }
    };
}

integer_codec!(
    /// `i8` stored as Int32.
    Int8Codec, i8, Int8, Int32, i32
);
integer_codec!(
    /// `i16` stored as Int32.
    Int16Codec, i16, Int16, Int32, i32
);
integer_codec!(
    /// `i32` stored as Int32.
    Int32Codec, i32, Int32, Int32, i32
);
integer_codec!(
    /// `i64` stored as Int64.
    Int64Codec, i64, Int64, Int64, i64
);
integer_codec!(
    /// `u8` stored as Int32.
    UInt8Codec, u8, UInt8, Int32, i32
);
integer_codec!(
    /// `u16` stored as Int32.
    UInt16Codec, u16, UInt16, Int32, i32
);
integer_codec!(
    /// `u32` stored as Int64.
    UInt32Codec, u32, UInt32, Int64, i64
);
integer_codec!(
    /// `u64` stored as Int64. Values above `i64::MAX` cannot be stored.
    UInt64Codec, u64, UInt64, Int64, i64
);

#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanCodec;

impl Codec for BooleanCodec {
    fn encode(&self, value: &Value) -> MappingResult<Bson> {
        match value {
            Value::Boolean(v) => Ok(Bson::Boolean(*v)),
            other => Err(value_mismatch("bool", other)),
        }
    }

    fn decode(&self, bson: &Bson) -> MappingResult<Value> {
        match bson {
            Bson::Boolean(v) => Ok(Value::Boolean(*v)),
            other => Err(bson_mismatch("bool", other)),
        }
    }
}

/// Reads a floating-point BSON value, widening integers.
fn read_double(bson: &Bson, target: &str) -> MappingResult<f64> {
    match bson {
        Bson::Double(v) => Ok(*v),
        Bson::Int32(v) => Ok(f64::from(*v)),
        Bson::Int64(v) => Ok(*v as f64),
        other => Err(bson_mismatch(target, other)),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleCodec;

impl Codec for DoubleCodec {
    fn encode(&self, value: &Value) -> MappingResult<Bson> {
        match value {
            Value::Double(v) => Ok(Bson::Double(*v)),
            other => Err(value_mismatch("f64", other)),
        }
    }

    fn decode(&self, bson: &Bson) -> MappingResult<Value> {
        read_double(bson, "f64").map(Value::Double)
    }
}

/// `f32` stored as a Double.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleCodec;

impl Codec for SingleCodec {
    fn encode(&self, value: &Value) -> MappingResult<Bson> {
        match value {
            Value::Single(v) => Ok(Bson::Double(f64::from(*v))),
            other => Err(value_mismatch("f32", other)),
        }
    }

    fn decode(&self, bson: &Bson) -> MappingResult<Value> {
        let raw = read_double(bson, "f32")?;
        // NaN and the infinities narrow losslessly.
        if raw.is_finite() && raw.abs() > f64::from(f32::MAX) {
            return Err(MappingError::out_of_range("f32", raw));
        }
        Ok(Value::Single(raw as f32))
    }
}

/// `Decimal` stored as its canonical string form.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalCodec;

impl Codec for DecimalCodec {
    fn encode(&self, value: &Value) -> MappingResult<Bson> {
        match value {
            Value::Decimal(v) => Ok(Bson::String(v.to_string())),
            other => Err(value_mismatch("Decimal", other)),
        }
    }

    fn decode(&self, bson: &Bson) -> MappingResult<Value> {
        match bson {
            Bson::String(s) => Decimal::from_str(s)
                .map(Value::Decimal)
                .map_err(|err| MappingError::Serialization(format!("invalid decimal '{s}': {err}"))),
            Bson::Int32(v) => Ok(Value::Decimal(Decimal::from(*v))),
            Bson::Int64(v) => Ok(Value::Decimal(Decimal::from(*v))),
            other => Err(bson_mismatch("Decimal", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Decimal128Codec;

impl Codec for Decimal128Codec {
    fn encode(&self, value: &Value) -> MappingResult<Bson> {
        match value {
            Value::Decimal128(v) => Ok(Bson::Decimal128(*v)),
            other => Err(value_mismatch("Decimal128", other)),
        }
    }

    fn decode(&self, bson: &Bson) -> MappingResult<Value> {
        match bson {
            Bson::Decimal128(v) => Ok(Value::Decimal128(*v)),
            other => Err(bson_mismatch("Decimal128", other)),
        }
    }
}

/// `char` stored as its Unicode scalar value.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharCodec;

impl Codec for CharCodec {
    fn encode(&self, value: &Value) -> MappingResult<Bson> {
        match value {
            // Scalar values top out at 0x10FFFF.
            Value::Char(c) => Ok(Bson::Int32(u32::from(*c) as i32)),
            other => Err(value_mismatch("char", other)),
        }
    }

    fn decode(&self, bson: &Bson) -> MappingResult<Value> {
        match bson {
            Bson::Int32(v) => u32::try_from(*v)
                .ok()
                .and_then(char::from_u32)
                .map(Value::Char)
                .ok_or_else(|| MappingError::out_of_range("char", v)),
            Bson::String(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::Char(c)),
                    _ => Err(MappingError::type_mismatch("single character", format!("{s:?}"))),
                }
            }
            other => Err(bson_mismatch("char", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl Codec for StringCodec {
    fn encode(&self, value: &Value) -> MappingResult<Bson> {
        match value {
            Value::String(v) => Ok(Bson::String(v.clone())),
            other => Err(value_mismatch("String", other)),
        }
    }

    fn decode(&self, bson: &Bson) -> MappingResult<Value> {
        match bson {
            Bson::String(v) => Ok(Value::String(v.clone())),
            other => Err(bson_mismatch("String", other)),
        }
    }
}

/// `Uuid` stored as standard binary (subtype 4).
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidCodec;

impl Codec for UuidCodec {
    fn encode(&self, value: &Value) -> MappingResult<Bson> {
        match value {
            Value::Uuid(v) => Ok(Bson::Binary(Binary::from_uuid(*v))),
            other => Err(value_mismatch("Uuid", other)),
        }
    }

    fn decode(&self, bson: &Bson) -> MappingResult<Value> {
        match bson {
            Bson::Binary(binary) => Ok(Value::Uuid(binary.to_uuid()?)),
            other => Err(bson_mismatch("Uuid", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectIdCodec;

impl Codec for ObjectIdCodec {
    fn encode(&self, value: &Value) -> MappingResult<Bson> {
        match value {
            Value::ObjectId(v) => Ok(Bson::ObjectId(*v)),
            other => Err(value_mismatch("ObjectId", other)),
        }
    }

    fn decode(&self, bson: &Bson) -> MappingResult<Value> {
        match bson {
            Bson::ObjectId(v) => Ok(Value::ObjectId(*v)),
            other => Err(bson_mismatch("ObjectId", other)),
        }
    }
}
