//! Property-based round-trip tests: every value written under a field reads back equal.

#![allow(clippy::float_cmp)]

use bson::{Decimal128, oid::ObjectId};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta};
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::{
    mapper::EntityMapper,
    value::Mappable,
    writer::{BsonDocumentWriter, DocumentWriter},
};

/// Writes `value` under `field` the way the mapper writes a property, then reads it back.
fn round_trip<T: Mappable>(value: &T) -> T {
    let mapper = EntityMapper::new();
    let info = mapper.element_serialization_info::<T>("field").unwrap();

    let mut writer = BsonDocumentWriter::new();
    writer.write_name(info.path.leaf()).unwrap();
    writer.write_value(info.codec.encode(&value.to_value()).unwrap()).unwrap();
    let document = writer.into_document().unwrap();

    mapper.read_element::<T>(&document, "field").unwrap()
}

/// Millisecond-precision date-times within the BSON and chrono ranges.
fn arb_naive_date_time() -> impl Strategy<Value = NaiveDateTime> {
    (-62_135_596_800_000i64..253_402_300_799_000i64)
        .prop_map(|millis| DateTime::from_timestamp_millis(millis).unwrap().naive_utc())
}

proptest! {
    #[test]
    fn integers_round_trip(a in any::<i8>(), b in any::<i16>(), c in any::<i32>(), d in any::<i64>()) {
        prop_assert_eq!(round_trip(&a), a);
        prop_assert_eq!(round_trip(&b), b);
        prop_assert_eq!(round_trip(&c), c);
        prop_assert_eq!(round_trip(&d), d);
    }

    #[test]
    fn unsigned_integers_round_trip(a in any::<u8>(), b in any::<u16>(), c in any::<u32>(), d in 0..=i64::MAX as u64) {
        prop_assert_eq!(round_trip(&a), a);
        prop_assert_eq!(round_trip(&b), b);
        prop_assert_eq!(round_trip(&c), c);
        prop_assert_eq!(round_trip(&d), d);
    }

    #[test]
    fn floats_round_trip(a in any::<f32>(), b in any::<f64>()) {
        let a2 = round_trip(&a);
        let b2 = round_trip(&b);
        prop_assert!(a2 == a || (a.is_nan() && a2.is_nan()));
        prop_assert!(b2 == b || (b.is_nan() && b2.is_nan()));
    }

    #[test]
    fn text_round_trips(s in ".*", c in any::<char>(), tags in prop::collection::vec(".{0,8}", 0..6)) {
        prop_assert_eq!(round_trip(&s), s);
        prop_assert_eq!(round_trip(&c), c);
        prop_assert_eq!(round_trip(&tags), tags);
    }

    #[test]
    fn decimals_round_trip(mantissa in any::<i64>(), scale in 0u32..=18) {
        let value = Decimal::new(mantissa, scale);
        prop_assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn identifiers_round_trip(bytes in any::<[u8; 12]>(), uuid_bytes in any::<[u8; 16]>(), dec in any::<[u8; 16]>()) {
        let oid = ObjectId::from_bytes(bytes);
        prop_assert_eq!(round_trip(&oid), oid);

        let uuid = bson::Uuid::from_bytes(uuid_bytes);
        prop_assert_eq!(round_trip(&uuid), uuid);

        let decimal = Decimal128::from_bytes(dec);
        prop_assert_eq!(round_trip(&decimal), decimal);
    }

    #[test]
    fn durations_round_trip(ticks in -1_000_000_000_000_000i64..1_000_000_000_000_000i64) {
        let delta = TimeDelta::nanoseconds(ticks * 100);
        prop_assert_eq!(round_trip(&delta), delta);
    }

    #[test]
    fn date_times_round_trip(naive in arb_naive_date_time(), offset_minutes in -839i32..=839) {
        prop_assert_eq!(round_trip(&naive), naive);

        let offset = FixedOffset::east_opt(offset_minutes * 60).unwrap();
        if let Some(value) = naive.and_local_timezone(offset).single() {
            prop_assert_eq!(round_trip(&value), value);
        }
    }

    #[test]
    fn nullable_values_round_trip(value in prop::option::of(any::<i32>())) {
        prop_assert_eq!(round_trip(&value), value);
    }
}

#[test]
fn boundaries_round_trip() {
    assert_eq!(round_trip(&i64::MIN), i64::MIN);
    assert_eq!(round_trip(&i64::MAX), i64::MAX);
    assert_eq!(round_trip(&u32::MAX), u32::MAX);
    assert_eq!(round_trip(&f64::INFINITY), f64::INFINITY);
    assert!(round_trip(&f32::NAN).is_nan());
    assert_eq!(round_trip(&String::new()), "");
    assert_eq!(round_trip(&Vec::<i32>::new()), Vec::<i32>::new());
    assert_eq!(round_trip(&[true, false]), [true, false]);
    assert_eq!(round_trip(&Decimal::MAX), Decimal::MAX);
    assert_eq!(round_trip(&Decimal::MIN), Decimal::MIN);
    assert_eq!(round_trip(&TimeDelta::zero()), TimeDelta::zero());
}
