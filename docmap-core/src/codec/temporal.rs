//! Codecs for durations, date-times and date-times with offset.

use bson::{Bson, DateTime as BsonDateTime};
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeDelta, TimeZone, Utc};

use super::{Codec, bson_mismatch, value_mismatch};
use crate::{
    error::{MappingError, MappingResult},
    model::DateTimeKind,
    value::Value,
};

const NANOS_PER_TICK: i64 = 100;
const TICKS_PER_SECOND: i64 = 10_000_000;
const TICKS_PER_MINUTE: i64 = 60 * TICKS_PER_SECOND;
const TICKS_PER_HOUR: i64 = 60 * TICKS_PER_MINUTE;
const TICKS_PER_DAY: i64 = 24 * TICKS_PER_HOUR;
/// Ticks between 0001-01-01T00:00:00 and the Unix epoch.
const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// `NaiveDateTime` stored as a BSON DateTime with millisecond precision.
///
/// With [`DateTimeKind::Unspecified`] the clock time is stored as-is. Any other kind
/// treats values as local time: they are converted to UTC when encoded and back to
/// local time when decoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeCodec {
    kind: DateTimeKind,
}

impl DateTimeCodec {
    /// Codec that performs no zone conversion.
    pub fn unspecified() -> Self {
        DateTimeCodec { kind: DateTimeKind::Unspecified }
    }

    /// Codec that interprets values in the process local time zone.
    pub fn local() -> Self {
        DateTimeCodec { kind: DateTimeKind::Local }
    }

    pub fn kind(&self) -> DateTimeKind {
        self.kind
    }
}

impl Codec for DateTimeCodec {
    fn encode(&self, value: &Value) -> MappingResult<Bson> {
        let naive = match value {
            Value::DateTime(naive) => naive,
            other => return Err(value_mismatch("NaiveDateTime", other)),
        };

        let utc = match self.kind {
            DateTimeKind::Unspecified => naive.and_utc(),
            DateTimeKind::Local | DateTimeKind::Utc => Local
                .from_local_datetime(naive)
                .earliest()
                .ok_or_else(|| MappingError::out_of_range("local time", naive))?
                .with_timezone(&Utc),
        };

        Ok(Bson::DateTime(BsonDateTime::from_chrono(utc)))
    }

    fn decode(&self, bson: &Bson) -> MappingResult<Value> {
        let utc = match bson {
            Bson::DateTime(date_time) => date_time.to_chrono(),
            other => return Err(bson_mismatch("NaiveDateTime", other)),
        };

        Ok(Value::DateTime(match self.kind {
            DateTimeKind::Unspecified => utc.naive_utc(),
            DateTimeKind::Local | DateTimeKind::Utc => utc.with_timezone(&Local).naive_local(),
        }))
    }
}

fn ticks_from_naive(naive: &NaiveDateTime) -> MappingResult<i64> {
    let utc = naive.and_utc();
    utc.timestamp()
        .checked_mul(TICKS_PER_SECOND)
        .and_then(|ticks| ticks.checked_add(i64::from(utc.timestamp_subsec_nanos()) / NANOS_PER_TICK))
        .and_then(|ticks| ticks.checked_add(UNIX_EPOCH_TICKS))
        .ok_or_else(|| MappingError::out_of_range("ticks", naive))
}

fn naive_from_ticks(ticks: i64) -> MappingResult<NaiveDateTime> {
    let relative = ticks
        .checked_sub(UNIX_EPOCH_TICKS)
        .ok_or_else(|| MappingError::out_of_range("NaiveDateTime", ticks))?;
    let seconds = relative.div_euclid(TICKS_PER_SECOND);
    let nanos = (relative.rem_euclid(TICKS_PER_SECOND) * NANOS_PER_TICK) as u32;

    DateTime::from_timestamp(seconds, nanos)
        .map(|utc| utc.naive_utc())
        .ok_or_else(|| MappingError::out_of_range("NaiveDateTime", ticks))
}

/// `DateTime<FixedOffset>` stored as `[ticks, offset minutes]`.
///
/// Ticks count 100 ns intervals of the local clock time since 0001-01-01T00:00:00.
/// Sub-tick precision is truncated.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeOffsetCodec;

impl Codec for DateTimeOffsetCodec {
    fn encode(&self, value: &Value) -> MappingResult<Bson> {
        match value {
            Value::DateTimeOffset(date_time) => {
                let seconds = date_time.offset().local_minus_utc();
                if seconds % 60 != 0 {
                    return Err(MappingError::out_of_range("offset minutes", date_time.offset()));
                }
                let ticks = ticks_from_naive(&date_time.naive_local())?;
                let minutes = seconds / 60;
                Ok(Bson::Array(vec![Bson::Int64(ticks), Bson::Int32(minutes)]))
            }
            other => Err(value_mismatch("DateTime<FixedOffset>", other)),
        }
    }

    fn decode(&self, bson: &Bson) -> MappingResult<Value> {
        let (ticks, minutes) = match bson {
            Bson::Array(items) if items.len() == 2 => (&items[0], &items[1]),
            other => return Err(bson_mismatch("[ticks, offset]", other)),
        };
        let ticks = match ticks {
            Bson::Int64(v) => *v,
            Bson::Int32(v) => i64::from(*v),
            other => return Err(bson_mismatch("Int64 ticks", other)),
        };
        let minutes = match minutes {
            Bson::Int32(v) => *v,
            other => return Err(bson_mismatch("Int32 offset minutes", other)),
        };

        let offset = minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| MappingError::out_of_range("offset minutes", minutes))?;
        let local = naive_from_ticks(ticks)?;

        offset
            .from_local_datetime(&local)
            .single()
            .map(Value::DateTimeOffset)
            .ok_or_else(|| MappingError::out_of_range("DateTime<FixedOffset>", ticks))
    }
}

/// `TimeDelta` stored in the constant time-span format `[-][d.]hh:mm:ss[.fffffff]`.
///
/// Sub-tick (100 ns) precision is truncated.
#[derive(Debug, Clone, Copy, Default)]
pub struct DurationCodec;

impl DurationCodec {
    fn format(delta: &TimeDelta) -> MappingResult<String> {
        let ticks = delta
            .num_seconds()
            .checked_mul(TICKS_PER_SECOND)
            .and_then(|ticks| ticks.checked_add(i64::from(delta.subsec_nanos()) / NANOS_PER_TICK))
            .ok_or_else(|| MappingError::out_of_range("time span", delta))?;

        let sign = if ticks < 0 { "-" } else { "" };
        let ticks = ticks.unsigned_abs();
        let days = ticks / TICKS_PER_DAY as u64;
        let hours = ticks % TICKS_PER_DAY as u64 / TICKS_PER_HOUR as u64;
        let minutes = ticks % TICKS_PER_HOUR as u64 / TICKS_PER_MINUTE as u64;
        let seconds = ticks % TICKS_PER_MINUTE as u64 / TICKS_PER_SECOND as u64;
        let fraction = ticks % TICKS_PER_SECOND as u64;

        let mut text = String::from(sign);
        if days > 0 {
            text.push_str(&format!("{days}."));
        }
        text.push_str(&format!("{hours:02}:{minutes:02}:{seconds:02}"));
        if fraction > 0 {
            text.push_str(&format!(".{fraction:07}"));
        }
        Ok(text)
    }

    fn parse(text: &str) -> MappingResult<TimeDelta> {
        let invalid = || MappingError::Serialization(format!("invalid time span '{text}'"));

        let (negative, body) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };

        let mut parts = body.split(':');
        let (Some(head), Some(minutes), Some(tail), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let (days, hours) = match head.split_once('.') {
            Some((days, hours)) => (days, hours),
            None => ("0", head),
        };
        let (seconds, fraction) = match tail.split_once('.') {
            Some((seconds, fraction)) => (seconds, fraction),
            None => (tail, ""),
        };

        let number = |digits: &str| -> MappingResult<i64> {
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            digits.parse::<i64>().map_err(|_| invalid())
        };

        let days = number(days)?;
        let hours = number(hours)?;
        let minutes = number(minutes)?;
        let seconds = number(seconds)?;
        if hours > 23 || minutes > 59 || seconds > 59 || fraction.len() > 7 {
            return Err(invalid());
        }
        let fraction = if fraction.is_empty() {
            0
        } else {
            number(&format!("{fraction:0<7}"))?
        };

        let whole_seconds = days
            .checked_mul(86_400)
            .and_then(|s| s.checked_add(hours * 3_600 + minutes * 60 + seconds))
            .ok_or_else(invalid)?;
        let delta = TimeDelta::new(whole_seconds, (fraction * NANOS_PER_TICK) as u32).ok_or_else(invalid)?;

        Ok(if negative { -delta } else { delta })
    }
}

impl Codec for DurationCodec {
    fn encode(&self, value: &Value) -> MappingResult<Bson> {
        match value {
            Value::Duration(delta) => Self::format(delta).map(Bson::String),
            other => Err(value_mismatch("TimeDelta", other)),
        }
    }

    fn decode(&self, bson: &Bson) -> MappingResult<Value> {
        match bson {
            Bson::String(text) => Self::parse(text).map(Value::Duration),
            other => Err(bson_mismatch("TimeDelta", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(year: i32, month: u32, day: u32, h: u32, m: u32, s: u32, milli: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_milli_opt(h, m, s, milli)
            .unwrap()
    }

    #[test]
    fn unspecified_date_time_keeps_clock_time() {
        let naive = at(2024, 2, 29, 23, 59, 58, 125);
        let encoded = DateTimeCodec::unspecified().encode(&Value::DateTime(naive)).unwrap();
        assert_eq!(
            encoded,
            Bson::DateTime(BsonDateTime::from_millis(naive.and_utc().timestamp_millis()))
        );
        assert_eq!(DateTimeCodec::unspecified().decode(&encoded).unwrap(), Value::DateTime(naive));
    }

    #[test]
    fn local_date_time_round_trips() {
        let naive = at(2024, 6, 15, 12, 30, 0, 500);
        let codec = DateTimeCodec::local();
        let encoded = codec.encode(&Value::DateTime(naive)).unwrap();
        assert_eq!(codec.decode(&encoded).unwrap(), Value::DateTime(naive));

        let expected = Local.from_local_datetime(&naive).earliest().unwrap().with_timezone(&Utc);
        assert_eq!(encoded, Bson::DateTime(BsonDateTime::from_chrono(expected)));
    }

    #[test]
    fn offset_uses_ticks_and_minutes() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let value = offset.from_local_datetime(&at(1970, 1, 1, 0, 0, 0, 0)).unwrap();

        let encoded = DateTimeOffsetCodec.encode(&Value::DateTimeOffset(value)).unwrap();
        assert_eq!(
            encoded,
            Bson::Array(vec![Bson::Int64(UNIX_EPOCH_TICKS), Bson::Int32(120)])
        );
        assert_eq!(DateTimeOffsetCodec.decode(&encoded).unwrap(), Value::DateTimeOffset(value));
    }

    #[test]
    fn offset_round_trips_sub_second_and_negative_offsets() {
        let offset = FixedOffset::west_opt(5 * 3600 + 30 * 60).unwrap();
        let local = NaiveDate::from_ymd_opt(1, 1, 1)
            .unwrap()
            .and_hms_micro_opt(0, 0, 0, 123_456)
            .unwrap();
        let value = offset.from_local_datetime(&local).unwrap();

        let encoded = DateTimeOffsetCodec.encode(&Value::DateTimeOffset(value)).unwrap();
        assert_eq!(
            encoded,
            Bson::Array(vec![Bson::Int64(1_234_560), Bson::Int32(-330)])
        );
        assert_eq!(DateTimeOffsetCodec.decode(&encoded).unwrap(), Value::DateTimeOffset(value));
    }

    #[test]
    fn offset_with_seconds_is_rejected() {
        let offset = FixedOffset::east_opt(30).unwrap();
        let value = offset.from_local_datetime(&at(2024, 1, 1, 0, 0, 30, 0)).unwrap();

        let err = DateTimeOffsetCodec.encode(&Value::DateTimeOffset(value)).unwrap_err();
        assert!(matches!(err, MappingError::ValueOutOfRange { ref target, .. } if target == "offset minutes"));
    }

    #[test]
    fn duration_format() {
        let cases = [
            (TimeDelta::zero(), "00:00:00"),
            (TimeDelta::seconds(3_723), "01:02:03"),
            (TimeDelta::days(2) + TimeDelta::hours(5), "2.05:00:00"),
            (TimeDelta::milliseconds(-1_500), "-00:00:01.5000000"),
            (TimeDelta::nanoseconds(100), "00:00:00.0000001"),
        ];

        for (delta, text) in cases {
            let encoded = DurationCodec.encode(&Value::Duration(delta)).unwrap();
            assert_eq!(encoded, Bson::String(text.to_string()));
            assert_eq!(DurationCodec.decode(&encoded).unwrap(), Value::Duration(delta));
        }
    }

    #[test]
    fn duration_parse_accepts_short_fractions() {
        assert_eq!(
            DurationCodec.decode(&Bson::String("00:00:00.25".to_string())).unwrap(),
            Value::Duration(TimeDelta::milliseconds(250))
        );
    }

    #[test]
    fn duration_parse_rejects_garbage() {
        for text in ["", "1:2", "00:60:00", "24:00:00", "aa:bb:cc", "00:00:00.12345678"] {
            assert!(DurationCodec.decode(&Bson::String(text.to_string())).is_err(), "{text}");
        }
    }
}
