//! Value coercion used by typed row reads.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::{Blob, Repr, SqlArray, StubDbError, Value};

/// Converts `value` into the `target` representation.
///
/// Rules are tried in order: exact match (an `Object` target accepts
/// anything), temporal reconstruction, numeric reparse of the canonical
/// decimal text, array wrapping, binary shape derivation. SQL NULL coerces to
/// NULL for every target.
pub fn coerce(value: &Value, target: Repr) -> Result<Value, StubDbError> {
    if value.is_null() || target == Repr::Object || value.repr() == target {
        return Ok(value.clone());
    }

    if target.is_temporal() && value.repr().is_temporal() {
        return Ok(temporal(value, target));
    }

    if target.is_numeric() && value.repr().is_numeric() {
        return numeric(&value.to_string(), target);
    }

    match (value, target) {
        (Value::Bytes(bytes), Repr::Array) => {
            let elements = bytes.iter().map(|byte| Value::Byte(*byte as i8)).collect();
            return SqlArray::new(Repr::Byte, elements).map(Value::Array);
        }
        (Value::Blob(blob), Repr::Bytes | Repr::BinaryStream) => {
            return Ok(Value::Bytes(blob.bytes().to_vec()));
        }
        (Value::Bytes(bytes), Repr::BinaryStream) => return Ok(Value::Bytes(bytes.clone())),
        (Value::Bytes(bytes), Repr::Blob) => return Ok(Value::Blob(Blob::new(bytes.clone()))),
        _ => {}
    }

    Err(StubDbError::IncompatibleType {
        requested: target.name(),
        found: value.repr().name(),
    })
}

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

fn temporal(value: &Value, target: Repr) -> Value {
    let instant = match value {
        Value::Date(date) => date.and_time(NaiveTime::default()),
        Value::Time(time) => epoch().and_time(*time),
        Value::Timestamp(timestamp) => *timestamp,
        other => return other.clone(),
    };
    match target {
        Repr::Date => Value::Date(instant.date()),
        Repr::Time => Value::Time(instant.time()),
        _ => Value::Timestamp(instant),
    }
}

fn numeric(text: &str, target: Repr) -> Result<Value, StubDbError> {
    let parsed = match target {
        Repr::Byte => text.parse().ok().map(Value::Byte),
        Repr::Short => text.parse().ok().map(Value::Short),
        Repr::Int => text.parse().ok().map(Value::Int),
        Repr::Long => text.parse().ok().map(Value::Long),
        Repr::Float => text.parse().ok().map(Value::Float),
        Repr::Double => text.parse().ok().map(Value::Double),
        Repr::Decimal => Decimal::from_str(text).ok().map(Value::Decimal),
        _ => None,
    };
    parsed.ok_or_else(|| StubDbError::Conversion {
        value: text.to_owned(),
        target: target.name(),
    })
}

/// Host type readable from a [`Value`] after coercion to [`Self::REPR`].
pub trait FromValue: Sized {
    const REPR: Repr;

    /// Extracts `Self` from a value already coerced to [`Self::REPR`].
    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromValue for $ty {
                const REPR: Repr = Repr::$variant;

                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )*
    };
}

from_value! {
    bool => Bool,
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    Decimal => Decimal,
    char => Char,
    String => Text,
    Vec<u8> => Bytes,
    Blob => Blob,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    SqlArray => Array,
}

impl FromValue for Value {
    const REPR: Repr = Repr::Object;

    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}
