use std::fmt;
use std::io::Cursor;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::{Repr, SqlArray, StubDbError};

/// A single SQL value held in a row or bound to a parameter.
///
/// `Value::Null` is the SQL-NULL marker.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    Char(char),
    Text(String),
    Bytes(Vec<u8>),
    Blob(Blob),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Array(SqlArray),
}

/// Coarse family of a [`Value`], used to pick a coercion rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Boolean,
    Text,
    Numeric,
    Temporal,
    Binary,
    Array,
}

impl Value {
    pub fn null() -> Self {
        Self::Null
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(value.into())
    }

    pub fn blob(value: impl Into<Vec<u8>>) -> Self {
        Self::Blob(Blob::new(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Boolean,
            Self::Char(_) | Self::Text(_) => ValueKind::Text,
            Self::Byte(_)
            | Self::Short(_)
            | Self::Int(_)
            | Self::Long(_)
            | Self::Float(_)
            | Self::Double(_)
            | Self::Decimal(_) => ValueKind::Numeric,
            Self::Date(_) | Self::Time(_) | Self::Timestamp(_) => ValueKind::Temporal,
            Self::Bytes(_) | Self::Blob(_) => ValueKind::Binary,
            Self::Array(_) => ValueKind::Array,
        }
    }

    /// Representation type of the stored value.
    pub fn repr(&self) -> Repr {
        match self {
            Self::Null => Repr::Null,
            Self::Bool(_) => Repr::Bool,
            Self::Byte(_) => Repr::Byte,
            Self::Short(_) => Repr::Short,
            Self::Int(_) => Repr::Int,
            Self::Long(_) => Repr::Long,
            Self::Float(_) => Repr::Float,
            Self::Double(_) => Repr::Double,
            Self::Decimal(_) => Repr::Decimal,
            Self::Char(_) => Repr::Char,
            Self::Text(_) => Repr::Text,
            Self::Bytes(_) => Repr::Bytes,
            Self::Blob(_) => Repr::Blob,
            Self::Date(_) => Repr::Date,
            Self::Time(_) => Repr::Time,
            Self::Timestamp(_) => Repr::Timestamp,
            Self::Array(_) => Repr::Array,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Byte(value) => write!(f, "{value}"),
            Self::Short(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Long(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Double(value) => write!(f, "{value}"),
            Self::Decimal(value) => write!(f, "{value}"),
            Self::Char(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
            Self::Bytes(value) => write_hex(f, value),
            Self::Blob(value) => write_hex(f, value.bytes()),
            Self::Date(value) => write!(f, "{value}"),
            Self::Time(value) => write!(f, "{value}"),
            Self::Timestamp(value) => write!(f, "{value}"),
            Self::Array(value) => write!(f, "{value}"),
        }
    }
}

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    f.write_str("0x")?;
    for byte in bytes {
        write!(f, "{byte:02x}")?;
    }
    Ok(())
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

value_from! {
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

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Immutable binary large object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Blob {
    data: Vec<u8>,
}

impl Blob {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn binary_stream(&self) -> Cursor<Vec<u8>> {
        Cursor::new(self.data.clone())
    }

    /// Returns up to `len` bytes starting at the 1-based position `pos`.
    pub fn sub_bytes(&self, pos: usize, len: usize) -> Result<&[u8], StubDbError> {
        if pos == 0 || pos > self.data.len() + 1 {
            return Err(StubDbError::OutOfBounds { position: pos });
        }
        let start = pos - 1;
        let end = start.saturating_add(len).min(self.data.len());
        Ok(&self.data[start..end])
    }
}

impl From<Vec<u8>> for Blob {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}
