use std::fmt;

/// Canonical SQL type tag.
///
/// The set is closed: every tag has an entry in the
/// [`TypeRegistry`](crate::TypeRegistry).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SqlType {
    Array,
    BigInt,
    Binary,
    Bit,
    Blob,
    Boolean,
    Char,
    Clob,
    DataLink,
    Date,
    Decimal,
    Distinct,
    Double,
    Float,
    Integer,
    JavaObject,
    LongNVarChar,
    LongVarBinary,
    LongVarChar,
    NChar,
    NClob,
    Null,
    Numeric,
    NVarChar,
    Other,
    Real,
    Ref,
    RefCursor,
    RowId,
    SmallInt,
    Struct,
    SqlXml,
    TinyInt,
    Time,
    TimeWithTimezone,
    Timestamp,
    TimestampWithTimezone,
    VarChar,
    VarBinary,
}

impl SqlType {
    pub const ALL: [SqlType; 39] = [
        SqlType::Array,
        SqlType::BigInt,
        SqlType::Binary,
        SqlType::Bit,
        SqlType::Blob,
        SqlType::Boolean,
        SqlType::Char,
        SqlType::Clob,
        SqlType::DataLink,
        SqlType::Date,
        SqlType::Decimal,
        SqlType::Distinct,
        SqlType::Double,
        SqlType::Float,
        SqlType::Integer,
        SqlType::JavaObject,
        SqlType::LongNVarChar,
        SqlType::LongVarBinary,
        SqlType::LongVarChar,
        SqlType::NChar,
        SqlType::NClob,
        SqlType::Null,
        SqlType::Numeric,
        SqlType::NVarChar,
        SqlType::Other,
        SqlType::Real,
        SqlType::Ref,
        SqlType::RefCursor,
        SqlType::RowId,
        SqlType::SmallInt,
        SqlType::Struct,
        SqlType::SqlXml,
        SqlType::TinyInt,
        SqlType::Time,
        SqlType::TimeWithTimezone,
        SqlType::Timestamp,
        SqlType::TimestampWithTimezone,
        SqlType::VarChar,
        SqlType::VarBinary,
    ];

    /// Upper-case SQL name, e.g. `"VARCHAR"`.
    pub fn name(self) -> &'static str {
        match self {
            SqlType::Array => "ARRAY",
            SqlType::BigInt => "BIGINT",
            SqlType::Binary => "BINARY",
            SqlType::Bit => "BIT",
            SqlType::Blob => "BLOB",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Char => "CHAR",
            SqlType::Clob => "CLOB",
            SqlType::DataLink => "DATALINK",
            SqlType::Date => "DATE",
            SqlType::Decimal => "DECIMAL",
            SqlType::Distinct => "DISTINCT",
            SqlType::Double => "DOUBLE",
            SqlType::Float => "FLOAT",
            SqlType::Integer => "INTEGER",
            SqlType::JavaObject => "JAVA_OBJECT",
            SqlType::LongNVarChar => "LONGNVARCHAR",
            SqlType::LongVarBinary => "LONGVARBINARY",
            SqlType::LongVarChar => "LONGVARCHAR",
            SqlType::NChar => "NCHAR",
            SqlType::NClob => "NCLOB",
            SqlType::Null => "NULL",
            SqlType::Numeric => "NUMERIC",
            SqlType::NVarChar => "NVARCHAR",
            SqlType::Other => "OTHER",
            SqlType::Real => "REAL",
            SqlType::Ref => "REF",
            SqlType::RefCursor => "REF_CURSOR",
            SqlType::RowId => "ROWID",
            SqlType::SmallInt => "SMALLINT",
            SqlType::Struct => "STRUCT",
            SqlType::SqlXml => "SQLXML",
            SqlType::TinyInt => "TINYINT",
            SqlType::Time => "TIME",
            SqlType::TimeWithTimezone => "TIME_WITH_TIMEZONE",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::TimestampWithTimezone => "TIMESTAMP_WITH_TIMEZONE",
            SqlType::VarChar => "VARCHAR",
            SqlType::VarBinary => "VARBINARY",
        }
    }

    /// Vendor type number, as reported by parameter and column metadata.
    pub fn code(self) -> i32 {
        match self {
            SqlType::Array => 2003,
            SqlType::BigInt => -5,
            SqlType::Binary => -2,
            SqlType::Bit => -7,
            SqlType::Blob => 2004,
            SqlType::Boolean => 16,
            SqlType::Char => 1,
            SqlType::Clob => 2005,
            SqlType::DataLink => 70,
            SqlType::Date => 91,
            SqlType::Decimal => 3,
            SqlType::Distinct => 2001,
            SqlType::Double => 8,
            SqlType::Float => 6,
            SqlType::Integer => 4,
            SqlType::JavaObject => 2000,
            SqlType::LongNVarChar => -16,
            SqlType::LongVarBinary => -4,
            SqlType::LongVarChar => -1,
            SqlType::NChar => -15,
            SqlType::NClob => 2011,
            SqlType::Null => 0,
            SqlType::Numeric => 2,
            SqlType::NVarChar => -9,
            SqlType::Other => 1111,
            SqlType::Real => 7,
            SqlType::Ref => 2006,
            SqlType::RefCursor => 2012,
            SqlType::RowId => -8,
            SqlType::SmallInt => 5,
            SqlType::Struct => 2002,
            SqlType::SqlXml => 2009,
            SqlType::TinyInt => -6,
            SqlType::Time => 92,
            SqlType::TimeWithTimezone => 2013,
            SqlType::Timestamp => 93,
            SqlType::TimestampWithTimezone => 2014,
            SqlType::VarChar => 12,
            SqlType::VarBinary => -3,
        }
    }

    pub fn from_code(code: i32) -> Option<SqlType> {
        SqlType::ALL.into_iter().find(|tag| tag.code() == code)
    }

    /// Resolves a tag from its SQL name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<SqlType> {
        let name = name.trim();
        SqlType::ALL
            .into_iter()
            .find(|tag| tag.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Host representation type used to hold a value of a given SQL type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Repr {
    Array,
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Decimal,
    Char,
    Text,
    Bytes,
    Blob,
    BinaryStream,
    Date,
    Time,
    Timestamp,
    DataLink,
    Distinct,
    Null,
    Object,
    Ref,
    RowId,
    Struct,
}

impl Repr {
    /// Name of the representation type, as reported by metadata.
    pub fn name(self) -> &'static str {
        match self {
            Repr::Array => "stubdb::SqlArray",
            Repr::Bool => "bool",
            Repr::Byte => "i8",
            Repr::Short => "i16",
            Repr::Int => "i32",
            Repr::Long => "i64",
            Repr::Float => "f32",
            Repr::Double => "f64",
            Repr::Decimal => "rust_decimal::Decimal",
            Repr::Char => "char",
            Repr::Text => "String",
            Repr::Bytes => "Vec<u8>",
            Repr::Blob => "stubdb::Blob",
            Repr::BinaryStream => "std::io::Cursor<Vec<u8>>",
            Repr::Date => "chrono::NaiveDate",
            Repr::Time => "chrono::NaiveTime",
            Repr::Timestamp => "chrono::NaiveDateTime",
            Repr::DataLink => "stubdb::Value(DATALINK)",
            Repr::Distinct => "stubdb::Value(DISTINCT)",
            Repr::Null => "stubdb::Value(NULL)",
            Repr::Object => "stubdb::Value",
            Repr::Ref => "stubdb::Value(REF)",
            Repr::RowId => "stubdb::Value(ROWID)",
            Repr::Struct => "stubdb::Value(STRUCT)",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Repr::Byte
                | Repr::Short
                | Repr::Int
                | Repr::Long
                | Repr::Float
                | Repr::Double
                | Repr::Decimal
        )
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, Repr::Date | Repr::Time | Repr::Timestamp)
    }

    pub fn is_binary(self) -> bool {
        matches!(self, Repr::Bytes | Repr::Blob | Repr::BinaryStream)
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
