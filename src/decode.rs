use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde_json::{json, Value as Json};

use crate::{
    wire::{self, ArrayFixture, ColumnFixture, RowListFixture, WarningFixture},
    Blob, Column, Repr, RowList, RowListMetaData, SqlArray, SqlType, StubDbError, TypeRegistry,
    Value, Warning,
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

impl RowList {
    /// Decodes a row list from its JSON fixture form.
    ///
    /// ```
    /// let mut rows = stubdb::RowList::from_json(
    ///     r#"{"columns":[{"label":"id","type":"INTEGER"}],"rows":[[1],[2]]}"#,
    /// )
    /// .expect("must decode");
    /// assert_eq!(rows.row_count(), 2);
    /// assert!(rows.next().expect("must move"));
    /// assert_eq!(rows.get::<i32>("id").expect("must read"), Some(1));
    /// ```
    pub fn from_json(json: &str) -> Result<Self, StubDbError> {
        let fixture = serde_json::from_str::<RowListFixture>(json)
            .map_err(|err| StubDbError::Decode(format!("invalid row list JSON: {err}")))?;
        decode_row_list(fixture)
    }

    /// Encodes the schema, rows, cycling flag and warning as JSON.
    pub fn to_json(&self) -> Result<String, StubDbError> {
        let fixture = encode_row_list(self)?;
        serde_json::to_string(&fixture)
            .map_err(|err| StubDbError::Decode(format!("cannot encode row list: {err}")))
    }
}

pub(crate) fn decode_row_list(fixture: RowListFixture) -> Result<RowList, StubDbError> {
    let columns = fixture
        .columns
        .into_iter()
        .map(decode_column)
        .collect::<Result<Vec<_>, _>>()?;

    let rows = fixture
        .rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| {
            if row.len() != columns.len() {
                return Err(StubDbError::Decode(format!(
                    "row {} has {} values, expected {}",
                    index + 1,
                    row.len(),
                    columns.len()
                )));
            }
            row.iter()
                .zip(&columns)
                .map(|(json, column)| {
                    decode_value(json, column.repr).map_err(|err| {
                        StubDbError::Decode(format!(
                            "row {}, column '{}': {}",
                            index + 1,
                            column.label,
                            decode_message(err)
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    let warning = fixture.warning.map(|warning| match warning {
        WarningFixture::Reason(reason) => Warning::new(reason),
        WarningFixture::Detailed { reason, sql_state } => Warning { reason, sql_state },
    });

    Ok(RowList::from_parts(
        RowListMetaData::new(columns),
        rows,
        None,
        warning,
        fixture.cycling,
    ))
}

fn decode_message(err: StubDbError) -> String {
    match err {
        StubDbError::Decode(message) => message,
        other => other.to_string(),
    }
}

fn decode_column(column: ColumnFixture) -> Result<Column, StubDbError> {
    let sql_type = sql_type_named(&column.sql_type)?;
    let repr = TypeRegistry::global().representation_of(sql_type);
    Ok(Column {
        repr,
        label: column.label,
        nullable: column.nullable,
    })
}

fn sql_type_named(name: &str) -> Result<SqlType, StubDbError> {
    SqlType::from_name(name)
        .ok_or_else(|| StubDbError::Decode(format!("unknown SQL type '{name}'")))
}

fn mismatch(json: &Json, repr: Repr) -> StubDbError {
    StubDbError::Decode(format!("expected {repr}, got {json}"))
}

pub(crate) fn decode_value(json: &Json, repr: Repr) -> Result<Value, StubDbError> {
    if json.is_null() {
        return Ok(Value::Null);
    }
    let integer = || json.as_i64().ok_or_else(|| mismatch(json, repr));
    let out_of_range = |_| StubDbError::Decode(format!("{json} out of range for {repr}"));
    let text = || json.as_str().ok_or_else(|| mismatch(json, repr));

    match repr {
        Repr::Bool => json.as_bool().map(Value::Bool).ok_or_else(|| mismatch(json, repr)),
        Repr::Byte => i8::try_from(integer()?).map(Value::Byte).map_err(out_of_range),
        Repr::Short => i16::try_from(integer()?).map(Value::Short).map_err(out_of_range),
        Repr::Int => i32::try_from(integer()?).map(Value::Int).map_err(out_of_range),
        Repr::Long => integer().map(Value::Long),
        Repr::Float => json
            .as_f64()
            .map(|value| Value::Float(value as f32))
            .ok_or_else(|| mismatch(json, repr)),
        Repr::Double => json
            .as_f64()
            .map(Value::Double)
            .ok_or_else(|| mismatch(json, repr)),
        Repr::Decimal => {
            let literal = match json {
                Json::String(literal) => literal.clone(),
                Json::Number(number) => number.to_string(),
                _ => return Err(mismatch(json, repr)),
            };
            Decimal::from_str(&literal)
                .or_else(|_| Decimal::from_scientific(&literal))
                .map(Value::Decimal)
                .map_err(|err| StubDbError::Decode(format!("invalid decimal '{literal}': {err}")))
        }
        Repr::Char => {
            let value = text()?;
            let mut chars = value.chars();
            match (chars.next(), chars.next()) {
                (Some(single), None) => Ok(Value::Char(single)),
                _ => Err(mismatch(json, repr)),
            }
        }
        Repr::Text => text().map(Value::text),
        Repr::Bytes | Repr::BinaryStream => decode_bytes(json, repr).map(Value::Bytes),
        Repr::Blob => decode_bytes(json, repr).map(|bytes| Value::Blob(Blob::new(bytes))),
        Repr::Date => {
            let value = text()?;
            NaiveDate::from_str(value)
                .map(Value::Date)
                .map_err(|err| StubDbError::Decode(format!("invalid date '{value}': {err}")))
        }
        Repr::Time => {
            let value = text()?;
            NaiveTime::from_str(value)
                .map(Value::Time)
                .map_err(|err| StubDbError::Decode(format!("invalid time '{value}': {err}")))
        }
        Repr::Timestamp => {
            let value = text()?;
            NaiveDateTime::from_str(value)
                .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
                .map(Value::Timestamp)
                .map_err(|err| StubDbError::Decode(format!("invalid timestamp '{value}': {err}")))
        }
        Repr::Array => {
            let fixture = serde_json::from_value::<ArrayFixture>(json.clone())
                .map_err(|err| StubDbError::Decode(format!("invalid array: {err}")))?;
            let base = TypeRegistry::global().representation_of(sql_type_named(&fixture.base)?);
            let elements = fixture
                .elements
                .iter()
                .map(|element| decode_value(element, base))
                .collect::<Result<Vec<_>, _>>()?;
            SqlArray::new(base, elements).map(Value::Array)
        }
        Repr::Object => decode_untyped(json),
        Repr::Null => Err(mismatch(json, repr)),
        Repr::DataLink | Repr::Distinct | Repr::Ref | Repr::RowId | Repr::Struct => Err(
            StubDbError::Decode(format!("no fixture form for {repr} values")),
        ),
    }
}

fn decode_bytes(json: &Json, repr: Repr) -> Result<Vec<u8>, StubDbError> {
    json.as_array()
        .ok_or_else(|| mismatch(json, repr))?
        .iter()
        .map(|byte| {
            byte.as_u64()
                .and_then(|byte| u8::try_from(byte).ok())
                .ok_or_else(|| StubDbError::Decode(format!("invalid byte {byte}")))
        })
        .collect()
}

/// Value shaped after the JSON itself, for untyped columns.
fn decode_untyped(json: &Json) -> Result<Value, StubDbError> {
    match json {
        Json::Null => Ok(Value::Null),
        Json::Bool(value) => Ok(Value::Bool(*value)),
        Json::Number(number) => number
            .as_i64()
            .map(Value::Long)
            .or_else(|| number.as_f64().map(Value::Double))
            .ok_or_else(|| StubDbError::Decode(format!("unsupported number {number}"))),
        Json::String(value) => Ok(Value::text(value.as_str())),
        Json::Array(_) => decode_bytes(json, Repr::Object).map(Value::Bytes),
        Json::Object(_) => decode_value(json, Repr::Array),
    }
}

pub(crate) fn encode_row_list(rows: &RowList) -> Result<RowListFixture, StubDbError> {
    let registry = TypeRegistry::global();
    let columns = rows
        .metadata()
        .columns()
        .map(|column| {
            let sql_type = registry.tag_of(column.repr).ok_or_else(|| {
                StubDbError::Decode(format!("no SQL type for column '{}'", column.label))
            })?;
            Ok(ColumnFixture {
                label: column.label,
                sql_type: sql_type.name().to_owned(),
                nullable: column.nullable,
            })
        })
        .collect::<Result<Vec<_>, StubDbError>>()?;

    let encoded = rows
        .rows()
        .iter()
        .map(|row| row.iter().map(encode_value).collect::<Result<Vec<_>, _>>())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RowListFixture {
        columns,
        rows: encoded,
        cycling: rows.is_cycling(),
        warning: rows.warning().map(|warning| WarningFixture::Detailed {
            reason: warning.reason.clone(),
            sql_state: warning.sql_state.clone(),
        }),
    })
}

fn encode_value(value: &Value) -> Result<Json, StubDbError> {
    let finite = |value: f64| {
        if value.is_finite() {
            Ok(json!(value))
        } else {
            Err(StubDbError::Decode(format!(
                "non-finite float value '{value}' is unsupported"
            )))
        }
    };

    Ok(match value {
        Value::Null => Json::Null,
        Value::Bool(value) => json!(value),
        Value::Byte(value) => json!(value),
        Value::Short(value) => json!(value),
        Value::Int(value) => json!(value),
        Value::Long(value) => json!(value),
        Value::Float(value) => finite(f64::from(*value))?,
        Value::Double(value) => finite(*value)?,
        Value::Char(_) | Value::Text(_) | Value::Decimal(_) | Value::Date(_) | Value::Time(_) => {
            json!(value.to_string())
        }
        Value::Bytes(bytes) => json!(bytes),
        Value::Blob(blob) => json!(blob.bytes()),
        Value::Timestamp(value) => json!(value.format(TIMESTAMP_FORMAT).to_string()),
        Value::Array(array) => {
            let elements = array
                .elements()
                .iter()
                .map(encode_value)
                .collect::<Result<Vec<_>, _>>()?;
            serde_json::to_value(wire::ArrayFixture {
                base: array.base_type_name().to_owned(),
                elements,
            })
            .map_err(|err| StubDbError::Decode(format!("cannot encode array: {err}")))?
        }
    })
}
