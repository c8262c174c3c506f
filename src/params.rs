use std::str::FromStr;

use rust_decimal::Decimal;

use crate::{Repr, SqlType, StubDbError, TypeRegistry, Value};

/// Direction of a statement parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParameterMode {
    In,
    Out,
    InOut,
}

/// Nullability of a parameter or a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Nullability {
    Unknown,
    NoNulls,
    Nullable,
}

impl Nullability {
    pub fn from_flag(nullable: Option<bool>) -> Self {
        match nullable {
            None => Self::Unknown,
            Some(true) => Self::Nullable,
            Some(false) => Self::NoNulls,
        }
    }
}

/// Immutable description of one statement parameter.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParameterDef {
    pub repr: Repr,
    pub mode: ParameterMode,
    pub sql_type: SqlType,
    pub precision: i32,
    pub scale: i32,
    pub nullability: Nullability,
    pub signed: bool,
}

impl ParameterDef {
    /// Bare definition: input mode, unknown precision and scale, no nulls.
    pub fn new(repr: Repr, sql_type: SqlType) -> Self {
        Self {
            repr,
            mode: ParameterMode::In,
            sql_type,
            precision: -1,
            scale: -1,
            nullability: Nullability::NoNulls,
            signed: false,
        }
    }

    /// Definition built from the registry defaults of `sql_type`.
    pub fn default(sql_type: SqlType) -> Self {
        let info = TypeRegistry::global().info(sql_type);
        Self {
            repr: info.repr,
            mode: ParameterMode::In,
            sql_type,
            precision: info.precision,
            scale: info.scale,
            nullability: Nullability::Unknown,
            signed: info.signed,
        }
    }

    /// Registry defaults with an explicit scale.
    pub fn scaled(sql_type: SqlType, scale: i32) -> Self {
        Self {
            scale,
            ..Self::default(sql_type)
        }
    }

    /// Definition used when binding SQL NULL.
    pub fn null(sql_type: SqlType) -> Self {
        Self::default(sql_type)
    }

    pub fn with_mode(self, mode: ParameterMode) -> Self {
        Self { mode, ..self }
    }

    pub fn with_nullability(self, nullability: Nullability) -> Self {
        Self {
            nullability,
            ..self
        }
    }

    pub fn binary() -> Self {
        Self::default(SqlType::Binary)
    }

    pub fn blob() -> Self {
        Self::default(SqlType::Blob)
    }

    pub fn bool() -> Self {
        Self::default(SqlType::Boolean)
    }

    pub fn byte() -> Self {
        Self::default(SqlType::TinyInt)
    }

    pub fn short() -> Self {
        Self::default(SqlType::SmallInt)
    }

    pub fn int() -> Self {
        Self::default(SqlType::Integer)
    }

    pub fn long() -> Self {
        Self::default(SqlType::BigInt)
    }

    pub fn string() -> Self {
        Self::default(SqlType::VarChar)
    }

    pub fn date() -> Self {
        Self::default(SqlType::Date)
    }

    pub fn time() -> Self {
        Self::default(SqlType::Time)
    }

    pub fn timestamp() -> Self {
        Self::default(SqlType::Timestamp)
    }

    pub fn array() -> Self {
        Self::default(SqlType::Array)
    }

    pub fn numeric() -> Self {
        Self::default(SqlType::Numeric)
    }

    pub fn decimal() -> Self {
        Self::default(SqlType::Decimal)
    }

    /// FLOAT definition scaled after the shortest decimal form of `value`.
    pub fn float(value: f32) -> Self {
        Self::scaled(SqlType::Float, float_scale(value, SqlType::Float))
    }

    /// REAL definition scaled after the shortest decimal form of `value`.
    pub fn real(value: f32) -> Self {
        Self::scaled(SqlType::Real, float_scale(value, SqlType::Real))
    }

    /// DOUBLE definition scaled after `value` printed with six fractional
    /// digits, trailing zeros stripped.
    pub fn double(value: f64) -> Self {
        let scale = Decimal::from_str(&format!("{value:.6}"))
            .map(|decimal| decimal.normalize().scale() as i32)
            .unwrap_or_else(|_| TypeRegistry::global().default_scale(SqlType::Double));
        Self::scaled(SqlType::Double, scale)
    }

    pub fn numeric_of(value: &Decimal) -> Self {
        Self::scaled(SqlType::Numeric, value.scale() as i32)
    }

    pub fn decimal_of(value: &Decimal) -> Self {
        Self::scaled(SqlType::Decimal, value.scale() as i32)
    }
}

fn float_scale(value: f32, sql_type: SqlType) -> i32 {
    Decimal::from_str(&value.to_string())
        .map(|decimal| decimal.scale() as i32)
        .unwrap_or_else(|_| TypeRegistry::global().default_scale(sql_type))
}

/// Parameter definition paired with its bound value.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    pub def: ParameterDef,
    pub value: Value,
}

impl Parameter {
    pub fn new(def: ParameterDef, value: impl Into<Value>) -> Self {
        Self {
            def,
            value: value.into(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }
}

/// Ordered, 1-based parameter descriptors. `None` marks an unset position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParameterMetaData {
    parameters: Vec<Option<ParameterDef>>,
}

impl ParameterMetaData {
    pub fn new(parameters: Vec<Option<ParameterDef>>) -> Self {
        Self { parameters }
    }

    pub fn count(&self) -> usize {
        self.parameters.len()
    }

    pub fn nullability(&self, position: usize) -> Result<Nullability, StubDbError> {
        Ok(self.def(position)?.nullability)
    }

    pub fn is_signed(&self, position: usize) -> Result<bool, StubDbError> {
        Ok(self.def(position)?.signed)
    }

    pub fn precision(&self, position: usize) -> Result<i32, StubDbError> {
        Ok(self.def(position)?.precision)
    }

    pub fn scale(&self, position: usize) -> Result<i32, StubDbError> {
        Ok(self.def(position)?.scale)
    }

    /// Vendor type number of the parameter.
    pub fn parameter_type(&self, position: usize) -> Result<i32, StubDbError> {
        Ok(self.def(position)?.sql_type.code())
    }

    pub fn parameter_type_name(&self, position: usize) -> Result<&'static str, StubDbError> {
        Ok(self.def(position)?.sql_type.name())
    }

    pub fn parameter_repr_name(&self, position: usize) -> Result<&'static str, StubDbError> {
        Ok(self.def(position)?.repr.name())
    }

    pub fn mode(&self, position: usize) -> Result<ParameterMode, StubDbError> {
        Ok(self.def(position)?.mode)
    }

    pub fn def(&self, position: usize) -> Result<&ParameterDef, StubDbError> {
        let slot = position
            .checked_sub(1)
            .and_then(|index| self.parameters.get(index))
            .ok_or(StubDbError::OutOfBounds { position })?;
        slot.as_ref().ok_or(StubDbError::NotBound { position })
    }
}
