use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::connection::ConnectionInner;
use crate::{
    coerce, BatchError, Blob, Parameter, ParameterDef, ParameterMetaData, Result, RowList,
    SqlArray, SqlType, StatementHandle, StatementKind, StubDbError, TypeRegistry, Value, Warning,
};

/// Projection applied to the generated keys returned by an update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum GeneratedKeys {
    /// Keys are exposed as returned by the handler.
    #[default]
    Default,
    ColumnNames(Vec<String>),
    /// 1-based column indexes.
    ColumnIndexes(Vec<usize>),
}

impl GeneratedKeys {
    fn project(&self, keys: RowList) -> Result<RowList> {
        match self {
            GeneratedKeys::Default => Ok(keys),
            GeneratedKeys::ColumnNames(names) => {
                let labels: Vec<&str> = names.iter().map(String::as_str).collect();
                keys.with_projection_labels(&labels)
            }
            GeneratedKeys::ColumnIndexes(indexes) => keys.with_projection_indexes(indexes),
        }
    }
}

/// State visible after the last execution.
#[derive(Clone, Debug, Default)]
struct ExecutionState {
    result_set: Option<RowList>,
    update_count: Option<u64>,
    generated_keys: Option<RowList>,
    warning: Option<Warning>,
}

#[derive(Clone, Debug)]
struct BatchEntry {
    sql: String,
    parameters: Vec<Option<Parameter>>,
}

/// Execution core shared by [`Statement`] and [`PreparedStatement`].
struct Executor {
    connection: Arc<ConnectionInner>,
    handle: StatementHandle,
    state: ExecutionState,
    batch: Vec<BatchEntry>,
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.handle.release();
    }
}

impl Executor {
    fn new(connection: Arc<ConnectionInner>, sql: Option<String>) -> Self {
        let handle = connection.register(sql);
        Self {
            connection,
            handle,
            state: ExecutionState::default(),
            batch: Vec::new(),
        }
    }

    /// Bound parameters, failing on the lowest unset position.
    fn bound(parameters: &[Option<Parameter>]) -> Result<Vec<Parameter>> {
        parameters
            .iter()
            .enumerate()
            .map(|(index, parameter)| {
                parameter
                    .clone()
                    .ok_or(StubDbError::MissingParameter { position: index + 1 })
            })
            .collect()
    }

    fn query(&mut self, sql: &str, parameters: &[Option<Parameter>]) -> Result<RowList> {
        self.state = ExecutionState::default();
        let handler = Arc::clone(&self.connection.handler);
        if !handler.is_query(sql) {
            return Err(StubDbError::StatementKindMismatch {
                expected: StatementKind::Query,
                sql: sql.to_owned(),
            });
        }
        let parameters = Self::bound(parameters)?;

        #[cfg(feature = "tracing")]
        tracing::debug!("executing query on statement {}: {}", self.handle.id(), sql);

        let result = handler
            .when_query(sql, &parameters)
            .map_err(StubDbError::from_handler)?;
        let warning = result.warning.or_else(|| result.row_list.warning().cloned());
        let mut row_list = result.row_list.with_statement(self.handle.clone());
        if let Some(warning) = &warning {
            row_list = row_list.with_warning(warning.clone());
        }

        self.state = ExecutionState {
            result_set: Some(row_list.clone()),
            update_count: None,
            generated_keys: Some(RowList::empty().with_statement(self.handle.clone())),
            warning,
        };
        Ok(row_list)
    }

    fn update(
        &mut self,
        sql: &str,
        parameters: &[Option<Parameter>],
        keys: &GeneratedKeys,
    ) -> Result<u64> {
        self.state = ExecutionState::default();
        let handler = Arc::clone(&self.connection.handler);
        if handler.is_query(sql) {
            return Err(StubDbError::StatementKindMismatch {
                expected: StatementKind::Update,
                sql: sql.to_owned(),
            });
        }
        let parameters = Self::bound(parameters)?;

        #[cfg(feature = "tracing")]
        tracing::debug!("executing update on statement {}: {}", self.handle.id(), sql);

        let result = handler
            .when_update(sql, &parameters)
            .map_err(StubDbError::from_handler)?;
        let generated_keys = match result.generated_keys {
            Some(returned) => keys.project(returned.with_statement(self.handle.clone()))?,
            None => RowList::empty().with_statement(self.handle.clone()),
        };

        self.state = ExecutionState {
            result_set: result
                .row_list
                .map(|row_list| row_list.with_statement(self.handle.clone())),
            update_count: Some(result.count),
            generated_keys: Some(generated_keys),
            warning: result.warning,
        };
        Ok(result.count)
    }

    fn execute(
        &mut self,
        sql: &str,
        parameters: &[Option<Parameter>],
        keys: &GeneratedKeys,
    ) -> Result<bool> {
        if self.connection.handler.is_query(sql) {
            self.query(sql, parameters).map(|_| true)
        } else {
            self.update(sql, parameters, keys).map(|_| false)
        }
    }

    /// Replays every batch entry through the update path.
    ///
    /// Counts start as `None` (failed). Without continue-on-error the first
    /// failure stops the batch.
    fn execute_batch(&mut self, keys: &GeneratedKeys) -> Result<Vec<Option<u64>>> {
        let entries = self.batch.clone();
        let continue_on_error = self.connection.options.batch_continue_on_error;
        let mut counts = vec![None; entries.len()];
        let mut failures = Vec::new();

        for (index, entry) in entries.iter().enumerate() {
            match self.update(&entry.sql, &entry.parameters, keys) {
                Ok(count) => counts[index] = Some(count),
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("batch entry {} failed: {}", index, err);

                    failures.push(err);
                    if !continue_on_error {
                        return Err(BatchError::new(counts, failures).into());
                    }
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "batch of {} entries executed, {} failed",
            counts.len(),
            failures.len()
        );

        if failures.is_empty() {
            Ok(counts)
        } else {
            Err(BatchError::new(counts, failures).into())
        }
    }
}

/// Statement executing arbitrary SQL without parameters.
pub struct Statement {
    executor: Executor,
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("id", &self.executor.handle.id())
            .field("batch", &self.executor.batch.len())
            .finish()
    }
}

impl Statement {
    pub(crate) fn new(connection: Arc<ConnectionInner>) -> Self {
        Self {
            executor: Executor::new(connection, None),
        }
    }

    pub fn handle(&self) -> StatementHandle {
        self.executor.handle.clone()
    }

    pub fn execute_query(&mut self, sql: &str) -> Result<RowList> {
        self.executor.query(sql, &[])
    }

    pub fn execute_update(&mut self, sql: &str) -> Result<u64> {
        self.executor.update(sql, &[], &GeneratedKeys::Default)
    }

    pub fn execute_update_with_keys(&mut self, sql: &str, keys: GeneratedKeys) -> Result<u64> {
        self.executor.update(sql, &[], &keys)
    }

    /// Executes `sql` as classified by the handler; `true` when it produced
    /// a row list.
    pub fn execute(&mut self, sql: &str) -> Result<bool> {
        self.executor.execute(sql, &[], &GeneratedKeys::Default)
    }

    pub fn add_batch(&mut self, sql: impl Into<String>) {
        self.executor.batch.push(BatchEntry {
            sql: sql.into(),
            parameters: Vec::new(),
        });
    }

    pub fn execute_batch(&mut self) -> Result<Vec<Option<u64>>> {
        self.executor.execute_batch(&GeneratedKeys::Default)
    }

    pub fn clear_batch(&mut self) {
        self.executor.batch.clear();
    }

    pub fn batch_len(&self) -> usize {
        self.executor.batch.len()
    }

    /// Rows of the last query as a separate copy with its own cursor.
    ///
    /// The copy shares row storage with the list the query returned, but
    /// cursor moves on one are not seen by the other.
    pub fn result_set(&self) -> Option<&RowList> {
        self.executor.state.result_set.as_ref()
    }

    /// Count of the last update, `None` after a query.
    pub fn update_count(&self) -> Option<u64> {
        self.executor.state.update_count
    }

    pub fn generated_keys(&self) -> Option<&RowList> {
        self.executor.state.generated_keys.as_ref()
    }

    pub fn warning(&self) -> Option<&Warning> {
        self.executor.state.warning.as_ref()
    }
}

/// Statement with fixed SQL and 1-based positional parameters.
///
/// Binding at position N back-fills unset lower positions with gaps; any gap
/// left at execution fails with [`StubDbError::MissingParameter`].
pub struct PreparedStatement {
    executor: Executor,
    sql: String,
    keys: GeneratedKeys,
    parameters: Vec<Option<Parameter>>,
}

impl fmt::Debug for PreparedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedStatement")
            .field("id", &self.executor.handle.id())
            .field("sql", &self.sql)
            .field("keys", &self.keys)
            .field("parameters", &self.parameters)
            .finish()
    }
}

impl PreparedStatement {
    pub(crate) fn new(connection: Arc<ConnectionInner>, sql: String, keys: GeneratedKeys) -> Self {
        Self {
            executor: Executor::new(connection, Some(sql.clone())),
            sql,
            keys,
            parameters: Vec::new(),
        }
    }

    pub fn handle(&self) -> StatementHandle {
        self.executor.handle.clone()
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameters(&self) -> &[Option<Parameter>] {
        &self.parameters
    }

    fn bind(&mut self, position: usize, def: ParameterDef, value: impl Into<Value>) -> Result<()> {
        if position == 0 {
            return Err(StubDbError::OutOfBounds { position });
        }
        if self.parameters.len() < position {
            self.parameters.resize(position, None);
        }
        self.parameters[position - 1] = Some(Parameter::new(def, value));
        Ok(())
    }

    pub fn set_null(&mut self, position: usize, sql_type: SqlType) -> Result<()> {
        self.bind(position, ParameterDef::null(sql_type), Value::Null)
    }

    pub fn set_bool(&mut self, position: usize, value: bool) -> Result<()> {
        self.bind(position, ParameterDef::bool(), value)
    }

    pub fn set_byte(&mut self, position: usize, value: i8) -> Result<()> {
        self.bind(position, ParameterDef::byte(), value)
    }

    pub fn set_short(&mut self, position: usize, value: i16) -> Result<()> {
        self.bind(position, ParameterDef::short(), value)
    }

    pub fn set_int(&mut self, position: usize, value: i32) -> Result<()> {
        self.bind(position, ParameterDef::int(), value)
    }

    pub fn set_long(&mut self, position: usize, value: i64) -> Result<()> {
        self.bind(position, ParameterDef::long(), value)
    }

    pub fn set_float(&mut self, position: usize, value: f32) -> Result<()> {
        self.bind(position, ParameterDef::float(value), value)
    }

    pub fn set_real(&mut self, position: usize, value: f32) -> Result<()> {
        self.bind(position, ParameterDef::real(value), value)
    }

    pub fn set_double(&mut self, position: usize, value: f64) -> Result<()> {
        self.bind(position, ParameterDef::double(value), value)
    }

    /// NUMERIC scaled after the value; `None` binds NULL with default scale.
    pub fn set_numeric(&mut self, position: usize, value: Option<Decimal>) -> Result<()> {
        let def = value
            .as_ref()
            .map_or_else(ParameterDef::numeric, ParameterDef::numeric_of);
        self.bind(position, def, value)
    }

    pub fn set_decimal(&mut self, position: usize, value: Option<Decimal>) -> Result<()> {
        let def = value
            .as_ref()
            .map_or_else(ParameterDef::decimal, ParameterDef::decimal_of);
        self.bind(position, def, value)
    }

    pub fn set_string(&mut self, position: usize, value: impl Into<String>) -> Result<()> {
        self.bind(position, ParameterDef::string(), value.into())
    }

    pub fn set_bytes(&mut self, position: usize, value: impl Into<Vec<u8>>) -> Result<()> {
        self.bind(position, ParameterDef::binary(), value.into())
    }

    pub fn set_blob(&mut self, position: usize, value: Blob) -> Result<()> {
        self.bind(position, ParameterDef::blob(), value)
    }

    pub fn set_array(&mut self, position: usize, value: SqlArray) -> Result<()> {
        self.bind(position, ParameterDef::array(), value)
    }

    pub fn set_date(&mut self, position: usize, value: NaiveDate) -> Result<()> {
        self.bind(position, ParameterDef::date(), value)
    }

    pub fn set_time(&mut self, position: usize, value: NaiveTime) -> Result<()> {
        self.bind(position, ParameterDef::time(), value)
    }

    pub fn set_timestamp(&mut self, position: usize, value: NaiveDateTime) -> Result<()> {
        self.bind(position, ParameterDef::timestamp(), value)
    }

    /// Binds `value` with the SQL type inferred from its representation.
    pub fn set_object(&mut self, position: usize, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        if value.is_null() {
            return Err(StubDbError::Configuration(
                "cannot bind an untyped NULL, use set_null".to_owned(),
            ));
        }
        let repr = value.repr();
        let sql_type = TypeRegistry::global().tag_of(repr).ok_or_else(|| {
            StubDbError::Configuration(format!("unsupported parameter type: {repr}"))
        })?;
        self.set_object_typed(position, value, sql_type)
    }

    /// Binds `value` as `sql_type`, coercing it to the type's representation.
    pub fn set_object_typed(
        &mut self,
        position: usize,
        value: impl Into<Value>,
        sql_type: SqlType,
    ) -> Result<()> {
        let value = value.into();
        if value.is_null() {
            return self.set_null(position, sql_type);
        }
        let value = coerce(&value, TypeRegistry::global().representation_of(sql_type))?;
        let def = match (&value, sql_type) {
            (Value::Double(x), SqlType::Double) => ParameterDef::double(*x),
            (Value::Float(x), SqlType::Real) => ParameterDef::real(*x),
            (Value::Float(x), SqlType::Float) => ParameterDef::float(*x),
            (Value::Decimal(x), SqlType::Numeric) => ParameterDef::numeric_of(x),
            (Value::Decimal(x), SqlType::Decimal) => ParameterDef::decimal_of(x),
            _ => ParameterDef::default(sql_type),
        };
        self.bind(position, def, value)
    }

    /// Binds `value` as `sql_type`; fractional types take the given scale.
    pub fn set_object_scaled(
        &mut self,
        position: usize,
        value: impl Into<Value>,
        sql_type: SqlType,
        scale: i32,
    ) -> Result<()> {
        let value = value.into();
        if value.is_null() {
            return self.set_null(position, sql_type);
        }
        let value = coerce(&value, TypeRegistry::global().representation_of(sql_type))?;
        let def = match sql_type {
            SqlType::Double
            | SqlType::Real
            | SqlType::Float
            | SqlType::Numeric
            | SqlType::Decimal => ParameterDef::scaled(sql_type, scale),
            _ => ParameterDef::default(sql_type),
        };
        self.bind(position, def, value)
    }

    pub fn clear_parameters(&mut self) {
        self.parameters.clear();
    }

    /// Metadata of the bound parameters, gaps included.
    pub fn parameter_metadata(&self) -> ParameterMetaData {
        ParameterMetaData::new(
            self.parameters
                .iter()
                .map(|parameter| parameter.as_ref().map(|parameter| parameter.def.clone()))
                .collect(),
        )
    }

    pub fn execute_query(&mut self) -> Result<RowList> {
        self.executor.query(&self.sql, &self.parameters)
    }

    pub fn execute_update(&mut self) -> Result<u64> {
        self.executor.update(&self.sql, &self.parameters, &self.keys)
    }

    /// Executes as classified by the handler; `true` when it produced a row
    /// list.
    pub fn execute(&mut self) -> Result<bool> {
        self.executor.execute(&self.sql, &self.parameters, &self.keys)
    }

    /// Snapshots the current parameters as a batch entry.
    pub fn add_batch(&mut self) {
        self.executor.batch.push(BatchEntry {
            sql: self.sql.clone(),
            parameters: self.parameters.clone(),
        });
    }

    /// Always fails: the SQL of a prepared statement is fixed.
    pub fn add_batch_sql(&mut self, sql: &str) -> Result<()> {
        Err(StubDbError::Configuration(format!(
            "cannot add distinct SQL to a prepared statement: {sql}"
        )))
    }

    pub fn execute_batch(&mut self) -> Result<Vec<Option<u64>>> {
        self.executor.execute_batch(&self.keys)
    }

    pub fn clear_batch(&mut self) {
        self.executor.batch.clear();
    }

    pub fn batch_len(&self) -> usize {
        self.executor.batch.len()
    }

    /// Rows of the last query as a separate copy with its own cursor.
    ///
    /// The copy shares row storage with the list the query returned, but
    /// cursor moves on one are not seen by the other.
    pub fn result_set(&self) -> Option<&RowList> {
        self.executor.state.result_set.as_ref()
    }

    /// Count of the last update, `None` after a query.
    pub fn update_count(&self) -> Option<u64> {
        self.executor.state.update_count
    }

    pub fn generated_keys(&self) -> Option<&RowList> {
        self.executor.state.generated_keys.as_ref()
    }

    pub fn warning(&self) -> Option<&Warning> {
        self.executor.state.warning.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use crate::{
        CompositeHandler, Connection, ConnectionOptions, Nullability, ParameterDef,
        PreparedStatement, SqlType, StubDbError, Value,
    };

    fn prepared(sql: &str) -> (Connection, PreparedStatement) {
        let connection = Connection::new(ConnectionOptions::default(), CompositeHandler::new());
        let statement = connection.prepare_statement(sql);
        (connection, statement)
    }

    #[test]
    fn binding_back_fills_gaps() {
        let (_connection, mut statement) = prepared("INSERT INTO t VALUES (?, ?, ?)");
        statement.set_int(3, 7).expect("must bind");
        assert_eq!(statement.parameters().len(), 3);
        assert!(statement.parameters()[0].is_none());

        let meta = statement.parameter_metadata();
        assert_eq!(meta.count(), 3);
        assert!(matches!(
            meta.scale(1),
            Err(StubDbError::NotBound { position: 1 })
        ));
        assert_eq!(meta.parameter_type_name(3).expect("must read"), "INTEGER");

        statement.set_string(1, "a").expect("must bind");
        assert_eq!(statement.parameters().len(), 3);
        statement.clear_parameters();
        assert!(statement.parameters().is_empty());
    }

    #[test]
    fn position_zero_is_out_of_bounds() {
        let (_connection, mut statement) = prepared("SELECT ?");
        assert!(matches!(
            statement.set_bool(0, true),
            Err(StubDbError::OutOfBounds { position: 0 })
        ));
    }

    #[test]
    fn fractional_setters_derive_scale() {
        let (_connection, mut statement) = prepared("UPDATE t SET a = ?, b = ?, c = ?");
        statement.set_float(1, 1.25).expect("must bind");
        statement
            .set_numeric(2, Some(Decimal::from_str("10.125").expect("must parse")))
            .expect("must bind");
        statement.set_numeric(3, None).expect("must bind");

        let meta = statement.parameter_metadata();
        assert_eq!(meta.scale(1).expect("must read"), 2);
        assert_eq!(meta.scale(2).expect("must read"), 3);
        assert_eq!(meta.scale(3).expect("must read"), 2);
        assert!(statement.parameters()[2]
            .as_ref()
            .expect("must be bound")
            .is_null());
    }

    #[test]
    fn set_object_infers_type() {
        let (_connection, mut statement) = prepared("SELECT ?, ?");
        statement.set_object(1, "text").expect("must bind");
        statement.set_object(2, 12_i64).expect("must bind");

        let meta = statement.parameter_metadata();
        assert_eq!(meta.parameter_type_name(1).expect("must read"), "VARCHAR");
        assert_eq!(meta.parameter_type_name(2).expect("must read"), "BIGINT");
        assert_eq!(meta.nullability(2).expect("must read"), Nullability::Unknown);

        let err = statement.set_object(1, Value::Null).expect_err("must fail");
        assert!(matches!(err, StubDbError::Configuration(_)));
    }

    #[test]
    fn set_object_typed_coerces_value() {
        let (_connection, mut statement) = prepared("SELECT ?, ?");
        statement
            .set_object_typed(1, 3_i32, SqlType::Double)
            .expect("must bind");
        statement
            .set_object_typed(2, Value::Null, SqlType::Date)
            .expect("must bind");

        let first = statement.parameters()[0].as_ref().expect("must be bound");
        assert_eq!(first.value, Value::Double(3.0));
        assert_eq!(first.def, ParameterDef::double(3.0));
        let second = statement.parameters()[1].as_ref().expect("must be bound");
        assert_eq!(second.def, ParameterDef::null(SqlType::Date));

        assert!(matches!(
            statement.set_object_typed(1, "abc", SqlType::Integer),
            Err(StubDbError::IncompatibleType { .. })
        ));
    }

    #[test]
    fn set_object_scaled_applies_scale_to_fractional_types() {
        let (_connection, mut statement) = prepared("SELECT ?, ?");
        statement
            .set_object_scaled(1, 1.5_f64, SqlType::Numeric, 4)
            .expect("must bind");
        statement
            .set_object_scaled(2, 9_i64, SqlType::BigInt, 4)
            .expect("must bind");

        let meta = statement.parameter_metadata();
        assert_eq!(meta.scale(1).expect("must read"), 4);
        assert_eq!(meta.scale(2).expect("must read"), 0);
    }

    #[test]
    fn prepared_sql_is_fixed() {
        let (_connection, mut statement) = prepared("DELETE FROM t");
        assert!(matches!(
            statement.add_batch_sql("DELETE FROM u"),
            Err(StubDbError::Configuration(_))
        ));
        statement.add_batch();
        statement.add_batch();
        assert_eq!(statement.batch_len(), 2);
        statement.clear_batch();
        assert_eq!(statement.batch_len(), 0);
    }
}
