//! Schema-aware, cursor-navigable row container.

use std::hash::{Hash, Hasher};
use std::io::Cursor;
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
    coerce, Column, FromValue, Repr, RowListMetaData, StatementHandle, StubDbError, Value,
    Warning,
};

/// Column reference accepted by row reads: a 1-based index or a label.
pub trait ColumnIndex {
    /// Resolves to a 1-based column index. Labels are checked against the
    /// metadata; indexes are checked against the current row.
    fn resolve(&self, metadata: &RowListMetaData) -> Result<usize, StubDbError>;
}

impl ColumnIndex for usize {
    fn resolve(&self, _: &RowListMetaData) -> Result<usize, StubDbError> {
        Ok(*self)
    }
}

impl ColumnIndex for &str {
    fn resolve(&self, metadata: &RowListMetaData) -> Result<usize, StubDbError> {
        metadata.find_column(self)
    }
}

impl ColumnIndex for String {
    fn resolve(&self, metadata: &RowListMetaData) -> Result<usize, StubDbError> {
        metadata.find_column(self)
    }
}

/// Rows with column metadata and a cursor.
///
/// Transforms (`with_*`, projections, `truncate`) return a new list that
/// shares the rows where possible; only [`RowList::append`] mutates in place.
/// The cursor starts before the first row (position 0) and is 1-based on
/// rows. Equality and hashing look at the schema and the cycling flag only.
#[derive(Clone, Debug)]
pub struct RowList {
    metadata: Arc<RowListMetaData>,
    rows: Arc<Vec<Vec<Value>>>,
    statement: Option<StatementHandle>,
    warning: Option<Warning>,
    cycling: bool,
    forward_only: bool,
    fetch_size: usize,
    cursor: usize,
    last_was_null: bool,
}

impl PartialEq for RowList {
    fn eq(&self, other: &Self) -> bool {
        self.cycling == other.cycling && self.metadata == other.metadata
    }
}

impl Eq for RowList {}

impl Hash for RowList {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.metadata.hash(state);
        self.cycling.hash(state);
    }
}

impl Default for RowList {
    fn default() -> Self {
        Self::empty()
    }
}

impl RowList {
    pub fn from_parts(
        metadata: RowListMetaData,
        rows: Vec<Vec<Value>>,
        statement: Option<StatementHandle>,
        warning: Option<Warning>,
        cycling: bool,
    ) -> Self {
        Self::assemble(Arc::new(metadata), Arc::new(rows), statement, warning, cycling, false)
    }

    fn assemble(
        metadata: Arc<RowListMetaData>,
        rows: Arc<Vec<Vec<Value>>>,
        statement: Option<StatementHandle>,
        warning: Option<Warning>,
        cycling: bool,
        forward_only: bool,
    ) -> Self {
        let init_on_first_row = !rows.is_empty()
            && statement
                .as_ref()
                .and_then(StatementHandle::options)
                .is_some_and(|options| options.init_on_first_row);
        Self {
            fetch_size: rows.len(),
            cursor: usize::from(init_on_first_row),
            metadata,
            rows,
            statement,
            warning,
            cycling,
            forward_only,
            last_was_null: false,
        }
    }

    /// Rebuilds the list with the same schema and attachments.
    fn derive(&self, metadata: Arc<RowListMetaData>, rows: Arc<Vec<Vec<Value>>>) -> Self {
        Self::assemble(
            metadata,
            rows,
            self.statement.clone(),
            self.warning.clone(),
            self.cycling,
            self.forward_only,
        )
    }

    pub fn new(columns: impl IntoIterator<Item = Column>) -> Self {
        Self::from_parts(RowListMetaData::new(columns), Vec::new(), None, None, false)
    }

    /// Empty list whose columns are labelled `"1"`, `"2"`, ...
    pub fn of_reprs(reprs: impl IntoIterator<Item = Repr>) -> Self {
        Self::from_parts(RowListMetaData::of_reprs(reprs), Vec::new(), None, None, false)
    }

    /// No columns, no rows.
    pub fn empty() -> Self {
        Self::from_parts(RowListMetaData::default(), Vec::new(), None, None, false)
    }

    pub fn builder(columns: impl IntoIterator<Item = Column>) -> RowListBuilder {
        RowListBuilder {
            metadata: RowListMetaData::new(columns),
            rows: Vec::new(),
            cycling: false,
            warning: None,
        }
    }

    pub fn metadata(&self) -> &RowListMetaData {
        &self.metadata
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn fetch_size(&self) -> usize {
        self.fetch_size
    }

    pub fn is_cycling(&self) -> bool {
        self.cycling
    }

    pub fn is_forward_only(&self) -> bool {
        self.forward_only
    }

    pub fn warning(&self) -> Option<&Warning> {
        self.warning.as_ref()
    }

    pub fn statement(&self) -> Option<&StatementHandle> {
        self.statement.as_ref()
    }

    /// Appends a row without checking it against the metadata.
    pub fn append<I, V>(&mut self, row: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Arc::make_mut(&mut self.rows).push(row.into_iter().map(Into::into).collect());
        self.fetch_size += 1;
        self
    }

    pub fn with_label(&self, column: usize, label: impl Into<String>) -> Result<Self, StubDbError> {
        let metadata = self.metadata.with_label(column, label.into())?;
        Ok(self.derive(Arc::new(metadata), Arc::clone(&self.rows)))
    }

    pub fn with_nullable(&self, column: usize, nullable: bool) -> Result<Self, StubDbError> {
        let metadata = self.metadata.with_nullable(column, nullable)?;
        Ok(self.derive(Arc::new(metadata), Arc::clone(&self.rows)))
    }

    /// Keeps the labelled columns, in the given order.
    pub fn with_projection_labels(&self, labels: &[&str]) -> Result<Self, StubDbError> {
        let indexes = labels
            .iter()
            .map(|label| self.metadata.find_column(label))
            .collect::<Result<Vec<_>, _>>()?;
        self.with_projection_indexes(&indexes)
    }

    /// Keeps the columns at the given 1-based indexes, in the given order.
    pub fn with_projection_indexes(&self, columns: &[usize]) -> Result<Self, StubDbError> {
        let metadata = self.metadata.project(columns)?;
        let rows = self
            .rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| row.get(column - 1).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Ok(self.derive(Arc::new(metadata), Arc::new(rows)))
    }

    /// Keeps at most the first `max_rows` rows; `0` keeps everything.
    pub fn truncate(&self, max_rows: usize) -> Self {
        if max_rows == 0 || max_rows >= self.rows.len() {
            return self.derive(Arc::clone(&self.metadata), Arc::clone(&self.rows));
        }
        let rows = self.rows[..max_rows].to_vec();
        self.derive(Arc::clone(&self.metadata), Arc::new(rows))
    }

    /// Copy whose cursor range ends at row `fetch_size`.
    ///
    /// The value is taken as given, so a size above the row count lets the
    /// cursor sit on positions that hold no row.
    pub fn with_fetch_size(&self, fetch_size: usize) -> Self {
        Self {
            fetch_size,
            ..self.derive(Arc::clone(&self.metadata), Arc::clone(&self.rows))
        }
    }

    /// Narrows the cursor range in place; sizes above the row count are
    /// ignored.
    pub fn set_fetch_size(&mut self, fetch_size: usize) {
        if fetch_size <= self.rows.len() {
            self.fetch_size = fetch_size;
        }
    }

    /// Cycling lists wrap moves past the fetch size back to row 1.
    pub fn with_cycling(&self, cycling: bool) -> Self {
        Self {
            cycling,
            ..self.derive(Arc::clone(&self.metadata), Arc::clone(&self.rows))
        }
    }

    pub fn with_warning(&self, warning: impl Into<Warning>) -> Self {
        Self {
            warning: Some(warning.into()),
            ..self.derive(Arc::clone(&self.metadata), Arc::clone(&self.rows))
        }
    }

    pub fn with_statement(&self, statement: StatementHandle) -> Self {
        Self::assemble(
            Arc::clone(&self.metadata),
            Arc::clone(&self.rows),
            Some(statement),
            self.warning.clone(),
            self.cycling,
            self.forward_only,
        )
    }

    /// Copy rejecting backward cursor moves.
    pub fn forward_only(&self) -> Self {
        Self {
            forward_only: true,
            ..self.derive(Arc::clone(&self.metadata), Arc::clone(&self.rows))
        }
    }

    pub fn next(&mut self) -> Result<bool, StubDbError> {
        if self.rows.is_empty() {
            return Ok(false);
        }
        self.relative(1)
    }

    pub fn previous(&mut self) -> Result<bool, StubDbError> {
        self.check_scrollable()?;
        if self.rows.is_empty() {
            return Ok(false);
        }
        self.relative(-1)
    }

    pub fn first(&mut self) -> Result<bool, StubDbError> {
        self.absolute(1)
    }

    pub fn last(&mut self) -> Result<bool, StubDbError> {
        self.absolute(-1)
    }

    /// Moves to row `row`; negative values count back from the fetch size.
    pub fn absolute(&mut self, row: i64) -> Result<bool, StubDbError> {
        let count = self.fetch_size as i64;
        let target = if row < 0 { count + 1 + row } else { row };
        self.move_to(target.max(0))
    }

    /// Moves `offset` rows from the current position.
    ///
    /// The target is clamped to before-first; it is never reinterpreted as
    /// counting from the end.
    pub fn relative(&mut self, offset: i64) -> Result<bool, StubDbError> {
        if offset == 0 {
            return Ok(self.is_on_row());
        }
        if offset < 0 {
            self.check_scrollable()?;
        }
        let target = (self.cursor as i64).saturating_add(offset).max(0);
        self.move_to(target)
    }

    pub fn before_first(&mut self) -> Result<(), StubDbError> {
        self.check_scrollable()?;
        self.cursor = 0;
        Ok(())
    }

    pub fn after_last(&mut self) -> Result<(), StubDbError> {
        self.check_scrollable()?;
        self.cursor = self.fetch_size + 1;
        Ok(())
    }

    /// Current 1-based row, `0` when not on a row.
    pub fn row(&self) -> usize {
        if self.is_on_row() {
            self.cursor
        } else {
            0
        }
    }

    pub fn is_before_first(&self) -> bool {
        self.cursor == 0
    }

    pub fn is_after_last(&self) -> bool {
        !self.rows.is_empty() && self.cursor > self.rows.len()
    }

    pub fn is_first(&self) -> bool {
        self.is_on_row() && self.cursor == 1
    }

    pub fn is_last(&self) -> bool {
        self.is_on_row() && self.cursor == self.fetch_size
    }

    fn is_on_row(&self) -> bool {
        self.cursor >= 1 && self.cursor <= self.rows.len()
    }

    fn check_scrollable(&self) -> Result<(), StubDbError> {
        if self.forward_only {
            return Err(StubDbError::ForwardOnly);
        }
        Ok(())
    }

    fn move_to(&mut self, target: i64) -> Result<bool, StubDbError> {
        let target = usize::try_from(target).unwrap_or(usize::MAX);
        if self.forward_only && target < self.cursor {
            return Err(StubDbError::ForwardOnly);
        }
        let bound = self.fetch_size;
        if target > bound {
            if self.cycling && bound > 0 {
                self.cursor = 1;
                return Ok(true);
            }
            self.cursor = bound + 1;
            return Ok(false);
        }
        self.cursor = target;
        Ok(target > 0)
    }

    /// Raw value of `column` in the current row.
    pub fn get_value(&mut self, column: impl ColumnIndex) -> Result<Value, StubDbError> {
        let index = column.resolve(&self.metadata)?;
        if !self.is_on_row() {
            return Err(StubDbError::NoCurrentRow);
        }
        let row = &self.rows[self.cursor - 1];
        let value = index
            .checked_sub(1)
            .and_then(|offset| row.get(offset))
            .cloned()
            .ok_or(StubDbError::InvalidColumnIndex {
                index,
                count: row.len(),
            })?;
        self.last_was_null = value.is_null();
        Ok(value)
    }

    /// Typed read through the coercion ladder; `None` for SQL NULL.
    pub fn get<T: FromValue>(&mut self, column: impl ColumnIndex) -> Result<Option<T>, StubDbError> {
        let value = self.get_value(column)?;
        if value.is_null() {
            return Ok(None);
        }
        let found = value.repr().name();
        T::from_value(coerce(&value, T::REPR)?)
            .map(Some)
            .ok_or(StubDbError::IncompatibleType {
                requested: T::REPR.name(),
                found,
            })
    }

    /// Reads `column` coerced to `target`.
    pub fn get_as(&mut self, column: impl ColumnIndex, target: Repr) -> Result<Value, StubDbError> {
        let value = self.get_value(column)?;
        coerce(&value, target)
    }

    /// Textual form of any value; `None` for SQL NULL.
    pub fn get_string(&mut self, column: impl ColumnIndex) -> Result<Option<String>, StubDbError> {
        Ok(match self.get_value(column)? {
            Value::Null => None,
            Value::Text(text) => Some(text),
            other => Some(other.to_string()),
        })
    }

    /// Boolean read: SQL NULL is `false`, non-boolean values are `false`
    /// only when their text starts with `'0'`.
    pub fn get_bool(&mut self, column: impl ColumnIndex) -> Result<bool, StubDbError> {
        Ok(match self.get_value(column)? {
            Value::Null => false,
            Value::Bool(value) => value,
            other => !other.to_string().starts_with('0'),
        })
    }

    /// Decimal read truncated toward zero to exactly `scale` digits.
    pub fn get_decimal_scaled(
        &mut self,
        column: impl ColumnIndex,
        scale: u32,
    ) -> Result<Option<Decimal>, StubDbError> {
        let value = self.get_value(column)?;
        let decimal = match &value {
            Value::Null => return Ok(None),
            Value::Decimal(decimal) => *decimal,
            other if other.repr().is_numeric() => {
                let text = other.to_string();
                Decimal::from_str(&text).map_err(|_| StubDbError::Conversion {
                    value: text,
                    target: Repr::Decimal.name(),
                })?
            }
            other => {
                return Err(StubDbError::IncompatibleType {
                    requested: Repr::Decimal.name(),
                    found: other.repr().name(),
                })
            }
        };
        let mut scaled = decimal.round_dp_with_strategy(scale, RoundingStrategy::ToZero);
        scaled.rescale(scale);
        Ok(Some(scaled))
    }

    /// Binary read as a fresh stream; `None` for SQL NULL.
    pub fn get_binary_stream(
        &mut self,
        column: impl ColumnIndex,
    ) -> Result<Option<Cursor<Vec<u8>>>, StubDbError> {
        match self.get_as(column, Repr::BinaryStream)? {
            Value::Null => Ok(None),
            Value::Bytes(bytes) => Ok(Some(Cursor::new(bytes))),
            Value::Blob(blob) => Ok(Some(blob.binary_stream())),
            other => Err(StubDbError::IncompatibleType {
                requested: Repr::BinaryStream.name(),
                found: other.repr().name(),
            }),
        }
    }

    /// Whether the last value read was SQL NULL.
    pub fn was_null(&self) -> bool {
        self.last_was_null
    }
}

/// Incremental [`RowList`] construction.
#[derive(Clone, Debug)]
pub struct RowListBuilder {
    metadata: RowListMetaData,
    rows: Vec<Vec<Value>>,
    cycling: bool,
    warning: Option<Warning>,
}

impl RowListBuilder {
    pub fn row<I, V>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
        self
    }

    pub fn cycling(mut self, cycling: bool) -> Self {
        self.cycling = cycling;
        self
    }

    pub fn warning(mut self, warning: impl Into<Warning>) -> Self {
        self.warning = Some(warning.into());
        self
    }

    pub fn build(self) -> RowList {
        RowList::from_parts(self.metadata, self.rows, None, self.warning, self.cycling)
    }
}
