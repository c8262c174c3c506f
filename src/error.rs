use std::fmt;

/// Boxed error raised by handler callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum StubDbError {
    /// Malformed schema or invalid setup, detected at construction.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Parameter metadata read at a position that was never bound.
    #[error("parameter not set at position {position}")]
    NotBound { position: usize },
    /// Parameter position outside the bound sequence.
    #[error("parameter position {position} out of bounds")]
    OutOfBounds { position: usize },
    /// Column label not present in the row list.
    #[error("unknown column label '{label}' in {known:?}")]
    UnknownColumn { label: String, known: Vec<String> },
    /// Column index outside `1..=count`.
    #[error("invalid column index {index} (column count: {count})")]
    InvalidColumnIndex { index: usize, count: usize },
    /// Read attempted while the cursor is not on a row.
    #[error("no rows fetched yet")]
    NoCurrentRow,
    /// Backward move on a forward-only row list.
    #[error("backward move on forward only cursor")]
    ForwardOnly,
    /// Coercion ladder exhausted.
    #[error("incompatible type: cannot read {found} as {requested}")]
    IncompatibleType {
        requested: &'static str,
        found: &'static str,
    },
    /// Numeric value that cannot be represented in the requested shape.
    #[error("cannot convert '{value}' to {target}")]
    Conversion { value: String, target: &'static str },
    /// Statement executed while a lower parameter position is unset.
    #[error("missing parameter value at position {position}")]
    MissingParameter { position: usize },
    /// No delegate installed for the requested kind of statement.
    #[error("no {kind} handler installed{}", sql_suffix(.sql))]
    NoHandlerInstalled {
        kind: StatementKind,
        sql: Option<String>,
    },
    /// Query executed as an update, or update executed as a query.
    #[error("statement kind mismatch: expected {expected}: {sql}")]
    StatementKindMismatch { expected: StatementKind, sql: String },
    /// Non-driver error raised by a handler callback.
    #[error("execution error: {message}")]
    Execution {
        message: String,
        #[source]
        source: BoxError,
    },
    /// Batch execution failure.
    #[error(transparent)]
    Batch(#[from] BatchError),
    /// Fixture decoding or shape validation error.
    #[error("decode error: {0}")]
    Decode(String),
}

impl StubDbError {
    /// Lifts a handler error: driver errors pass through, anything else is
    /// wrapped into [`StubDbError::Execution`].
    pub(crate) fn from_handler(err: BoxError) -> Self {
        match err.downcast::<StubDbError>() {
            Ok(err) => *err,
            Err(other) => StubDbError::Execution {
                message: other.to_string(),
                source: other,
            },
        }
    }
}

fn sql_suffix(sql: &Option<String>) -> String {
    sql.as_deref()
        .map(|sql| format!(": {sql}"))
        .unwrap_or_default()
}

/// Kind of statement, as decided by the handler's classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Query,
    Update,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::Query => f.write_str("query"),
            StatementKind::Update => f.write_str("update"),
        }
    }
}

/// Aggregate batch failure.
///
/// `update_counts` always has one slot per batch entry; `None` marks an
/// entry that failed or was never attempted.
#[derive(Debug)]
pub struct BatchError {
    pub message: String,
    pub update_counts: Vec<Option<u64>>,
    /// Individual failures, in occurrence order.
    pub failures: Vec<StubDbError>,
}

impl BatchError {
    pub(crate) fn new(update_counts: Vec<Option<u64>>, failures: Vec<StubDbError>) -> Self {
        let message = failures
            .first()
            .map(|err| err.to_string())
            .unwrap_or_default();
        Self {
            message,
            update_counts,
            failures,
        }
    }

    /// Iterates the chained failures, first to last.
    pub fn chain(&self) -> impl Iterator<Item = &StubDbError> {
        self.failures.iter()
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch execution failed: {}", self.message)
    }
}

impl std::error::Error for BatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures
            .first()
            .map(|err| err as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use crate::{BatchError, StatementKind, StubDbError};

    #[derive(Debug)]
    struct Foreign;

    impl std::fmt::Display for Foreign {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("foreign failure")
        }
    }

    impl std::error::Error for Foreign {}

    #[test]
    fn handler_driver_error_passes_through() {
        let err = StubDbError::from_handler(Box::new(StubDbError::NoCurrentRow));
        assert!(matches!(err, StubDbError::NoCurrentRow));
    }

    #[test]
    fn handler_foreign_error_is_wrapped() {
        let err = StubDbError::from_handler(Box::new(Foreign));
        match err {
            StubDbError::Execution { message, source } => {
                assert_eq!(message, "foreign failure");
                assert!(source.downcast_ref::<Foreign>().is_some());
            }
            other => panic!("expected execution error, got {other:?}"),
        }
    }

    #[test]
    fn no_handler_message_names_sql() {
        let err = StubDbError::NoHandlerInstalled {
            kind: StatementKind::Update,
            sql: Some("DELETE FROM t".to_owned()),
        };
        assert_eq!(err.to_string(), "no update handler installed: DELETE FROM t");

        let err = StubDbError::NoHandlerInstalled {
            kind: StatementKind::Query,
            sql: None,
        };
        assert_eq!(err.to_string(), "no query handler installed");
    }

    #[test]
    fn batch_error_source_is_first_failure() {
        let err = BatchError::new(
            vec![Some(1), None],
            vec![StubDbError::Decode("boom".to_owned())],
        );
        assert_eq!(err.message, "decode error: boom");
        assert_eq!(err.chain().count(), 1);
        let source = std::error::Error::source(&err).expect("must chain first failure");
        assert_eq!(source.to_string(), "decode error: boom");
    }
}
