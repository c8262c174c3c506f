use std::fmt;
use std::hash::{Hash, Hasher};

use crate::RowList;

/// Non-fatal condition attached to a result.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Warning {
    pub reason: String,
    pub sql_state: Option<String>,
}

impl Warning {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            sql_state: None,
        }
    }

    pub fn with_sql_state(mut self, sql_state: impl Into<String>) -> Self {
        self.sql_state = Some(sql_state.into());
        self
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sql_state {
            Some(state) => write!(f, "{} (SQLSTATE {state})", self.reason),
            None => f.write_str(&self.reason),
        }
    }
}

impl From<&str> for Warning {
    fn from(reason: &str) -> Self {
        Self::new(reason)
    }
}

impl From<String> for Warning {
    fn from(reason: String) -> Self {
        Self::new(reason)
    }
}

/// Common surface of query and update results.
pub trait ExecutionResult: Sized {
    fn warning(&self) -> Option<&Warning>;

    /// Copy of this result carrying `warning`.
    fn with_warning(self, warning: impl Into<Warning>) -> Self;
}

/// Rows returned by a query handler.
///
/// Two results are equal when their row lists share a schema.
#[derive(Clone, Debug)]
pub struct QueryResult {
    pub row_list: RowList,
    pub warning: Option<Warning>,
}

impl QueryResult {
    pub fn new(row_list: RowList) -> Self {
        Self {
            row_list,
            warning: None,
        }
    }

    /// Zero rows, no columns, no warning.
    pub fn empty() -> Self {
        Self::new(RowList::empty())
    }
}

impl PartialEq for QueryResult {
    fn eq(&self, other: &Self) -> bool {
        self.row_list == other.row_list
    }
}

impl Eq for QueryResult {}

impl Hash for QueryResult {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.row_list.hash(state);
    }
}

impl From<RowList> for QueryResult {
    fn from(row_list: RowList) -> Self {
        Self::new(row_list)
    }
}

impl ExecutionResult for QueryResult {
    fn warning(&self) -> Option<&Warning> {
        self.warning.as_ref()
    }

    fn with_warning(self, warning: impl Into<Warning>) -> Self {
        Self {
            warning: Some(warning.into()),
            ..self
        }
    }
}

/// Outcome of an update handler.
///
/// Equality looks at the returned row list only, like [`QueryResult`].
#[derive(Clone, Debug)]
pub struct UpdateResult {
    pub count: u64,
    pub row_list: Option<RowList>,
    pub generated_keys: Option<RowList>,
    pub warning: Option<Warning>,
}

impl UpdateResult {
    pub fn new(count: u64) -> Self {
        Self {
            count,
            row_list: None,
            generated_keys: None,
            warning: None,
        }
    }

    /// No row affected.
    pub fn nothing() -> Self {
        Self::new(0)
    }

    /// Exactly one row affected.
    pub fn one() -> Self {
        Self::new(1)
    }

    pub fn with_generated_keys(self, keys: RowList) -> Self {
        Self {
            generated_keys: Some(keys),
            ..self
        }
    }

    pub fn with_row_list(self, row_list: RowList) -> Self {
        Self {
            row_list: Some(row_list),
            ..self
        }
    }
}

impl PartialEq for UpdateResult {
    fn eq(&self, other: &Self) -> bool {
        self.row_list == other.row_list
    }
}

impl Eq for UpdateResult {}

impl Hash for UpdateResult {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.row_list.hash(state);
    }
}

impl ExecutionResult for UpdateResult {
    fn warning(&self) -> Option<&Warning> {
        self.warning.as_ref()
    }

    fn with_warning(self, warning: impl Into<Warning>) -> Self {
        Self {
            warning: Some(warning.into()),
            ..self
        }
    }
}
