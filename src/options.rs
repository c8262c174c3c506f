use std::collections::HashMap;

/// Property enabling cursor placement on row 1 for statement-owned row lists.
pub const INIT_ON_FIRST_ROW: &str = "stubdb.resultSet.initOnFirstRow";
/// Property enabling continue-on-error batch execution.
pub const BATCH_CONTINUE_ON_ERROR: &str = "stubdb.batch.continueOnError";

/// Configures connection-wide statement behavior.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConnectionOptions {
    /// Place the cursor of non-empty statement results on their first row.
    pub init_on_first_row: bool,
    /// Attempt every batch entry instead of stopping at the first failure.
    pub batch_continue_on_error: bool,
}

impl ConnectionOptions {
    /// Reads options from string properties.
    ///
    /// Only [`INIT_ON_FIRST_ROW`] and [`BATCH_CONTINUE_ON_ERROR`] are
    /// recognised, and only the exact value `"true"` enables them.
    pub fn from_properties(properties: &HashMap<String, String>) -> Self {
        let enabled = |key: &str| properties.get(key).is_some_and(|value| value == "true");
        Self {
            init_on_first_row: enabled(INIT_ON_FIRST_ROW),
            batch_continue_on_error: enabled(BATCH_CONTINUE_ON_ERROR),
        }
    }

    pub fn with_init_on_first_row(mut self, enabled: bool) -> Self {
        self.init_on_first_row = enabled;
        self
    }

    pub fn with_batch_continue_on_error(mut self, enabled: bool) -> Self {
        self.batch_continue_on_error = enabled;
        self
    }
}
