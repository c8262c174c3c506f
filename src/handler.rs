use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::{BoxError, Parameter, QueryResult, StatementKind, StubDbError, UpdateResult};

/// Result returned by handler callbacks.
pub type HandlerResult<T> = std::result::Result<T, BoxError>;

pub type QueryCallback = Arc<dyn Fn(&str, &[Parameter]) -> HandlerResult<QueryResult> + Send + Sync>;
pub type UpdateCallback =
    Arc<dyn Fn(&str, &[Parameter]) -> HandlerResult<UpdateResult> + Send + Sync>;

/// Decides how statements are classified and answered.
pub trait StatementHandler: Send + Sync {
    /// Whether `sql` is a query (produces rows) rather than an update.
    fn is_query(&self, sql: &str) -> bool;

    fn when_query(&self, sql: &str, parameters: &[Parameter]) -> HandlerResult<QueryResult>;

    fn when_update(&self, sql: &str, parameters: &[Parameter]) -> HandlerResult<UpdateResult>;
}

/// Handler assembled from a query detection list and two optional callbacks.
///
/// Every `with_*` method returns a new handler; the receiver is left as is.
#[derive(Clone, Default)]
pub struct CompositeHandler {
    query_detection: Vec<Regex>,
    query_handler: Option<QueryCallback>,
    update_handler: Option<UpdateCallback>,
}

impl fmt::Debug for CompositeHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let patterns: Vec<&str> = self.query_detection.iter().map(Regex::as_str).collect();
        f.debug_struct("CompositeHandler")
            .field("query_detection", &patterns)
            .field("query_handler", &self.query_handler.is_some())
            .field("update_handler", &self.update_handler.is_some())
            .finish()
    }
}

impl CompositeHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query_handler<F>(&self, handler: F) -> Self
    where
        F: Fn(&str, &[Parameter]) -> HandlerResult<QueryResult> + Send + Sync + 'static,
    {
        Self {
            query_handler: Some(Arc::new(handler)),
            ..self.clone()
        }
    }

    pub fn with_update_handler<F>(&self, handler: F) -> Self
    where
        F: Fn(&str, &[Parameter]) -> HandlerResult<UpdateResult> + Send + Sync + 'static,
    {
        Self {
            update_handler: Some(Arc::new(handler)),
            ..self.clone()
        }
    }

    /// Appends query detection patterns, matched at the start of the SQL.
    pub fn with_query_detection<I, S>(&self, patterns: I) -> Result<Self, StubDbError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut query_detection = self.query_detection.clone();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let regex = Regex::new(&format!("^(?:{pattern})")).map_err(|err| {
                StubDbError::Configuration(format!("invalid query pattern '{pattern}': {err}"))
            })?;
            query_detection.push(regex);
        }
        Ok(Self {
            query_detection,
            ..self.clone()
        })
    }

    pub fn query_detection(&self) -> impl Iterator<Item = &str> {
        self.query_detection.iter().map(Regex::as_str)
    }
}

impl StatementHandler for CompositeHandler {
    fn is_query(&self, sql: &str) -> bool {
        self.query_detection.iter().any(|regex| regex.is_match(sql))
    }

    fn when_query(&self, sql: &str, parameters: &[Parameter]) -> HandlerResult<QueryResult> {
        let handler = self
            .query_handler
            .as_ref()
            .ok_or(StubDbError::NoHandlerInstalled {
                kind: StatementKind::Query,
                sql: None,
            })?;
        handler(sql, parameters)
    }

    fn when_update(&self, sql: &str, parameters: &[Parameter]) -> HandlerResult<UpdateResult> {
        let handler = self.update_handler.as_ref().ok_or_else(|| {
            StubDbError::NoHandlerInstalled {
                kind: StatementKind::Update,
                sql: Some(sql.to_owned()),
            }
        })?;
        handler(sql, parameters)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        CompositeHandler, Parameter, ParameterDef, QueryResult, StatementHandler, StatementKind,
        StubDbError, UpdateResult,
    };

    fn into_stub(err: crate::BoxError) -> StubDbError {
        *err.downcast::<StubDbError>().expect("must be a driver error")
    }

    #[test]
    fn empty_detection_classifies_everything_as_update() {
        let handler = CompositeHandler::new();
        assert!(!handler.is_query("SELECT * FROM t"));
        assert!(!handler.is_query(""));
    }

    #[test]
    fn detection_matches_at_start() {
        let handler = CompositeHandler::new()
            .with_query_detection(["SELECT ", "EXEC that_proc"])
            .expect("must compile");
        assert!(handler.is_query("SELECT * FROM t"));
        assert!(handler.is_query("EXEC that_proc 1"));
        assert!(!handler.is_query("  SELECT 1"));
        assert!(!handler.is_query("INSERT INTO t SELECT 1"));
    }

    #[test]
    fn detection_is_append_only() {
        let base = CompositeHandler::new()
            .with_query_detection(["SELECT"])
            .expect("must compile");
        let extended = base.with_query_detection(["WITH"]).expect("must compile");
        assert_eq!(base.query_detection().count(), 1);
        assert_eq!(extended.query_detection().count(), 2);
        assert!(extended.is_query("SELECT 1") && extended.is_query("WITH x AS (..)"));
    }

    #[test]
    fn invalid_pattern_is_configuration_error() {
        let err = CompositeHandler::new()
            .with_query_detection(["SELECT ("])
            .expect_err("must fail");
        assert!(matches!(err, StubDbError::Configuration(_)));
    }

    #[test]
    fn missing_delegates_fail() {
        let handler = CompositeHandler::new();
        let err = into_stub(handler.when_query("SELECT 1", &[]).expect_err("must fail"));
        assert!(matches!(
            err,
            StubDbError::NoHandlerInstalled {
                kind: StatementKind::Query,
                sql: None
            }
        ));

        let err = into_stub(handler.when_update("DELETE FROM t", &[]).expect_err("must fail"));
        assert_eq!(err.to_string(), "no update handler installed: DELETE FROM t");
    }

    #[test]
    fn delegates_receive_sql_and_parameters() {
        let handler = CompositeHandler::new()
            .with_query_handler(|_, _| Ok(QueryResult::empty()))
            .with_update_handler(|sql, parameters| {
                assert_eq!(sql, "UPDATE t SET a = ?");
                Ok(UpdateResult::new(parameters.len() as u64))
            });

        let parameters = [Parameter::new(ParameterDef::int(), 5)];
        let result = handler
            .when_update("UPDATE t SET a = ?", &parameters)
            .expect("must update");
        assert_eq!(result.count, 1);
        assert!(handler.when_query("SELECT 1", &[]).is_ok());
    }
}
