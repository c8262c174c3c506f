use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use anyhow::anyhow;
use stubdb::{
    Column, CompositeHandler, Connection, ConnectionOptions, ExecutionResult, GeneratedKeys,
    Parameter, QueryResult, Repr, RowList, StatementKind, StubDbError, UpdateResult, Value,
};

/// Counts handler calls and records the SQL each one received.
#[derive(Clone, Default)]
struct Recorder {
    hits: Arc<AtomicUsize>,
    statements: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    fn record(&self, sql: &str) {
        self.hits.fetch_add(1, Ordering::SeqCst);
        self.statements
            .lock()
            .expect("statement log mutex must not be poisoned")
            .push(sql.to_owned());
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

fn users() -> RowList {
    RowList::builder(vec![
        Column::new(Repr::Long, "id"),
        Column::new(Repr::Text, "name").nullable(true),
    ])
    .row([Value::Long(1), Value::text("Kit")])
    .row([Value::Long(2), Value::Null])
    .build()
}

fn keys() -> RowList {
    RowList::builder(vec![
        Column::new(Repr::Long, "id"),
        Column::new(Repr::Text, "tenant"),
    ])
    .row([Value::Long(42), Value::text("acme")])
    .build()
}

/// Queries return [`users`]; updates fail when the first parameter is `2`.
fn handler(recorder: &Recorder) -> CompositeHandler {
    let on_query = recorder.clone();
    let on_update = recorder.clone();
    CompositeHandler::new()
        .with_query_detection(["SELECT ", "WITH "])
        .expect("patterns must compile")
        .with_query_handler(move |sql, _| {
            on_query.record(sql);
            Ok(QueryResult::new(users()).with_warning("served from fixture"))
        })
        .with_update_handler(move |sql, parameters: &[Parameter]| {
            on_update.record(sql);
            if parameters.first().map(|p| &p.value) == Some(&Value::Int(2)) {
                return Err(anyhow!("constraint violated").into());
            }
            if sql.starts_with("INSERT") {
                return Ok(UpdateResult::one().with_generated_keys(keys()));
            }
            Ok(UpdateResult::new(parameters.len() as u64))
        })
}

fn connect(recorder: &Recorder, options: ConnectionOptions) -> Connection {
    Connection::new(options, handler(recorder))
}

#[test]
fn query_returns_rows_bound_to_statement() {
    let recorder = Recorder::default();
    let connection = connect(&recorder, ConnectionOptions::default().with_init_on_first_row(true));
    let mut statement = connection.prepare_statement("SELECT id, name FROM users WHERE id > ?");
    statement.set_long(1, 0).expect("must bind");

    let mut rows = statement.execute_query().expect("query must succeed");

    assert_eq!(recorder.hits(), 1);
    assert_eq!(rows.row(), 1);
    assert_eq!(rows.get::<i64>("id").expect("must read"), Some(1));
    assert_eq!(rows.warning().map(|w| w.reason.as_str()), Some("served from fixture"));
    let handle = rows.statement().expect("must carry the statement");
    assert_eq!(handle.sql().as_deref(), Some("SELECT id, name FROM users WHERE id > ?"));
    assert_eq!(handle.id(), statement.handle().id());

    assert_eq!(statement.update_count(), None);
    assert_eq!(statement.result_set().map(RowList::row_count), Some(2));
    assert_eq!(statement.generated_keys().map(RowList::row_count), Some(0));
    assert!(statement.warning().is_some());
}

#[test]
fn result_set_keeps_its_own_cursor() {
    let recorder = Recorder::default();
    let connection = connect(&recorder, ConnectionOptions::default());
    let mut statement = connection.create_statement();

    let mut rows = statement.execute_query("SELECT * FROM users").expect("query must succeed");
    assert!(rows.last().expect("must move"));
    assert_eq!(rows.row(), 2);

    let kept = statement.result_set().expect("must keep the rows");
    assert!(kept.is_before_first());
    assert_eq!(kept, &rows);
    assert_eq!(kept.rows(), rows.rows());
}

#[test]
fn cursor_stays_before_first_without_option() {
    let recorder = Recorder::default();
    let connection = connect(&recorder, ConnectionOptions::default());
    let mut statement = connection.create_statement();

    let rows = statement.execute_query("SELECT * FROM users").expect("query must succeed");
    assert!(rows.is_before_first());
}

#[test]
fn lowest_gap_fails_before_any_handler_call() {
    let recorder = Recorder::default();
    let connection = connect(&recorder, ConnectionOptions::default());
    let mut statement = connection.prepare_statement("UPDATE users SET name = ? WHERE id = ?");
    statement.set_int(3, 1).expect("must bind");
    statement.set_string(2, "Kit").expect("must bind");

    let err = statement.execute_update().expect_err("must fail");

    assert!(matches!(err, StubDbError::MissingParameter { position: 1 }));
    assert_eq!(recorder.hits(), 0);
}

#[test]
fn kind_mismatch_skips_handler() {
    let recorder = Recorder::default();
    let connection = connect(&recorder, ConnectionOptions::default());

    let mut query = connection.prepare_statement("SELECT 1");
    let err = query.execute_update().expect_err("must fail");
    assert!(matches!(
        err,
        StubDbError::StatementKindMismatch {
            expected: StatementKind::Update,
            ..
        }
    ));

    let mut update = connection.create_statement();
    let err = update
        .execute_query("DELETE FROM users")
        .expect_err("must fail");
    assert!(matches!(
        err,
        StubDbError::StatementKindMismatch {
            expected: StatementKind::Query,
            ..
        }
    ));
    assert_eq!(recorder.hits(), 0);
}

#[test]
fn execute_dispatches_on_classification() {
    let recorder = Recorder::default();
    let connection = connect(&recorder, ConnectionOptions::default());
    let mut statement = connection.create_statement();

    assert!(statement.execute("WITH x AS (SELECT 1) SELECT * FROM x").expect("must run"));
    assert!(statement.result_set().is_some());

    assert!(!statement.execute("DELETE FROM users").expect("must run"));
    assert_eq!(statement.update_count(), Some(0));
    assert!(statement.result_set().is_none());
    assert_eq!(recorder.hits(), 2);
}

#[test]
fn generated_keys_are_projected() {
    let recorder = Recorder::default();
    let connection = connect(&recorder, ConnectionOptions::default());

    let mut by_name = connection.prepare_statement_with_keys(
        "INSERT INTO users(name) VALUES (?)",
        GeneratedKeys::ColumnNames(vec!["tenant".to_owned(), "id".to_owned()]),
    );
    by_name.set_string(1, "Kit").expect("must bind");
    assert_eq!(by_name.execute_update().expect("must insert"), 1);
    let mut keys = by_name.generated_keys().cloned().expect("must expose keys");
    assert_eq!(keys.metadata().labels(), ["tenant", "id"]);
    assert!(keys.next().expect("must move"));
    assert_eq!(keys.get_string(1).expect("must read").as_deref(), Some("acme"));
    assert!(keys.statement().is_some());

    let mut by_index = connection.create_statement();
    by_index
        .execute_update_with_keys(
            "INSERT INTO users(name) VALUES ('Bob')",
            GeneratedKeys::ColumnIndexes(vec![1]),
        )
        .expect("must insert");
    let keys = by_index.generated_keys().expect("must expose keys");
    assert_eq!(keys.metadata().labels(), ["id"]);

    let mut unknown = connection.prepare_statement_with_keys(
        "INSERT INTO users(name) VALUES (?)",
        GeneratedKeys::ColumnNames(vec!["uuid".to_owned()]),
    );
    unknown.set_string(1, "Kit").expect("must bind");
    assert!(matches!(
        unknown.execute_update(),
        Err(StubDbError::UnknownColumn { .. })
    ));
}

#[test]
fn keys_default_to_empty_list() {
    let recorder = Recorder::default();
    let connection = connect(&recorder, ConnectionOptions::default());
    let mut statement = connection.prepare_statement_with_keys(
        "UPDATE users SET name = ?",
        GeneratedKeys::ColumnNames(vec!["id".to_owned()]),
    );
    statement.set_string(1, "Kit").expect("must bind");

    assert_eq!(statement.execute_update().expect("must update"), 1);
    let keys = statement.generated_keys().expect("must expose keys");
    assert_eq!(keys.row_count(), 0);
    assert!(keys.statement().is_some());
}

#[test]
fn foreign_handler_error_is_wrapped() {
    let recorder = Recorder::default();
    let connection = connect(&recorder, ConnectionOptions::default());
    let mut statement = connection.prepare_statement("UPDATE users SET id = ?");
    statement.set_int(1, 2).expect("must bind");

    let err = statement.execute_update().expect_err("must fail");

    match err {
        StubDbError::Execution { message, .. } => assert_eq!(message, "constraint violated"),
        other => panic!("expected execution error, got {other:?}"),
    }
}

#[test]
fn driver_error_from_handler_passes_through() {
    let handler = CompositeHandler::new().with_update_handler(|_, _| {
        Err(StubDbError::Configuration("read-only fixture".to_owned()).into())
    });
    let connection = Connection::new(ConnectionOptions::default(), handler);
    let mut statement = connection.create_statement();

    let err = statement
        .execute_update("DELETE FROM users")
        .expect_err("must fail");
    assert!(matches!(err, StubDbError::Configuration(ref m) if m == "read-only fixture"));
}

#[test]
fn missing_query_handler_is_reported() {
    let handler = CompositeHandler::new()
        .with_query_detection(["SELECT"])
        .expect("patterns must compile");
    let connection = Connection::new(ConnectionOptions::default(), handler);
    let mut statement = connection.create_statement();

    let err = statement.execute_query("SELECT 1").expect_err("must fail");
    assert_eq!(err.to_string(), "no query handler installed");
}

fn batch_of_three(connection: &Connection) -> stubdb::PreparedStatement {
    let mut statement = connection.prepare_statement("UPDATE users SET flag = ?");
    for value in 1..=3 {
        statement.set_int(1, value).expect("must bind");
        statement.add_batch();
    }
    statement
}

#[test]
fn batch_fails_fast_by_default() {
    let recorder = Recorder::default();
    let connection = connect(&recorder, ConnectionOptions::default());
    let mut statement = batch_of_three(&connection);

    let err = statement.execute_batch().expect_err("must fail");

    let StubDbError::Batch(batch) = err else {
        panic!("expected batch error, got {err:?}");
    };
    assert_eq!(batch.update_counts, vec![Some(1), None, None]);
    assert_eq!(batch.chain().count(), 1);
    assert_eq!(batch.message, "execution error: constraint violated");
    assert_eq!(recorder.hits(), 2);
    assert_eq!(statement.batch_len(), 3);
}

#[test]
fn batch_continues_on_error_when_enabled() {
    let recorder = Recorder::default();
    let connection = connect(
        &recorder,
        ConnectionOptions::default().with_batch_continue_on_error(true),
    );
    let mut statement = batch_of_three(&connection);

    let err = statement.execute_batch().expect_err("must fail");

    let StubDbError::Batch(batch) = err else {
        panic!("expected batch error, got {err:?}");
    };
    assert_eq!(batch.update_counts, vec![Some(1), None, Some(1)]);
    assert_eq!(batch.failures.len(), 1);
    assert!(matches!(batch.failures[0], StubDbError::Execution { .. }));
    assert_eq!(recorder.hits(), 3);
}

#[test]
fn batch_entries_keep_their_own_parameters() {
    let recorder = Recorder::default();
    let connection = connect(
        &recorder,
        ConnectionOptions::default().with_batch_continue_on_error(true),
    );
    let mut statement = connection.prepare_statement("UPDATE users SET a = ?, b = ?");
    statement.set_int(2, 5).expect("must bind");
    statement.add_batch();
    statement.set_int(1, 7).expect("must bind");
    statement.add_batch();

    let err = statement.execute_batch().expect_err("must fail");

    let StubDbError::Batch(batch) = err else {
        panic!("expected batch error, got {err:?}");
    };
    assert_eq!(batch.update_counts, vec![None, Some(2)]);
    assert!(matches!(
        batch.failures[0],
        StubDbError::MissingParameter { position: 1 }
    ));
    assert_eq!(recorder.hits(), 1);
}

#[test]
fn plain_statement_batch() {
    let recorder = Recorder::default();
    let connection = connect(
        &recorder,
        ConnectionOptions::default().with_batch_continue_on_error(true),
    );
    let mut statement = connection.create_statement();
    statement.add_batch("DELETE FROM users");
    statement.add_batch("SELECT * FROM users");
    statement.add_batch("UPDATE users SET name = 'x'");

    let err = statement.execute_batch().expect_err("must fail");
    let StubDbError::Batch(batch) = err else {
        panic!("expected batch error, got {err:?}");
    };
    assert_eq!(batch.update_counts, vec![Some(0), None, Some(0)]);
    assert!(matches!(
        batch.failures[0],
        StubDbError::StatementKindMismatch { .. }
    ));

    statement.clear_batch();
    assert_eq!(statement.execute_batch().expect("empty batch must succeed"), vec![]);
}

#[test]
fn successful_batch_returns_counts() {
    let recorder = Recorder::default();
    let connection = connect(&recorder, ConnectionOptions::default());
    let mut statement = connection.prepare_statement("UPDATE users SET flag = ?");
    statement.set_int(1, 10).expect("must bind");
    statement.add_batch();
    statement.set_int(1, 11).expect("must bind");
    statement.add_batch();

    assert_eq!(
        statement.execute_batch().expect("batch must succeed"),
        vec![Some(1), Some(1)]
    );
    assert_eq!(
        recorder
            .statements
            .lock()
            .expect("statement log mutex must not be poisoned")
            .len(),
        2
    );
}
