use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::{ConnectionOptions, GeneratedKeys, PreparedStatement, Statement, StatementHandler};

/// Identifier of a statement registered on a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatementId(u64);

impl fmt::Display for StatementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub(crate) struct ConnectionInner {
    pub(crate) options: ConnectionOptions,
    pub(crate) handler: Arc<dyn StatementHandler>,
    next_id: AtomicU64,
    /// SQL text per live statement; `None` for plain statements.
    statements: Mutex<HashMap<StatementId, Option<String>>>,
}

impl ConnectionInner {
    pub(crate) fn register(self: &Arc<Self>, sql: Option<String>) -> StatementHandle {
        let id = StatementId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.statements().insert(id, sql);
        StatementHandle {
            connection: Arc::downgrade(self),
            id,
        }
    }

    /// Registry guard. A lock poisoned by a panicking holder is recovered.
    fn statements(&self) -> MutexGuard<'_, HashMap<StatementId, Option<String>>> {
        self.statements.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn unregister(&self, id: StatementId) {
        self.statements().remove(&id);
    }

    fn sql_of(&self, id: StatementId) -> Option<String> {
        self.statements().get(&id).cloned().flatten()
    }

    fn open_statements(&self) -> usize {
        self.statements().len()
    }
}

/// Fake connection: options, a statement handler and the live statements.
///
/// Cloning is cheap and every clone shares the same state.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("options", &self.inner.options)
            .field("open_statements", &self.inner.open_statements())
            .finish()
    }
}

impl Connection {
    pub fn new(options: ConnectionOptions, handler: impl StatementHandler + 'static) -> Self {
        Self::with_shared_handler(options, Arc::new(handler))
    }

    /// Creates a connection around a handler shared with other connections.
    pub fn with_shared_handler(
        options: ConnectionOptions,
        handler: Arc<dyn StatementHandler>,
    ) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                options,
                handler,
                next_id: AtomicU64::new(1),
                statements: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.inner.options
    }

    pub fn handler(&self) -> &Arc<dyn StatementHandler> {
        &self.inner.handler
    }

    /// Number of statements created on this connection and not yet dropped.
    pub fn open_statements(&self) -> usize {
        self.inner.open_statements()
    }

    pub fn create_statement(&self) -> Statement {
        Statement::new(Arc::clone(&self.inner))
    }

    pub fn prepare_statement(&self, sql: impl Into<String>) -> PreparedStatement {
        self.prepare_statement_with_keys(sql, GeneratedKeys::Default)
    }

    /// Prepares a statement whose generated keys are projected per `keys`.
    pub fn prepare_statement_with_keys(
        &self,
        sql: impl Into<String>,
        keys: GeneratedKeys,
    ) -> PreparedStatement {
        PreparedStatement::new(Arc::clone(&self.inner), sql.into(), keys)
    }
}

/// Non-owning reference from a row list to the statement that produced it.
///
/// Resolution goes through the connection's statement registry, so every
/// accessor returns `None` once the connection or the statement is gone.
#[derive(Clone)]
pub struct StatementHandle {
    connection: Weak<ConnectionInner>,
    id: StatementId,
}

impl fmt::Debug for StatementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementHandle")
            .field("id", &self.id)
            .field("live", &self.is_live())
            .finish()
    }
}

impl PartialEq for StatementHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.connection, &other.connection)
    }
}

impl StatementHandle {
    pub fn id(&self) -> StatementId {
        self.id
    }

    /// Whether the statement is still registered on a live connection.
    pub fn is_live(&self) -> bool {
        self.connection
            .upgrade()
            .is_some_and(|connection| connection.statements().contains_key(&self.id))
    }

    pub fn options(&self) -> Option<ConnectionOptions> {
        let connection = self.connection.upgrade()?;
        self.is_live().then(|| connection.options.clone())
    }

    /// SQL text of a prepared statement.
    pub fn sql(&self) -> Option<String> {
        self.connection
            .upgrade()
            .and_then(|connection| connection.sql_of(self.id))
    }

    pub(crate) fn release(&self) {
        if let Some(connection) = self.connection.upgrade() {
            connection.unregister(self.id);
        }
    }
}
