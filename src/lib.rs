//! `stubdb` is an in-memory fake of a relational database driver.
//!
//! Code written against rows, columns and statements runs its whole read and
//! write path in tests, answered by a [`StatementHandler`] instead of a live
//! database:
//! - [`Connection::prepare_statement`] / [`Connection::create_statement`]
//! - [`CompositeHandler`] classifying SQL and answering queries and updates
//! - [`RowList`], a cursor-navigable result container with typed reads

mod array;
mod coerce;
mod connection;
mod decode;
mod error;
mod handler;
mod metadata;
mod options;
mod params;
mod registry;
mod row_list;
mod sql_type;
mod statement;
mod types;
mod value;
mod wire;

pub use array::SqlArray;
pub use coerce::{coerce, FromValue};
pub use connection::{Connection, StatementHandle, StatementId};
pub use error::{BatchError, BoxError, StatementKind, StubDbError};
pub use handler::{CompositeHandler, HandlerResult, QueryCallback, StatementHandler, UpdateCallback};
pub use metadata::{Column, RowListMetaData};
pub use options::{ConnectionOptions, BATCH_CONTINUE_ON_ERROR, INIT_ON_FIRST_ROW};
pub use params::{Nullability, Parameter, ParameterDef, ParameterMetaData, ParameterMode};
pub use registry::{TypeInfo, TypeRegistry};
pub use row_list::{ColumnIndex, RowList, RowListBuilder};
pub use sql_type::{Repr, SqlType};
pub use statement::{GeneratedKeys, PreparedStatement, Statement};
pub use types::{ExecutionResult, QueryResult, UpdateResult, Warning};
pub use value::{Blob, Value, ValueKind};

pub type Result<T> = std::result::Result<T, StubDbError>;
