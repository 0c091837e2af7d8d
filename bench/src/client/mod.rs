//! Database client seam: a [`Backend`] opens [`Session`]s, a session runs
//! parameterized statements against the `users` table.
//!
//! Two implementations are provided:
//! - [`postgres::PostgresBackend`] — a PostgreSQL server via the `postgres` driver
//! - [`sqlite::SqliteBackend`] — an embedded SQLite database file
//!
//! Statements use `$1, $2, ...` placeholders, which both drivers bind
//! positionally. Values are always bound, never spliced into SQL text.

pub mod postgres;
pub mod sqlite;

use std::io::Read;
use users_core::{BackendKind, DbConfig, DbError, NewUser, User};

/// A bound statement parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param<'a> {
    Int(i64),
    Text(&'a str),
}

/// One open connection. Dropping a session releases it; [`Session::close`]
/// does so explicitly and reports any error.
pub trait Session {
    fn kind(&self) -> BackendKind;

    /// Run a statement and return the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[Param<'_>]) -> Result<u64, DbError>;

    /// Run several statements without parameters (DDL).
    fn batch_execute(&mut self, sql: &str) -> Result<(), DbError>;

    /// Run a query whose columns are `(id, name, email)`.
    fn fetch_all(&mut self, sql: &str, params: &[Param<'_>]) -> Result<Vec<User>, DbError>;

    fn fetch_one(&mut self, sql: &str, params: &[Param<'_>]) -> Result<Option<User>, DbError> {
        Ok(self.fetch_all(sql, params)?.into_iter().next())
    }

    /// Run a query returning a single integer in the first column of the first row.
    fn fetch_scalar(&mut self, sql: &str, params: &[Param<'_>]) -> Result<i64, DbError>;

    fn begin(&mut self) -> Result<(), DbError>;
    fn commit(&mut self) -> Result<(), DbError>;
    fn rollback(&mut self) -> Result<(), DbError>;

    /// Insert every row from `rows` as one bulk operation.
    fn bulk_insert(&mut self, rows: &mut dyn Iterator<Item = NewUser>) -> Result<u64, DbError>;

    /// Stream a CSV document with an `id,name,email` header into `users`.
    fn copy_csv(&mut self, _reader: &mut dyn Read) -> Result<u64, DbError> {
        Err(DbError::Unsupported {
            operation: "csv import",
            backend: self.kind().as_str(),
        })
    }

    fn close(self: Box<Self>) -> Result<(), DbError>;
}

/// Opens sessions against one configured database.
pub trait Backend {
    fn kind(&self) -> BackendKind;

    fn connect(&self) -> Result<Box<dyn Session>, DbError>;
}

/// Build the backend selected by `config.backend`.
pub fn open_backend(config: &DbConfig) -> Result<Box<dyn Backend>, DbError> {
    match config.backend {
        BackendKind::Postgres => Ok(Box::new(postgres::PostgresBackend::new(config))),
        BackendKind::Sqlite => Ok(Box::new(sqlite::SqliteBackend::new(&config.sqlite_path))),
    }
}

/// Connect, run `f`, and close the session on every exit path.
///
/// If `f` fails, its error wins over a failure to close.
pub fn with_session<T, F>(backend: &dyn Backend, f: F) -> Result<T, DbError>
where
    F: FnOnce(&mut dyn Session) -> Result<T, DbError>,
{
    let mut session = backend.connect()?;
    let result = f(session.as_mut());
    let closed = session.close();

    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_err)) => Err(close_err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            log::warn!("Failed to close session after error: {close_err}");
            Err(err)
        }
    }
}

/// Like [`with_session`], with `f` wrapped in a transaction.
///
/// Commits when `f` succeeds. Otherwise rolls back and returns `f`'s error.
pub fn with_transaction<T, F>(backend: &dyn Backend, f: F) -> Result<T, DbError>
where
    F: FnOnce(&mut dyn Session) -> Result<T, DbError>,
{
    with_session(backend, |session| {
        session.begin()?;
        match f(&mut *session) {
            Ok(value) => {
                session.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = session.rollback() {
                    log::warn!("Rollback failed: {rollback_err}");
                }
                Err(err)
            }
        }
    })
}
