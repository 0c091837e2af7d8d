//! Embedded SQLite session, used for offline runs and the test suite.

use super::{Backend, Param, Session};
use rusqlite::types::ToSqlOutput;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, ToSql};
use std::path::{Path, PathBuf};
use std::time::Duration;
use users_core::{BackendKind, DbError, NewUser, User};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqliteBackend {
    path: PathBuf,
}

impl SqliteBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Backend for SqliteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn connect(&self) -> Result<Box<dyn Session>, DbError> {
        log::debug!("Opening SQLite database {}", self.path.display());
        let conn = Connection::open(&self.path)
            .map_err(|err| DbError::Connection(format!("{}: {err}", self.path.display())))?;
        configure_connection(&conn).map_err(|err| DbError::Connection(err.to_string()))?;
        Ok(Box::new(SqliteSession { conn }))
    }
}

/// Configure a connection for benchmark throughput on a local file.
///
/// `LIKE` is made case-sensitive so `PrefixMatch` matches what PostgreSQL returns.
pub fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA temp_store = MEMORY;
         PRAGMA cache_size = -65536;
         PRAGMA case_sensitive_like = ON;",
    )
}

pub struct SqliteSession {
    conn: Connection,
}

impl ToSql for Param<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match *self {
            Param::Int(value) => ToSqlOutput::from(value),
            Param::Text(value) => ToSqlOutput::from(value),
        })
    }
}

fn map_error(err: rusqlite::Error) -> DbError {
    match err.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => DbError::Integrity(err.to_string()),
        Some(ErrorCode::CannotOpen) | Some(ErrorCode::NotADatabase) => {
            DbError::Connection(err.to_string())
        }
        _ => DbError::Query(err.to_string()),
    }
}

impl Session for SqliteSession {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn execute(&mut self, sql: &str, params: &[Param<'_>]) -> Result<u64, DbError> {
        let changed = self
            .conn
            .execute(sql, params_from_iter(params.iter()))
            .map_err(map_error)?;
        Ok(changed as u64)
    }

    fn batch_execute(&mut self, sql: &str) -> Result<(), DbError> {
        self.conn.execute_batch(sql).map_err(map_error)
    }

    fn fetch_all(&mut self, sql: &str, params: &[Param<'_>]) -> Result<Vec<User>, DbError> {
        let mut stmt = self.conn.prepare_cached(sql).map_err(map_error)?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                })
            })
            .map_err(map_error)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_error)
    }

    fn fetch_scalar(&mut self, sql: &str, params: &[Param<'_>]) -> Result<i64, DbError> {
        self.conn
            .query_row(sql, params_from_iter(params.iter()), |row| row.get(0))
            .map_err(map_error)
    }

    fn begin(&mut self) -> Result<(), DbError> {
        self.conn.execute_batch("BEGIN").map_err(map_error)
    }

    fn commit(&mut self) -> Result<(), DbError> {
        self.conn.execute_batch("COMMIT").map_err(map_error)
    }

    fn rollback(&mut self) -> Result<(), DbError> {
        self.conn.execute_batch("ROLLBACK").map_err(map_error)
    }

    fn bulk_insert(&mut self, rows: &mut dyn Iterator<Item = NewUser>) -> Result<u64, DbError> {
        // In-process: one prepared statement, no network round trips.
        let mut stmt = self
            .conn
            .prepare_cached("INSERT INTO users (name, email) VALUES ($1, $2)")
            .map_err(map_error)?;
        let mut inserted = 0u64;
        for row in rows {
            stmt.execute(params![row.name, row.email])
                .map_err(map_error)?;
            inserted += 1;
        }
        Ok(inserted)
    }

    fn close(self: Box<Self>) -> Result<(), DbError> {
        self.conn.close().map_err(|(_, err)| map_error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, Box<dyn Session>) {
        let dir = tempfile::tempdir().unwrap();
        let backend = SqliteBackend::new(dir.path().join("users.db"));
        let session = backend.connect().unwrap();
        (dir, session)
    }

    #[test]
    fn numbered_placeholders_bind_positionally() {
        let (_dir, mut session) = open_temp();
        let value = session
            .fetch_scalar("SELECT $1 + $2 * 10", &[Param::Int(3), Param::Int(4)])
            .unwrap();
        assert_eq!(value, 43);
        session.close().unwrap();
    }

    #[test]
    fn constraint_violation_maps_to_integrity() {
        let (_dir, mut session) = open_temp();
        session
            .batch_execute("CREATE TABLE t (name TEXT NOT NULL CHECK (name <> ''))")
            .unwrap();
        let err = session
            .execute("INSERT INTO t (name) VALUES ($1)", &[Param::Text("")])
            .unwrap_err();
        assert!(matches!(err, DbError::Integrity(_)), "got {err:?}");
    }

    #[test]
    fn syntax_error_maps_to_query() {
        let (_dir, mut session) = open_temp();
        let err = session.batch_execute("SELEKT 1").unwrap_err();
        assert!(matches!(err, DbError::Query(_)), "got {err:?}");
    }

    #[test]
    fn missing_directory_is_a_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = SqliteBackend::new(dir.path().join("missing").join("users.db"));
        let err = backend.connect().err().unwrap();
        assert!(err.is_connection(), "got {err:?}");
    }
}
