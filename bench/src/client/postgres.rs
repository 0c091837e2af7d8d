//! PostgreSQL session over the synchronous `postgres` driver.
//!
//! Bulk inserts go through `COPY ... FROM STDIN (FORMAT binary)` so a million
//! rows cost one statement instead of a million round trips.

use super::{Backend, Param, Session};
use postgres::binary_copy::BinaryCopyInWriter;
use postgres::types::{ToSql, Type};
use postgres::{Client, NoTls};
use std::io::Read;
use std::time::Duration;
use users_core::{BackendKind, DbConfig, DbError, NewUser, User};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const APPLICATION_NAME: &str = "users-bench";

/// SQLSTATE class for integrity constraint violations.
const INTEGRITY_CLASS: &str = "23";

pub struct PostgresBackend {
    config: postgres::Config,
    target: String,
}

impl PostgresBackend {
    pub fn new(config: &DbConfig) -> Self {
        let mut pg = postgres::Config::new();
        pg.host(&config.host)
            .port(config.port)
            .dbname(&config.database)
            .user(&config.user)
            .application_name(APPLICATION_NAME)
            .connect_timeout(CONNECT_TIMEOUT);
        if !config.password.is_empty() {
            pg.password(&config.password);
        }

        Self {
            config: pg,
            target: format!(
                "{}@{}:{}/{}",
                config.user, config.host, config.port, config.database
            ),
        }
    }
}

impl Backend for PostgresBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    fn connect(&self) -> Result<Box<dyn Session>, DbError> {
        log::debug!("Connecting to PostgreSQL at {}", self.target);
        let client = self
            .config
            .connect(NoTls)
            .map_err(|err| DbError::Connection(format!("{}: {err}", self.target)))?;
        Ok(Box::new(PostgresSession { client }))
    }
}

pub struct PostgresSession {
    client: Client,
}

fn bind<'a>(params: &'a [Param<'a>]) -> Vec<&'a (dyn ToSql + Sync)> {
    params
        .iter()
        .map(|param| match param {
            Param::Int(value) => value as &(dyn ToSql + Sync),
            Param::Text(value) => value as &(dyn ToSql + Sync),
        })
        .collect()
}

fn map_error(err: postgres::Error) -> DbError {
    if let Some(db) = err.as_db_error() {
        let message = format!("{} ({})", db.message(), db.code().code());
        if db.code().code().starts_with(INTEGRITY_CLASS) {
            return DbError::Integrity(message);
        }
        return DbError::Query(message);
    }
    if err.is_closed() {
        return DbError::Connection(err.to_string());
    }
    DbError::Query(err.to_string())
}

fn user_from_row(row: &postgres::Row) -> Result<User, DbError> {
    Ok(User {
        id: row.try_get(0).map_err(map_error)?,
        name: row.try_get(1).map_err(map_error)?,
        email: row.try_get(2).map_err(map_error)?,
    })
}

impl Session for PostgresSession {
    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    fn execute(&mut self, sql: &str, params: &[Param<'_>]) -> Result<u64, DbError> {
        self.client.execute(sql, &bind(params)).map_err(map_error)
    }

    fn batch_execute(&mut self, sql: &str) -> Result<(), DbError> {
        self.client.batch_execute(sql).map_err(map_error)
    }

    fn fetch_all(&mut self, sql: &str, params: &[Param<'_>]) -> Result<Vec<User>, DbError> {
        let rows = self.client.query(sql, &bind(params)).map_err(map_error)?;
        rows.iter().map(user_from_row).collect()
    }

    fn fetch_scalar(&mut self, sql: &str, params: &[Param<'_>]) -> Result<i64, DbError> {
        let row = self.client.query_one(sql, &bind(params)).map_err(map_error)?;
        row.try_get(0).map_err(map_error)
    }

    fn begin(&mut self) -> Result<(), DbError> {
        self.client.batch_execute("BEGIN").map_err(map_error)
    }

    fn commit(&mut self) -> Result<(), DbError> {
        self.client.batch_execute("COMMIT").map_err(map_error)
    }

    fn rollback(&mut self) -> Result<(), DbError> {
        self.client.batch_execute("ROLLBACK").map_err(map_error)
    }

    fn bulk_insert(&mut self, rows: &mut dyn Iterator<Item = NewUser>) -> Result<u64, DbError> {
        let sink = self
            .client
            .copy_in("COPY users (name, email) FROM STDIN (FORMAT binary)")
            .map_err(map_error)?;
        let mut writer = BinaryCopyInWriter::new(sink, &[Type::VARCHAR, Type::VARCHAR]);
        for row in rows {
            writer.write(&[&row.name, &row.email]).map_err(map_error)?;
        }
        writer.finish().map_err(map_error)
    }

    fn copy_csv(&mut self, reader: &mut dyn Read) -> Result<u64, DbError> {
        let mut writer = self
            .client
            .copy_in("COPY users (id, name, email) FROM STDIN WITH (FORMAT csv, HEADER true)")
            .map_err(map_error)?;
        std::io::copy(reader, &mut writer)?;
        let loaded = writer.finish().map_err(map_error)?;

        // Explicit ids bypass the sequence; move it past the largest one.
        self.client
            .batch_execute(
                "SELECT setval(pg_get_serial_sequence('users', 'id'), \
                 COALESCE(MAX(id), 0) + 1, false) FROM users",
            )
            .map_err(map_error)?;

        Ok(loaded)
    }

    fn close(self: Box<Self>) -> Result<(), DbError> {
        self.client.close().map_err(map_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_omits_password() {
        let config = DbConfig {
            password: "hunter2".to_string(),
            database: "bdsql".to_string(),
            ..DbConfig::default()
        };
        let backend = PostgresBackend::new(&config);
        assert_eq!(backend.target, "postgres@localhost:5432/bdsql");
        assert_eq!(backend.config.get_dbname(), Some("bdsql"));
        assert_eq!(backend.config.get_password(), Some("hunter2".as_bytes()));
    }

    #[test]
    fn empty_password_is_not_sent() {
        let backend = PostgresBackend::new(&DbConfig::default());
        assert_eq!(backend.config.get_password(), None);
    }

    #[test]
    fn bind_preserves_order() {
        let params = [Param::Text("User 5"), Param::Int(5)];
        assert_eq!(bind(&params).len(), 2);
    }
}
