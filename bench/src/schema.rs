//! DDL for the `users` table.
//!
//! Two variants exist:
//! - [`SchemaVariant::Indexed`] — plain columns plus an index on `name`; the
//!   benchmark uses this one.
//! - [`SchemaVariant::Validated`] — CHECK constraints on `name` and `email`;
//!   rejects rows such as `"User 0"`, so it is only used for CRUD work.

use crate::client::{with_session, Backend};
use users_core::{BackendKind, DbError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVariant {
    Indexed,
    Validated,
}

const PG_INDEXED: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(100) NOT NULL,
        email VARCHAR(100) NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_users_name ON users (name);";

const PG_VALIDATED: &str = r"
    CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(100) NOT NULL
            CHECK (name ~ '^[A-Za-zÀ-ÖØ-öø-ÿ]+$' AND name <> ''),
        email VARCHAR(100) NOT NULL
            CHECK (email ~ '^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$' AND email <> '')
    );";

const SQLITE_INDEXED: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name VARCHAR(100) NOT NULL,
        email VARCHAR(100) NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_users_name ON users (name);";

// SQLite has no regex operator; GLOB approximates the same rules with ASCII letters.
const SQLITE_VALIDATED: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name VARCHAR(100) NOT NULL
            CHECK (name <> '' AND name NOT GLOB '*[^A-Za-z]*'),
        email VARCHAR(100) NOT NULL
            CHECK (email <> ''
                AND email GLOB '?*@?*.[A-Za-z][A-Za-z]*'
                AND email NOT GLOB '*[^A-Za-z0-9._%+@-]*'
                AND email NOT GLOB '*@*@*')
    );";

/// DDL for `variant` in the dialect of `kind`.
pub fn create_table_sql(kind: BackendKind, variant: SchemaVariant) -> &'static str {
    match (kind, variant) {
        (BackendKind::Postgres, SchemaVariant::Indexed) => PG_INDEXED,
        (BackendKind::Postgres, SchemaVariant::Validated) => PG_VALIDATED,
        (BackendKind::Sqlite, SchemaVariant::Indexed) => SQLITE_INDEXED,
        (BackendKind::Sqlite, SchemaVariant::Validated) => SQLITE_VALIDATED,
    }
}

/// Create the `users` table if it does not exist yet.
pub fn create_table(backend: &dyn Backend, variant: SchemaVariant) -> Result<(), DbError> {
    let sql = create_table_sql(backend.kind(), variant);
    with_session(backend, |session| session.batch_execute(sql))
        .inspect_err(|err| log::error!("Failed to create users table: {err}"))?;
    log::info!("Users table ready ({variant:?} schema, {})", backend.kind());
    Ok(())
}

pub fn drop_table(backend: &dyn Backend) -> Result<(), DbError> {
    with_session(backend, |session| session.batch_execute("DROP TABLE IF EXISTS users"))?;
    log::info!("Users table dropped");
    Ok(())
}
