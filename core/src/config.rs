//! Connection configuration.
//!
//! Parameters come from an arbitrary key/value source. `from_env` maps each key
//! to a `USERS_DB_<KEY>` environment variable after loading a `.env` file if
//! one is present.

use crate::error::DbError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const ENV_PREFIX: &str = "USERS_DB_";

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_DATABASE: &str = "postgres";
pub const DEFAULT_USER: &str = "postgres";
pub const DEFAULT_SQLITE_PATH: &str = "users.db";

/// Which database client to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Postgres,
    Sqlite,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Postgres => "postgres",
            BackendKind::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(BackendKind::Postgres),
            "sqlite" | "sqlite3" => Ok(BackendKind::Sqlite),
            other => Err(DbError::Config(format!("unknown backend '{other}'"))),
        }
    }
}

/// Everything needed to open a session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    pub backend: BackendKind,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub sqlite_path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Postgres,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database: DEFAULT_DATABASE.to_string(),
            user: DEFAULT_USER.to_string(),
            password: String::new(),
            sqlite_path: PathBuf::from(DEFAULT_SQLITE_PATH),
        }
    }
}

// Keeps the password out of logs.
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .field("sqlite_path", &self.sqlite_path)
            .finish()
    }
}

impl DbConfig {
    /// Builds a config from a key/value lookup.
    ///
    /// Recognised keys: `backend`, `host`, `port`, `database`, `user`,
    /// `password`, `sqlite_path`. Missing keys keep their defaults; empty
    /// values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DbError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = DbConfig::default();

        if let Some(backend) = get("backend") {
            config.backend = backend.parse()?;
        }
        if let Some(host) = get("host") {
            config.host = host;
        }
        if let Some(port) = get("port") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| DbError::Config(format!("invalid port '{port}'")))?;
        }
        if let Some(database) = get("database") {
            config.database = database;
        }
        if let Some(user) = get("user") {
            config.user = user;
        }
        // An empty password is a legitimate value, so no filtering here.
        if let Some(password) = lookup("password") {
            config.password = password;
        }
        if let Some(path) = get("sqlite_path") {
            config.sqlite_path = PathBuf::from(path);
        }

        Ok(config)
    }

    /// Loads `.env` (when present) and reads `USERS_DB_*` variables.
    pub fn from_env() -> Result<Self, DbError> {
        match dotenvy::dotenv() {
            Ok(path) => log::debug!("Loaded environment from {}", path.display()),
            Err(err) if err.not_found() => {}
            Err(err) => return Err(DbError::Config(format!("failed to read .env: {err}"))),
        }

        Self::from_lookup(|key| std::env::var(env_key(key)).ok())
    }
}

/// Environment variable name for a config key, e.g. `host` -> `USERS_DB_HOST`.
pub fn env_key(key: &str) -> String {
    format!("{ENV_PREFIX}{}", key.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_lookup_yields_defaults() {
        let config = DbConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, DbConfig::default());
        assert_eq!(config.port, 5432);
        assert_eq!(config.backend, BackendKind::Postgres);
    }

    #[test]
    fn lookup_overrides_every_field() {
        let config = DbConfig::from_lookup(lookup_from(&[
            ("backend", "sqlite"),
            ("host", "db.internal"),
            ("port", "6543"),
            ("database", "bdsql"),
            ("user", "bench"),
            ("password", "secret"),
            ("sqlite_path", "/tmp/users.db"),
        ]))
        .unwrap();

        assert_eq!(config.backend, BackendKind::Sqlite);
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 6543);
        assert_eq!(config.database, "bdsql");
        assert_eq!(config.user, "bench");
        assert_eq!(config.password, "secret");
        assert_eq!(config.sqlite_path, PathBuf::from("/tmp/users.db"));
    }

    #[test]
    fn invalid_port_is_a_config_error() {
        let err = DbConfig::from_lookup(lookup_from(&[("port", "not-a-port")])).unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
    }

    #[test]
    fn unknown_backend_is_a_config_error() {
        let err = DbConfig::from_lookup(lookup_from(&[("backend", "oracle")])).unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
    }

    #[test]
    fn backend_names_are_case_insensitive() {
        assert_eq!("PostgreSQL".parse::<BackendKind>().unwrap(), BackendKind::Postgres);
        assert_eq!(" SQLite ".parse::<BackendKind>().unwrap(), BackendKind::Sqlite);
    }

    #[test]
    fn debug_output_hides_password() {
        let config = DbConfig {
            password: "hunter2".to_string(),
            ..DbConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn env_keys_are_prefixed_and_uppercased() {
        assert_eq!(env_key("sqlite_path"), "USERS_DB_SQLITE_PATH");
    }
}
