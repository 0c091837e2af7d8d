use thiserror::Error;

/// Failures surfaced by the database client, the populator and the runner.
#[derive(Debug, Error)]
pub enum DbError {
    /// A session could not be established.
    #[error("connection failed: {0}")]
    Connection(String),
    /// A constraint rejected an insert or update.
    #[error("integrity violation: {0}")]
    Integrity(String),
    /// An update addressed a row that does not exist.
    #[error("user {id} not found")]
    NotFound { id: i64 },
    /// Any other driver failure.
    #[error("query failed: {0}")]
    Query(String),
    #[error("{operation} is not supported by the {backend} backend")]
    Unsupported {
        operation: &'static str,
        backend: &'static str,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DbError {
    /// True for failures that leave the session unusable or unreachable.
    pub fn is_connection(&self) -> bool {
        matches!(self, DbError::Connection(_))
    }
}

#[cfg(test)]
mod tests {
    use super::DbError;

    #[test]
    fn not_found_names_the_id() {
        let err = DbError::NotFound { id: 7 };
        assert_eq!(err.to_string(), "user 7 not found");
    }

    #[test]
    fn unsupported_names_operation_and_backend() {
        let err = DbError::Unsupported {
            operation: "csv import",
            backend: "sqlite",
        };
        assert_eq!(
            err.to_string(),
            "csv import is not supported by the sqlite backend"
        );
    }

    #[test]
    fn only_connection_errors_are_connection() {
        assert!(DbError::Connection("refused".into()).is_connection());
        assert!(!DbError::Query("syntax".into()).is_connection());
    }
}
