//! The three benchmarked query shapes and their timed execution.

use crate::client::{with_session, Backend, Param, Session};
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use users_core::{DbError, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QueryShape {
    /// `name LIKE <pattern>`; wildcards come from the parameter.
    PrefixMatch,
    ExactName,
    ExactEmail,
}

impl QueryShape {
    #[cfg(test)]
    const ALL: [QueryShape; 3] = [
        QueryShape::PrefixMatch,
        QueryShape::ExactName,
        QueryShape::ExactEmail,
    ];

    pub fn sql(&self) -> &'static str {
        match self {
            QueryShape::PrefixMatch => "SELECT * FROM users WHERE name LIKE $1",
            QueryShape::ExactName => "SELECT * FROM users WHERE name = $1",
            QueryShape::ExactEmail => "SELECT * FROM users WHERE email = $1",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            QueryShape::PrefixMatch => "PrefixMatch",
            QueryShape::ExactName => "ExactName",
            QueryShape::ExactEmail => "ExactEmail",
        }
    }
}

impl fmt::Display for QueryShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One labelled query of a benchmark plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchQuery {
    pub label: String,
    pub shape: QueryShape,
    pub param: String,
}

impl BenchQuery {
    pub fn new(label: impl Into<String>, shape: QueryShape, param: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            shape,
            param: param.into(),
        }
    }

    /// The reference plan: `A` prefix, `B` exact name, `C` exact email.
    pub fn standard() -> Vec<BenchQuery> {
        vec![
            BenchQuery::new("A", QueryShape::PrefixMatch, "User 500"),
            BenchQuery::new("B", QueryShape::ExactName, "User 500"),
            BenchQuery::new("C", QueryShape::ExactEmail, "user500@example.com"),
        ]
    }
}

/// Rows returned by a query and the wall-clock time it took.
#[derive(Debug, Clone)]
pub struct TimedQuery {
    pub rows: Vec<User>,
    pub elapsed: Duration,
}

/// Execute `shape` with `param` on an open session, timing execution and
/// fetching only.
pub fn timed_query(
    session: &mut dyn Session,
    shape: QueryShape,
    param: &str,
) -> Result<TimedQuery, DbError> {
    let start = Instant::now();
    let rows = session.fetch_all(shape.sql(), &[Param::Text(param)])?;
    let elapsed = start.elapsed();
    Ok(TimedQuery { rows, elapsed })
}

/// Run one query in its own session and return its rows.
pub fn run_query(
    backend: &dyn Backend,
    shape: QueryShape,
    param: &str,
) -> Result<Vec<User>, DbError> {
    with_session(backend, |session| timed_query(session, shape, param))
        .map(|timed| timed.rows)
        .inspect_err(|err| log::error!("{shape} query for '{param}' failed: {err}"))
}
