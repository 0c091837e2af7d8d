//! Benchmark runner: for each table size, repopulate the table and time
//! every query of the plan against it.
//!
//! Sizes and queries are processed in the order given. Population commits
//! before any query runs, and queries share one session per size, opened
//! after population so neither populate nor connect time is measured.

use crate::client::{with_session, Backend};
use crate::populate::populate;
use crate::query::{timed_query, BenchQuery};
use crate::report::{write_size_group, BenchmarkReport, RunEntry, SizeGroup};
use std::io::Write;
use std::str::FromStr;
use users_core::DbError;

/// Table sizes of the reference run.
pub const DEFAULT_SIZES: [u64; 4] = [1_000, 10_000, 100_000, 1_000_000];

/// What to do when population or a query fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the whole run and return the error.
    #[default]
    Abort,
    /// Record the failure in the report and carry on.
    Skip,
}

impl FromStr for FailurePolicy {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "skip" => Ok(FailurePolicy::Skip),
            other => Err(DbError::Config(format!("unknown failure policy '{other}'"))),
        }
    }
}

pub struct BenchmarkRunner<'a> {
    backend: &'a dyn Backend,
    policy: FailurePolicy,
}

impl<'a> BenchmarkRunner<'a> {
    pub fn new(backend: &'a dyn Backend) -> Self {
        Self {
            backend,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run `queries` against every size in `sizes`.
    ///
    /// Each size group is written to `out` as soon as it completes.
    pub fn run(
        &self,
        sizes: &[u64],
        queries: &[BenchQuery],
        out: &mut dyn Write,
    ) -> Result<BenchmarkReport, DbError> {
        let mut report = BenchmarkReport::new(self.backend.kind());

        for &size in sizes {
            let group = self.run_size(size, queries)?;
            write_size_group(out, &group)?;
            report.groups.push(group);
        }

        Ok(report)
    }

    fn run_size(&self, size: u64, queries: &[BenchQuery]) -> Result<SizeGroup, DbError> {
        log::info!("Benchmarking {} queries against {size} rows", queries.len());

        let outcome = match populate(self.backend, size) {
            Ok(outcome) => outcome,
            Err(err) if self.policy == FailurePolicy::Skip => {
                log::warn!("Skipping size {size}: {err}");
                return Ok(SizeGroup {
                    table_size: size,
                    populate_seconds: None,
                    entries: failed_entries(size, queries, &err),
                });
            }
            Err(err) => return Err(err),
        };

        let entries = match self.time_queries(size, queries) {
            Ok(entries) => entries,
            Err(err) if self.policy == FailurePolicy::Skip => {
                log::warn!("Skipping queries for size {size}: {err}");
                failed_entries(size, queries, &err)
            }
            Err(err) => return Err(err),
        };

        Ok(SizeGroup {
            table_size: size,
            populate_seconds: Some(outcome.elapsed.as_secs_f64()),
            entries,
        })
    }

    fn time_queries(&self, size: u64, queries: &[BenchQuery]) -> Result<Vec<RunEntry>, DbError> {
        with_session(self.backend, |session| {
            let mut entries = Vec::with_capacity(queries.len());
            for (index, query) in queries.iter().enumerate() {
                match timed_query(session, query.shape, &query.param) {
                    Ok(timed) => {
                        log::debug!(
                            "{} ({}) on {size} rows: {} rows in {:?}",
                            query.label,
                            query.shape,
                            timed.rows.len(),
                            timed.elapsed
                        );
                        entries.push(RunEntry::completed(
                            size,
                            query,
                            timed.elapsed,
                            timed.rows.len(),
                        ));
                    }
                    Err(err) if self.policy == FailurePolicy::Skip && err.is_connection() => {
                        // The session is gone; the rest of the plan cannot run on it.
                        log::warn!(
                            "Lost connection at query {} on {size} rows: {err}",
                            query.label
                        );
                        entries.extend(failed_entries(size, &queries[index..], &err));
                        break;
                    }
                    Err(err) if self.policy == FailurePolicy::Skip => {
                        log::warn!("Query {} failed on {size} rows: {err}", query.label);
                        entries.push(RunEntry::failed(size, query, &err));
                    }
                    Err(err) => {
                        log::error!("Query {} failed on {size} rows: {err}", query.label);
                        return Err(err);
                    }
                }
            }
            Ok(entries)
        })
    }
}

fn failed_entries(size: u64, queries: &[BenchQuery], err: &DbError) -> Vec<RunEntry> {
    queries
        .iter()
        .map(|query| RunEntry::failed(size, query, err))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Param, Session};
    use std::cell::Cell;
    use std::rc::Rc;
    use users_core::{BackendKind, NewUser, User};

    /// Populates fine, then drops the connection on the first query.
    struct DroppingSession {
        fetches: Rc<Cell<usize>>,
    }

    impl Session for DroppingSession {
        fn kind(&self) -> BackendKind {
            BackendKind::Sqlite
        }

        fn execute(&mut self, _sql: &str, _params: &[Param<'_>]) -> Result<u64, DbError> {
            Ok(0)
        }

        fn batch_execute(&mut self, _sql: &str) -> Result<(), DbError> {
            Ok(())
        }

        fn fetch_all(&mut self, _sql: &str, _params: &[Param<'_>]) -> Result<Vec<User>, DbError> {
            self.fetches.set(self.fetches.get() + 1);
            Err(DbError::Connection("server closed the connection".into()))
        }

        fn fetch_scalar(&mut self, _sql: &str, _params: &[Param<'_>]) -> Result<i64, DbError> {
            Ok(0)
        }

        fn begin(&mut self) -> Result<(), DbError> {
            Ok(())
        }

        fn commit(&mut self) -> Result<(), DbError> {
            Ok(())
        }

        fn rollback(&mut self) -> Result<(), DbError> {
            Ok(())
        }

        fn bulk_insert(
            &mut self,
            rows: &mut dyn Iterator<Item = NewUser>,
        ) -> Result<u64, DbError> {
            Ok(rows.count() as u64)
        }

        fn close(self: Box<Self>) -> Result<(), DbError> {
            Ok(())
        }
    }

    struct DroppingBackend {
        fetches: Rc<Cell<usize>>,
    }

    impl Backend for DroppingBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Sqlite
        }

        fn connect(&self) -> Result<Box<dyn Session>, DbError> {
            Ok(Box::new(DroppingSession {
                fetches: Rc::clone(&self.fetches),
            }))
        }
    }

    #[test]
    fn lost_connection_fails_the_rest_of_the_plan_without_retrying() {
        let backend = DroppingBackend {
            fetches: Rc::new(Cell::new(0)),
        };
        let report = BenchmarkRunner::new(&backend)
            .with_policy(FailurePolicy::Skip)
            .run(&[5], &BenchQuery::standard(), &mut std::io::sink())
            .unwrap();

        assert_eq!(backend.fetches.get(), 1);
        assert_eq!(report.failures(), 3);
        let labels: Vec<_> = report.entries().map(|entry| entry.label()).collect();
        assert_eq!(labels, ["A", "B", "C"]);
        assert!(report.groups[0].populate_seconds.is_some());
    }

    #[test]
    fn lost_connection_aborts_by_default() {
        let backend = DroppingBackend {
            fetches: Rc::new(Cell::new(0)),
        };
        let err = BenchmarkRunner::new(&backend)
            .run(&[5], &BenchQuery::standard(), &mut std::io::sink())
            .unwrap_err();
        assert!(err.is_connection(), "got {err:?}");
        assert_eq!(backend.fetches.get(), 1);
    }

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("Abort".parse::<FailurePolicy>().unwrap(), FailurePolicy::Abort);
        assert_eq!("skip".parse::<FailurePolicy>().unwrap(), FailurePolicy::Skip);
        assert!("retry".parse::<FailurePolicy>().is_err());
    }

    #[test]
    fn default_policy_aborts() {
        assert_eq!(FailurePolicy::default(), FailurePolicy::Abort);
    }

    #[test]
    fn default_sizes_grow_by_decades() {
        assert!(DEFAULT_SIZES.windows(2).all(|w| w[1] == w[0] * 10));
    }
}
