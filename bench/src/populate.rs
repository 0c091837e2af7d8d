//! Data population: resets the `users` table to a deterministic synthetic
//! data set of a given size.
//!
//! Row `i` is always `("User {i}", "user{i}@example.com")`, so every
//! benchmark run sees the same table for the same size.

use crate::client::{with_transaction, Backend};
use std::time::{Duration, Instant};
use users_core::{DbError, NewUser};

/// Result of one populate call.
#[derive(Debug, Clone, Copy)]
pub struct PopulateOutcome {
    pub rows: u64,
    pub elapsed: Duration,
}

/// Synthetic rows `0..count`, generated lazily so large sizes never sit in memory.
pub fn synthetic_users(count: u64) -> impl Iterator<Item = NewUser> {
    (0..count).map(NewUser::synthetic)
}

/// Replace the contents of `users` with `target_size` synthetic rows.
///
/// The delete and the bulk insert commit together. On failure the
/// transaction is rolled back and the error returned.
pub fn populate(backend: &dyn Backend, target_size: u64) -> Result<PopulateOutcome, DbError> {
    let start = Instant::now();

    let rows = with_transaction(backend, |session| {
        let removed = session.execute("DELETE FROM users", &[])?;
        log::debug!("Removed {removed} existing rows");

        let inserted = session.bulk_insert(&mut synthetic_users(target_size))?;
        if inserted != target_size {
            return Err(DbError::Query(format!(
                "expected to insert {target_size} rows, inserted {inserted}"
            )));
        }
        Ok(inserted)
    })
    .inspect_err(|err| log::error!("Populating {target_size} rows failed: {err}"))?;

    let elapsed = start.elapsed();
    log::info!(
        "Inserted {rows} rows into users in {:.2}s",
        elapsed.as_secs_f64()
    );

    Ok(PopulateOutcome { rows, elapsed })
}
