//! Bulk load of a CSV file (`id,name,email` header) into `users` through the
//! driver's COPY protocol.

use crate::client::{with_transaction, Backend};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use users_core::DbError;

pub fn import_csv(backend: &dyn Backend, path: &Path) -> Result<u64, DbError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let loaded = with_transaction(backend, |session| session.copy_csv(&mut reader))
        .inspect_err(|err| log::error!("Import of {} failed: {err}", path.display()))?;

    log::info!("Imported {loaded} rows from {}", path.display());
    Ok(loaded)
}
