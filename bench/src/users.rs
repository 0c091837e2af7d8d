//! Single-row CRUD on `users`. Each call opens its own session; writes run in
//! a transaction that is rolled back on failure.

use crate::client::{with_session, with_transaction, Backend, Param};
use users_core::{DbError, NewUser, User};

pub fn create_user(backend: &dyn Backend, name: &str, email: &str) -> Result<User, DbError> {
    let id = with_transaction(backend, |session| {
        session.fetch_scalar(
            "INSERT INTO users (name, email) VALUES ($1, $2) RETURNING id",
            &[Param::Text(name), Param::Text(email)],
        )
    })
    .inspect_err(|err| log::error!("Failed to create user '{name}': {err}"))?;

    log::info!("Created user {id}");
    Ok(NewUser::new(name, email).with_id(id))
}

/// Overwrite name and email of user `id`.
///
/// Returns [`DbError::NotFound`] when no such user exists.
pub fn update_user(
    backend: &dyn Backend,
    id: i64,
    name: &str,
    email: &str,
) -> Result<User, DbError> {
    with_transaction(backend, |session| {
        let changed = session.execute(
            "UPDATE users SET name = $1, email = $2 WHERE id = $3",
            &[Param::Text(name), Param::Text(email), Param::Int(id)],
        )?;
        if changed == 0 {
            return Err(DbError::NotFound { id });
        }
        Ok(())
    })
    .inspect_err(|err| log::error!("Failed to update user {id}: {err}"))?;

    log::info!("Updated user {id}");
    Ok(NewUser::new(name, email).with_id(id))
}

/// Delete user `id`. Returns whether a row was removed; a missing id is not
/// an error.
pub fn delete_user(backend: &dyn Backend, id: i64) -> Result<bool, DbError> {
    let removed = with_transaction(backend, |session| {
        session.execute("DELETE FROM users WHERE id = $1", &[Param::Int(id)])
    })
    .inspect_err(|err| log::error!("Failed to delete user {id}: {err}"))?;

    if removed == 0 {
        log::debug!("Delete of user {id} matched no rows");
    } else {
        log::info!("Deleted user {id}");
    }
    Ok(removed > 0)
}

pub fn get_user(backend: &dyn Backend, id: i64) -> Result<Option<User>, DbError> {
    with_session(backend, |session| {
        session.fetch_one(
            "SELECT id, name, email FROM users WHERE id = $1",
            &[Param::Int(id)],
        )
    })
}

pub fn list_users(backend: &dyn Backend) -> Result<Vec<User>, DbError> {
    with_session(backend, |session| {
        session.fetch_all("SELECT id, name, email FROM users ORDER BY id", &[])
    })
}

pub fn count_users(backend: &dyn Backend) -> Result<u64, DbError> {
    let count = with_session(backend, |session| {
        session.fetch_scalar("SELECT COUNT(*) FROM users", &[])
    })?;
    Ok(count.max(0) as u64)
}
