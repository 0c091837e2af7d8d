//! Query latency versus table size for a `users(id, name, email)` table.
//!
//! For each table size the [`populate`] module resets the table to a
//! deterministic synthetic data set, then the [`runner`] times three query
//! shapes against it:
//! - **PrefixMatch**: `name LIKE <pattern>`
//! - **ExactName**: `name = <value>`
//! - **ExactEmail**: `email = <value>`
//!
//! PostgreSQL is the target database; an embedded SQLite backend runs the
//! same harness without a server.
//!
//! Run the benchmark: `cargo run --release -- bench`
//! Run tests: `cargo test`

pub mod client;
pub mod import;
pub mod populate;
pub mod query;
pub mod report;
pub mod runner;
pub mod schema;
pub mod users;
