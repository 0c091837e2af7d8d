//! Command-line front end for the users benchmark.
//!
//! Connection settings come from `USERS_DB_*` environment variables (a `.env`
//! file is honoured); `--backend` and `--sqlite-path` override them.
//!
//! Usage:
//!   cargo run --release -- init
//!   cargo run --release -- bench --sizes 1000,10000 --on-error skip
//!   cargo run --release -- --backend sqlite --sqlite-path /tmp/users.db bench

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use users_bench::client::{open_backend, Backend};
use users_bench::import::import_csv;
use users_bench::populate::populate;
use users_bench::query::BenchQuery;
use users_bench::report::{write_json, write_summary};
use users_bench::runner::{BenchmarkRunner, FailurePolicy, DEFAULT_SIZES};
use users_bench::schema::{create_table, drop_table, SchemaVariant};
use users_bench::users;
use users_core::{BackendKind, DbConfig};

#[derive(Parser, Debug)]
#[command(name = "users-bench", about = "Users table CRUD and query latency benchmark")]
struct Cli {
    /// Database backend (overrides `USERS_DB_BACKEND`).
    #[arg(long, global = true)]
    backend: Option<BackendKind>,
    /// SQLite database file (overrides `USERS_DB_SQLITE_PATH`).
    #[arg(long, global = true)]
    sqlite_path: Option<PathBuf>,
    /// Log level for stderr output.
    #[arg(long, global = true, default_value = "info")]
    log_level: log::LevelFilter,
    /// Also append logs to this file.
    #[arg(long, global = true)]
    log_file: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the users table.
    Init {
        /// Use the CHECK-constrained schema instead of the indexed one.
        #[arg(long)]
        validated: bool,
    },
    /// Drop the users table.
    Reset,
    /// Replace the table contents with synthetic rows.
    Populate { rows: u64 },
    /// Time the query shapes against growing table sizes.
    Bench {
        /// Comma-separated table sizes.
        #[arg(long, value_delimiter = ',')]
        sizes: Option<Vec<u64>>,
        /// `abort` stops at the first failure; `skip` records it and continues.
        #[arg(long, default_value = "abort")]
        on_error: FailurePolicy,
        /// Also write the report as JSON.
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Load a CSV file with an `id,name,email` header.
    ImportCsv { file: PathBuf },
    /// Single-user operations.
    User {
        #[command(subcommand)]
        command: UserCommand,
    },
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create { name: String, email: String },
    Update { id: i64, name: String, email: String },
    Delete { id: i64 },
    Get { id: i64 },
    List,
}

fn load_config(cli: &Cli) -> Result<DbConfig> {
    let mut config = DbConfig::from_env().context("failed to load database configuration")?;
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(path) = &cli.sqlite_path {
        config.sqlite_path = path.clone();
    }
    Ok(config)
}

fn run_user_command(backend: &dyn Backend, command: &UserCommand) -> Result<()> {
    let mut stdout = io::stdout().lock();
    match command {
        UserCommand::Create { name, email } => {
            let user = users::create_user(backend, name, email)?;
            writeln!(stdout, "{}\t{}\t{}", user.id, user.name, user.email)?;
        }
        UserCommand::Update { id, name, email } => {
            let user = users::update_user(backend, *id, name, email)?;
            writeln!(stdout, "{}\t{}\t{}", user.id, user.name, user.email)?;
        }
        UserCommand::Delete { id } => {
            if !users::delete_user(backend, *id)? {
                writeln!(stdout, "No user with id {id}")?;
            }
        }
        UserCommand::Get { id } => match users::get_user(backend, *id)? {
            Some(user) => writeln!(stdout, "{}\t{}\t{}", user.id, user.name, user.email)?,
            None => writeln!(stdout, "No user with id {id}")?,
        },
        UserCommand::List => {
            for user in users::list_users(backend)? {
                writeln!(stdout, "{}\t{}\t{}", user.id, user.name, user.email)?;
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    users_core::initialize_logger(cli.log_level, cli.log_file.as_deref())?;

    let config = load_config(&cli)?;
    log::debug!("Using {config:?}");
    let backend = open_backend(&config)?;

    match &cli.command {
        Commands::Init { validated } => {
            let variant = if *validated {
                SchemaVariant::Validated
            } else {
                SchemaVariant::Indexed
            };
            create_table(backend.as_ref(), variant)?;
        }
        Commands::Reset => drop_table(backend.as_ref())?,
        Commands::Populate { rows } => {
            let outcome = populate(backend.as_ref(), *rows)?;
            println!("Inserted {} rows into users.", outcome.rows);
        }
        Commands::Bench {
            sizes,
            on_error,
            json,
        } => {
            let sizes = sizes.clone().unwrap_or_else(|| DEFAULT_SIZES.to_vec());
            let queries = BenchQuery::standard();

            let mut stdout = io::stdout().lock();
            let report = BenchmarkRunner::new(backend.as_ref())
                .with_policy(*on_error)
                .run(&sizes, &queries, &mut stdout)?;
            write_summary(&mut stdout, &report)?;

            if let Some(path) = json {
                write_json(path, &report)?;
            }
            if report.failures() > 0 {
                log::warn!("{} benchmark entries failed", report.failures());
            }
        }
        Commands::ImportCsv { file } => {
            let loaded = import_csv(backend.as_ref(), file)?;
            println!("Imported {loaded} rows.");
        }
        Commands::User { command } => run_user_command(backend.as_ref(), command)?,
    }

    Ok(())
}
