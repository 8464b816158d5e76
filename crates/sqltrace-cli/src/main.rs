//! # sqltrace-cli
//!
//! Runs single SQL statements against a libsql database through the
//! traced connector, logging every driver call with `tracing`.
//!
//! Log output goes to stderr and is filtered by `RUST_LOG`
//! (for example `RUST_LOG=sqltrace=debug`). Query rows are printed to
//! stdout as JSON lines.

mod output;
mod settings;

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use sqltrace::{Config, Context, StepResult, TracedConn, TracedConnector, TracedRows, Value};
use sqltrace_libsql::LibsqlDriver;
use tracing_subscriber::EnvFilter;

use crate::output::{parse_args, result_json, row_json};
use crate::settings::{FileSettings, Overrides, Settings};

#[derive(Parser)]
#[command(name = "sqltrace")]
#[command(about = "Run SQL through the sqltrace instrumentation layer")]
#[command(version)]
struct Cli {
    /// Path to a YAML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database DSN (`:memory:`, a file path or a libsql:// URL)
    #[arg(short, long, env = "SQLTRACE_DATABASE")]
    database: Option<String>,

    /// Auth token for remote databases
    #[arg(long, env = "SQLTRACE_AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    /// Include bound parameters in statement logs
    #[arg(long)]
    log_params: bool,

    /// Log successful operations slower than this many milliseconds at warn
    #[arg(long, env = "SQLTRACE_SLOW_MS")]
    slow_ms: Option<u64>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a statement and print the affected row count
    Exec {
        /// SQL statement
        sql: String,

        /// Positional arguments (integers, reals, null, true/false, else text)
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Run a query and print each row as a JSON object
    Query {
        /// SQL query
        sql: String,

        /// Positional arguments (integers, reals, null, true/false, else text)
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Check that the database is reachable
    Ping,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::Exec { .. } => "exec",
            Self::Query { .. } => "query",
            Self::Ping => "ping",
        }
    }
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            database: self.database.clone(),
            auth_token: self.auth_token.clone(),
            log_params: self.log_params,
            slow_ms: self.slow_ms,
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let file = match &cli.config {
        Some(path) => FileSettings::load(path)?,
        None => FileSettings::default(),
    };
    let settings = Settings::resolve(cli.overrides(), file)?;

    let connector = TracedConnector::from_driver(
        LibsqlDriver,
        settings.dsn.clone(),
        Config::new().with_observer(settings.observer()),
    )?;
    let ctx = Context::background().with_label("command", cli.command.name());
    let mut conn = connector
        .connect(&ctx)
        .await
        .context("failed to connect to database")?;

    let outcome = run(&mut conn, &ctx, cli.command).await;
    let closed = conn.close().await;
    finish(outcome, closed, "connection")
}

/// Combine a step's outcome with the close that follows it. The step's
/// error wins; a close failure after it is only logged.
fn finish<T>(
    outcome: anyhow::Result<T>,
    closed: sqltrace::Result<()>,
    what: &str,
) -> anyhow::Result<T> {
    match (outcome, closed) {
        (outcome, Ok(())) => outcome,
        (Ok(_), Err(err)) => {
            Err(anyhow::Error::new(err).context(format!("failed to close {what}")))
        }
        (Err(err), Err(close_err)) => {
            tracing::warn!(error = %close_err, "failed to close {}", what);
            Err(err)
        }
    }
}

async fn run(conn: &mut TracedConn, ctx: &Context, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Exec { sql, args } => {
            tracing::info!("Executing {}", sql);
            let result = conn.exec(&sql, &parse_args(&args)).await?;
            println!("{}", result_json(&result)?);
        }
        Commands::Query { sql, args } => {
            tracing::info!("Querying {}", sql);
            let mut rows = conn.query(&sql, &parse_args(&args)).await?;
            let columns = rows.columns().to_vec();
            let mut dest = vec![Value::Null; columns.len()];
            let printed = print_rows(&mut rows, &columns, &mut dest).await;
            let closed = rows.close().await;
            finish(printed, closed, "rows")?;
        }
        Commands::Ping => {
            conn.ping(ctx).await?;
            println!("ok");
        }
    }
    Ok(())
}

async fn print_rows(
    rows: &mut TracedRows,
    columns: &[String],
    dest: &mut [Value],
) -> anyhow::Result<()> {
    while rows.next(dest).await? == StepResult::Row {
        println!("{}", row_json(columns, dest));
    }
    Ok(())
}
