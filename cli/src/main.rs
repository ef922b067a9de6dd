//! snowq CLI
//!
//! Runs one SQL statement, given inline or as a SQL file, and prints the
//! resulting rows tab-separated.

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser};
use snowq::config::{ACCOUNT_ENV, DEFAULT_TIMEOUT_SECS, PASSWORD_ENV, TIMEOUT_ENV, USER_ENV};
use snowq::{Config, Cursor, Row, Session, SqliteDriver};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "snowq", version, about)]
#[command(group(ArgGroup::new("statement").required(true).args(["execute", "file"])))]
struct Args {
    /// JSON configuration file; takes precedence over the connection flags
    #[arg(long)]
    config: Option<PathBuf>,

    /// Database to connect to (`:memory:`, a file path or a `sqlite:` URL)
    #[arg(long, env = ACCOUNT_ENV, default_value = ":memory:")]
    account: String,

    #[arg(long, env = USER_ENV, default_value = "")]
    user: String,

    #[arg(long, env = PASSWORD_ENV, default_value = "", hide_env_values = true)]
    password: String,

    /// Statement timeout in seconds
    #[arg(long, env = TIMEOUT_ENV, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// SQL text to execute
    #[arg(short, long)]
    execute: Option<String>,

    /// SQL file to execute; line breaks are removed before execution
    #[arg(short, long)]
    file: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    // Initialize logger
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snowq=info,cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = args.session_config()?;

    let session = Session::from_config(&SqliteDriver::new(), &config)?;
    tracing::debug!(
        "Connected to {} (version {})",
        session.account(),
        session.version()
    );

    let mut cursor = match (args.execute, args.file) {
        (Some(sql), _) => session.sql(&sql)?,
        (None, Some(path)) => session.sqlf(path)?,
        (None, None) => anyhow::bail!("either --execute or --file is required"),
    };

    for row in cursor.fetchall()? {
        println!("{}", format_row(&row));
    }
    cursor.close();

    session.close()?;
    Ok(())
}

impl Args {
    /// Session settings from `--config`, or from the connection flags
    fn session_config(&self) -> anyhow::Result<Config> {
        if let Some(path) = &self.config {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            return Ok(Config::from_json(&json)?);
        }
        Ok(Config {
            user: self.user.clone(),
            password: self.password.clone(),
            account: self.account.clone(),
            timeout_secs: self.timeout,
        })
    }
}

fn format_row(row: &Row) -> String {
    row.iter()
        .map(|cell| cell.as_deref().unwrap_or("NULL"))
        .collect::<Vec<_>>()
        .join("\t")
}
