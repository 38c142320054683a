//! # citecheck CLI
//!
//! ## Usage
//!
//! ```bash
//! citecheck --config ./config/citecheck.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `citecheck init` | Create the SQLite database and run schema migrations |
//! | `citecheck serve` | Start the HTTP server |
//! | `citecheck parse <file>` | Parse a bibliography into sources (offline) |
//! | `citecheck check "<citation>"` | Check one citation against APA or MLA (offline) |
//! | `citecheck validate <file>` | Validate a bibliography and store the results |
//! | `citecheck report <session>` | Export a session report as JSON or CSV |
//! | `citecheck purge` | Delete expired sessions |
//!
//! Log verbosity follows `RUST_LOG` (default `citecheck=info,tower_http=info`).
//! Logs go to stderr so command output on stdout stays machine-readable.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use citecheck::{config, migrate, server, session, validate_cmd};

/// citecheck: score bibliography sources for credibility.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/citecheck.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "citecheck",
    about = "citecheck: parse, validate, and score bibliography citations",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/citecheck.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it on an existing database is safe.
    Init,

    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Parse a bibliography file and print the sources as JSON.
    ///
    /// Runs without a database. One citation per line; blank lines are
    /// skipped.
    Parse {
        /// Text file with one citation per line.
        file: PathBuf,
    },

    /// Check one citation against a citation style.
    Check {
        /// The citation text.
        citation: String,

        /// Citation style: `apa` or `mla`.
        #[arg(long, default_value = "apa")]
        style: String,
    },

    /// Validate a bibliography and store the results.
    ///
    /// The file is either a JSON array of sources or plain text with one
    /// citation per line.
    Validate {
        /// Sources file (JSON array or text).
        file: PathBuf,

        /// Session to store results under. A new one is created if omitted.
        #[arg(long)]
        session: Option<String>,

        /// Validate and store each source independently instead of
        /// all-or-nothing.
        #[arg(long)]
        partial: bool,
    },

    /// Export the report for a session.
    Report {
        /// Session id.
        session: String,

        /// Output format: `json` or `csv`.
        #[arg(long, default_value = "json")]
        format: String,

        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Delete expired sessions, sources, and results.
    Purge,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "citecheck=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Commands that don't require config
    match &cli.command {
        Commands::Parse { file } => return validate_cmd::run_parse(file),
        Commands::Check { citation, style } => {
            return validate_cmd::run_check(citation, Some(style.as_str()))
        }
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Validate {
            file,
            session,
            partial,
        } => {
            validate_cmd::run_validate(&cfg, &file, session.as_deref(), partial).await?;
        }
        Commands::Report {
            session: session_id,
            format,
            output,
        } => {
            session::run_report(&cfg, &session_id, &format, output.as_deref()).await?;
        }
        Commands::Purge => {
            session::run_purge(&cfg).await?;
        }
        Commands::Parse { .. } | Commands::Check { .. } => {}
    }

    Ok(())
}
