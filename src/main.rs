//! # Topic Harness CLI (`topics`)
//!
//! All configuration beyond the config file is gathered through prompts
//! with stated defaults, e.g. `Enter database name (default: default_database): `.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `topics analyze` | Ingest a directory, ask for the top topics, write the report, optionally chat |
//! | `topics url` | Ingest one web page, show its top five topics, then chat |
//! | `topics databases` | List database names already created |
//!
//! ## Examples
//!
//! ```bash
//! topics analyze --config ./config/topics.toml
//! topics analyze --progress json 2> progress.jsonl
//! RUST_LOG=debug topics url
//! ```
//!
//! Exit code is 1 when a database name is already taken, when the initial
//! topic query gets no usable answer, or on any other fatal error.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use topic_harness::config::{self, DEFAULT_CONFIG_PATH};
use topic_harness::driver;
use topic_harness::logging;
use topic_harness::progress::ProgressMode;
use topic_harness::prompt::ConsolePrompter;

/// Topic Harness: ingest documents, summarize their top topics with a
/// language model, and chat about them.
#[derive(Parser)]
#[command(
    name = "topics",
    about = "Ingest documents, summarize their top topics with a language model, and chat about them",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// A missing file at the default path means built-in defaults.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Ingestion progress on stderr. Defaults to `human` on a terminal,
    /// `off` otherwise.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a directory of .txt, .md and .pdf files.
    ///
    /// Prompts for a database name, collection, source directory, topic
    /// focus, chunking plan and report path, then ingests, queries, and
    /// writes a Markdown report.
    Analyze,

    /// Chat with a single web page.
    Url,

    /// List database names that have already been used.
    Databases,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.logging)?;

    let mut prompter = ConsolePrompter::console();

    match cli.command {
        Commands::Analyze => {
            let mode = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);
            let reporter = mode.reporter();
            driver::run_analyze(&mut prompter, &cfg, reporter.as_ref()).await?;
        }
        Commands::Url => {
            driver::run_url(&mut prompter, &cfg).await?;
        }
        Commands::Databases => {
            driver::list_databases(&mut prompter, &cfg)?;
        }
    }

    Ok(())
}
