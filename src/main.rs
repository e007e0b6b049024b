//! # Commit Corpus CLI (`corpus`)
//!
//! The `corpus` binary drives the crawl-and-classify pipeline and inspects
//! its output.
//!
//! ## Usage
//!
//! ```bash
//! corpus --config ./config/corpus.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `corpus crawl` | Search every keyword phrase and store new commits |
//! | `corpus classify` | Decide restricted / admissible for new repositories |
//! | `corpus run` | Crawl, then classify |
//! | `corpus export` | Write admissible commits as JSON Lines |
//! | `corpus stats` | Show corpus and classification counts |
//! | `corpus keywords` | List the search phrases |
//!
//! ## Examples
//!
//! ```bash
//! # Crawl two specific phrases
//! corpus crawl --keyword "sql injection fix" --keyword "sql injection audit"
//!
//! # Classify with JSON progress for a log collector
//! corpus --progress json classify
//!
//! # Export everything, including restricted repositories
//! corpus export --include-restricted --output all.jsonl
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commit_corpus::cancel::{install_ctrl_c_handler, CancellationToken};
use commit_corpus::config;
use commit_corpus::export;
use commit_corpus::pipeline::{self, CrawlSelection};
use commit_corpus::progress::ProgressMode;
use commit_corpus::stats;

/// Commit Corpus CLI: build a security-fix commit dataset from GitHub search.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file does not exist, built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "corpus",
    about = "Commit Corpus: crawl GitHub commit search into a resumable, classified dataset",
    version,
    long_about = "Commit Corpus searches GitHub commits for security-fix phrases, stores each \
    (repository, sha) once in a crash-safe JSON corpus, and classifies every discovered \
    repository as admissible or restricted from its name and README. Every run can be \
    interrupted with Ctrl-C and resumed."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/corpus.toml")]
    config: PathBuf,

    /// Progress output on stderr. Defaults to `human` on a TTY, else `off`.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    /// Log filter when `RUST_LOG` is not set (e.g. `debug`, `commit_corpus=trace`).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Search GitHub commits for every keyword phrase.
    ///
    /// New `(repository, sha)` pairs are appended to the commit corpus and
    /// flushed one by one. Already-known commits are skipped.
    Crawl {
        /// Search only this phrase (repeatable). Defaults to the full vocabulary.
        #[arg(long = "keyword")]
        keywords: Vec<String>,

        /// Search only the first N phrases.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Classify every repository in the corpus that has no verdict yet.
    ///
    /// Requires a prior crawl.
    Classify,

    /// Crawl, then classify.
    Run {
        /// Search only this phrase (repeatable).
        #[arg(long = "keyword")]
        keywords: Vec<String>,

        /// Search only the first N phrases.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Export commits as JSON Lines.
    Export {
        /// Output file. Writes to stdout when omitted.
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Also export commits from restricted and unclassified repositories.
        #[arg(long)]
        include_restricted: bool,
    },

    /// Show corpus and classification counts.
    Stats,

    /// Print every search phrase the current config produces.
    Keywords,
}

fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let cfg = config::load_or_default(&cli.config)?;
    let progress_mode = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);
    let reporter = progress_mode.reporter();

    let cancel = CancellationToken::new();

    match cli.command {
        Commands::Crawl { keywords, limit } => {
            install_ctrl_c_handler(cancel.clone());
            let selection = CrawlSelection { keywords, limit };
            pipeline::run_crawl(&cfg, &selection, cancel, reporter.as_ref()).await?;
        }
        Commands::Classify => {
            install_ctrl_c_handler(cancel.clone());
            pipeline::run_classify(&cfg, cancel, reporter.as_ref()).await?;
        }
        Commands::Run { keywords, limit } => {
            install_ctrl_c_handler(cancel.clone());
            let selection = CrawlSelection { keywords, limit };
            pipeline::run_all(&cfg, &selection, cancel, reporter.as_ref()).await?;
        }
        Commands::Export {
            output,
            include_restricted,
        } => {
            export::run_export(&cfg, output.as_deref(), include_restricted)?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg)?;
        }
        Commands::Keywords => {
            let phrases = cfg.vocabulary.keyword_phrases();
            for phrase in &phrases {
                println!("{}", phrase);
            }
            eprintln!("{} phrases", phrases.len());
        }
    }

    Ok(())
}
