//! # aibook CLI
//!
//! The `aibook` binary drives the book tooling: indexing the docs tree,
//! looking content up, chatting with the RAG endpoint, serving a local
//! preview, and inspecting the artifact.
//!
//! ## Usage
//!
//! ```bash
//! aibook --config ./aibook.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `aibook index` | Build `book-content.json` from the docs tree |
//! | `aibook search "<query>"` | Substring lookup over the artifact |
//! | `aibook chat ["<query>"]` | Ask once, or start an interactive session |
//! | `aibook serve` | Start the local preview server |
//! | `aibook stats` | Summarize the artifact |
//!
//! ## Examples
//!
//! ```bash
//! # Index with a custom docs root, failing on the first bad file
//! aibook index --root ./book/docs --strict
//!
//! # Check what would be indexed without writing anything
//! aibook index --dry-run
//!
//! # Ask about a passage only
//! aibook chat "What does this mean?" --selected-text "QoS profiles trade latency for reliability."
//! ```

use aibook::progress::ProgressMode;
use aibook::{chat_cmd, config, indexer, lookup, server, stats};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "./aibook.toml";

/// aibook: content indexer, lookup, preview server, and RAG chat client
/// for the Embodied AI Systems Book.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the default file is absent, built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "aibook",
    about = "aibook — content indexer, lookup, and chat client for the Embodied AI Systems Book",
    version,
    long_about = "aibook turns the book's markdown tree into a JSON content artifact, \
    searches that artifact, forwards questions to the book's RAG chat endpoint, and can serve \
    the artifact with a local chat endpoint for offline previews."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./aibook.toml`. A missing default file falls back to
    /// built-in settings; an explicitly given file must exist.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Build the content artifact from the docs tree.
    ///
    /// Walks `[content].root`, resolves each markdown file's title, module,
    /// and chapter, and writes the records as a JSON array. Files that
    /// cannot be read are reported and skipped unless `--strict` is set.
    Index {
        /// Override `[content].root`.
        #[arg(long)]
        root: Option<PathBuf>,

        /// Override `[output].path`.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Abort on the first file that cannot be indexed.
        #[arg(long)]
        strict: bool,

        /// Dry run: report counts without writing the artifact.
        #[arg(long)]
        dry_run: bool,

        /// Progress output on stderr. Defaults to `human` on a TTY, otherwise `off`.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Search the artifact.
    ///
    /// Case-insensitive substring match on title, content, and module,
    /// in artifact order.
    Search {
        /// The search query string.
        query: String,

        /// Artifact path or URL. Defaults to `[lookup].source`, then `[output].path`.
        #[arg(long)]
        source: Option<String>,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,

        /// Print matching records as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Ask the chat endpoint.
    ///
    /// With QUERY, asks once and prints the answer. Without it, starts a
    /// line-oriented session on stdin.
    Chat {
        /// Question to ask.
        query: Option<String>,

        /// Restrict the answer to this passage.
        #[arg(long)]
        selected_text: Option<String>,
    },

    /// Start the local preview server.
    ///
    /// Binds to `[server].bind` and serves the artifact, a search endpoint,
    /// and a chat endpoint answering from the artifact.
    Serve {
        /// Artifact to serve. Defaults to `[output].path`.
        #[arg(long)]
        artifact: Option<PathBuf>,
    },

    /// Summarize the artifact.
    Stats {
        /// Artifact to read. Defaults to `[output].path`.
        #[arg(long)]
        artifact: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let required = cli.config != PathBuf::from(DEFAULT_CONFIG);
    let cfg = config::load_or_default(&cli.config, required)?;

    match cli.command {
        Commands::Index {
            root,
            output,
            strict,
            dry_run,
            progress,
        } => {
            let opts = indexer::IndexOptions {
                root,
                output,
                strict,
                dry_run,
            };
            let reporter = progress.unwrap_or_else(ProgressMode::default_for_tty).reporter();
            indexer::run_index(&cfg, &opts, reporter.as_ref())?;
        }
        Commands::Search {
            query,
            source,
            limit,
            json,
        } => {
            lookup::run_search(&cfg, &query, source, limit, json).await?;
        }
        Commands::Chat {
            query,
            selected_text,
        } => {
            chat_cmd::run_chat(&cfg, query, selected_text).await?;
        }
        Commands::Serve { artifact } => {
            server::run_server(&cfg, artifact.as_deref()).await?;
        }
        Commands::Stats { artifact } => {
            let artifact = artifact.unwrap_or_else(|| cfg.output.path.clone());
            stats::run_stats(&artifact)?;
        }
    }

    Ok(())
}
