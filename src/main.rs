//! # docedit CLI
//!
//! The `docedit` binary runs the editing backend, or applies a single
//! instruction to a local file.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docedit serve` | Start the HTTP server |
//! | `docedit edit <file> "<prompt>"` | Edit a local file through the streaming pipeline |
//! | `docedit lines <file>` | Print the line-numbered view the model sees |
//!
//! ## Examples
//!
//! ```bash
//! GROQ_API_KEY=... docedit --config ./config/docedit.toml serve
//! docedit edit README.md "replace line 1 with a catchier title"
//! docedit edit README.md "delete lines 4-6" --json | jq .type
//! ```
//!
//! Logging goes to stderr; set `RUST_LOG=docedit=debug` to follow each
//! pipeline phase.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use docedit::progress::OutputMode;
use docedit::{config, edit_cmd, server};

/// docedit: backend for an AI-assisted document editor.
#[derive(Parser)]
#[command(
    name = "docedit",
    about = "docedit: natural-language document edits, streamed line by line",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/docedit.toml`. Built-in defaults are used when
    /// the file does not exist.
    #[arg(long, global = true, default_value = "./config/docedit.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// Binds to `[server].bind` and serves the documents API and the
    /// streaming edit endpoint.
    Serve,

    /// Apply a natural-language edit to a local file.
    ///
    /// Streams progress while the model works and writes the file back
    /// when the edit lands.
    Edit {
        /// File to edit.
        file: PathBuf,

        /// The instruction, e.g. "add a conclusion after line 20".
        prompt: String,

        /// Show the edit without writing the file.
        #[arg(long)]
        dry_run: bool,

        /// Emit one JSON event per line instead of human narration.
        #[arg(long)]
        json: bool,
    },

    /// Print a file with 1-indexed line numbers.
    Lines {
        /// File to print.
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Lines { file } = &cli.command {
        return edit_cmd::run_lines(file);
    }

    let cfg = config::load_or_minimal(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Edit {
            file,
            prompt,
            dry_run,
            json,
        } => {
            let mode = if json {
                OutputMode::Json
            } else {
                OutputMode::default_for_tty()
            };
            edit_cmd::run_edit(&cfg, &file, &prompt, dry_run, mode).await?;
        }
        Commands::Lines { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
