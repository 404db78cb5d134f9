mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::matrix::MatrixFormat;

/// boardkeeper CLI -- track upstream versions, resolve build matrices, and
/// manage board fleet health.
#[derive(Parser)]
#[command(name = "bk", version, about)]
struct Cli {
    /// Config file path (defaults to ~/.boardkeeper/config.toml).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit JSON logs instead of human-readable output.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll upstream remotes for new stable tags and propose version bumps.
    Track {
        /// Write bumps into the local registry checkout instead of
        /// opening a change proposal.
        #[arg(long)]
        local: bool,
        /// Report pending bumps without writing or proposing anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Resolve changed paths to the board build matrix.
    Matrix {
        /// Changed paths; read from stdin (one per line) when omitted.
        paths: Vec<String>,
        /// Output format.
        #[arg(long, value_enum, default_value_t = MatrixFormat::Json)]
        format: MatrixFormat,
    },

    /// Ingest build outcomes (JSON array) into the health store.
    Ingest {
        /// Only ingest outcomes from this run number.
        #[arg(long)]
        run: Option<u64>,
        /// Outcome file; read from stdin when omitted.
        file: Option<PathBuf>,
    },

    /// Sweep failing boards past the staleness threshold into removal
    /// proposals.
    Sweep,

    /// Record a merged removal proposal for a board.
    AcceptRemoval {
        /// Board id as `vendor/model`.
        board: String,
    },

    /// Show the board health table (default when no subcommand is given).
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = commands::load_config(cli.config.as_deref())?;
    if cli.json_logs {
        bk_telemetry::init_logging_json(&config.general);
    } else {
        bk_telemetry::init_logging(&config.general);
    }

    match cli.command {
        None | Some(Commands::Status) => {
            commands::status::run(&config).await?;
        }
        Some(Commands::Track { local, dry_run }) => {
            commands::track::run(&config, local, dry_run).await?;
        }
        Some(Commands::Matrix { paths, format }) => {
            commands::matrix::run(&config, paths, format)?;
        }
        Some(Commands::Ingest { run, file }) => {
            commands::ingest::run(&config, run, file.as_deref()).await?;
        }
        Some(Commands::Sweep) => {
            commands::sweep::run(&config).await?;
        }
        Some(Commands::AcceptRemoval { board }) => {
            commands::accept_removal::run(&config, &board).await?;
        }
    }

    Ok(())
}
