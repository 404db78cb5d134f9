use std::io::BufRead;

use anyhow::Context;
use clap::ValueEnum;

use bk_core::config::Config;
use bk_core::types::ChangeSet;
use bk_matrix::BuildMatrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MatrixFormat {
    /// Pretty-printed JSON matrix.
    Json,
    /// `key=value` lines for a GitHub Actions job output.
    Github,
}

/// Run the `matrix` subcommand: resolve changed paths (args or stdin) to
/// the set of boards the orchestrator must rebuild.
pub fn run(config: &Config, paths: Vec<String>, format: MatrixFormat) -> anyhow::Result<()> {
    let paths = if paths.is_empty() {
        read_stdin_paths()?
    } else {
        paths
    };

    let registry = super::load_registry(config)?;
    let change_set: ChangeSet = paths.into_iter().collect();
    let matrix = BuildMatrix::from_change_set(&change_set, &registry, &config.versions);

    match format {
        MatrixFormat::Json => {
            let rendered =
                serde_json::to_string_pretty(&matrix).context("failed to render matrix")?;
            println!("{rendered}");
        }
        MatrixFormat::Github => {
            print!("{}", matrix.to_ci_output());
        }
    }

    Ok(())
}

fn read_stdin_paths() -> anyhow::Result<Vec<String>> {
    let stdin = std::io::stdin();
    let mut paths = Vec::new();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read paths from stdin")?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            paths.push(trimmed.to_string());
        }
    }
    Ok(paths)
}
