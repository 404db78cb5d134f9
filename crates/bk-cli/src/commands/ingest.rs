use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::Utc;

use bk_core::config::Config;
use bk_core::types::BuildOutcome;
use bk_health::HealthEngine;
use bk_integrations::GitHubIssues;

/// Run the `ingest` subcommand: read orchestrator build outcomes (JSON
/// array, file or stdin) and fold them into the health store.
pub async fn run(
    config: &Config,
    run_filter: Option<u64>,
    file: Option<&Path>,
) -> anyhow::Result<()> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read outcomes from stdin")?;
            buf
        }
    };

    let mut outcomes: Vec<BuildOutcome> =
        serde_json::from_str(&raw).context("invalid build outcome JSON")?;
    if let Some(run) = run_filter {
        let before = outcomes.len();
        outcomes.retain(|o| o.run == run);
        if outcomes.len() < before {
            println!("Dropped {} outcome(s) not from run {run}.", before - outcomes.len());
        }
    }

    if outcomes.is_empty() {
        println!("No outcomes to ingest.");
        return Ok(());
    }

    let store = super::open_store(config).await?;
    let registry = super::load_registry(config)?;
    let client = super::github_client(config)?;
    let issues = GitHubIssues::new(client);
    let engine = HealthEngine::new(
        &store,
        &issues,
        &registry,
        config.github.failure_label_prefix.clone(),
    );

    let report = engine.ingest(&outcomes, Utc::now()).await?;

    println!("Ingested {} outcome(s):", report.ingested);
    println!("  new failures:     {}", report.new_failures);
    println!("  repeat failures:  {}", report.repeat_failures);
    println!("  recoveries:       {}", report.recoveries);
    println!("  unchanged:        {}", report.unchanged);
    println!("  skipped (stale):  {}", report.skipped_stale);
    for notice in &report.corruption {
        println!("  corruption: {}: {}", notice.board, notice.detail);
    }
    for error in &report.errors {
        println!("  error: {error}");
    }

    Ok(())
}
