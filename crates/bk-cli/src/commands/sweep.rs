use chrono::Utc;

use bk_core::config::Config;
use bk_health::AttritionSweeper;
use bk_integrations::{GitHubIssues, GitHubProposer};

/// Run the `sweep` subcommand: propose removal of every board failing
/// longer than the staleness threshold.
pub async fn run(config: &Config) -> anyhow::Result<()> {
    let store = super::open_store(config).await?;
    let registry = super::load_registry(config)?;
    let client = super::github_client(config)?;
    let issues = GitHubIssues::new(client.clone());
    let proposer = GitHubProposer::new(client);

    let sweeper = AttritionSweeper::new(
        &store,
        &issues,
        &proposer,
        &registry,
        config.attrition.threshold(),
    );
    let report = sweeper.sweep(Utc::now()).await?;

    if report.proposed.is_empty() {
        println!(
            "No boards past the {}-day threshold ({} failing but younger).",
            config.attrition.staleness_days, report.too_young
        );
    } else {
        for removal in &report.proposed {
            println!(
                "{}: removal proposed (#{}, failing for {} days)",
                removal.board, removal.proposal.number, removal.failing_for_days
            );
        }
    }
    for notice in &report.corruption {
        println!("corruption: {}: {}", notice.board, notice.detail);
    }

    Ok(())
}
