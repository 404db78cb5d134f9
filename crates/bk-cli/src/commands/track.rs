use anyhow::Context;

use bk_core::config::Config;
use bk_core::versionfile;
use bk_integrations::GitHubProposer;
use bk_tracker::{GitTagSource, VersionTracker};

/// Run the `track` subcommand: poll every configured remote and either
/// report, locally apply, or propose the pending version bumps.
pub async fn run(config: &Config, local: bool, dry_run: bool) -> anyhow::Result<()> {
    let root = super::registry_root(config);
    let records = versionfile::load_records(&root, &config.versions)
        .with_context(|| format!("failed to read version files under {}", root.display()))?;

    if records.is_empty() {
        println!(
            "No version files found under {}/{}",
            root.display(),
            config.versions.dir
        );
        return Ok(());
    }

    let source = GitTagSource;
    let tracker = VersionTracker::new(&source, &config.versions);
    let report = tracker.check(&records);

    for failure in &report.failures {
        println!(
            "warning: {} ({}): {}",
            failure.component, failure.remote, failure.reason
        );
    }

    if report.is_noop() {
        println!("All {} component(s) up to date.", records.len());
        return Ok(());
    }

    for update in &report.updates {
        println!("{}: {} -> {}", update.component, update.current, update.latest);
    }

    if dry_run {
        println!("Dry run: {} pending bump(s), nothing written.", report.updates.len());
        return Ok(());
    }

    if local {
        tracker.apply_updates(&root, &report.updates)?;
        println!("Updated {} version file(s) under {}.", report.updates.len(), root.display());
        return Ok(());
    }

    let client = super::github_client(config)?;
    let proposer = GitHubProposer::new(client);
    if let Some(proposal) = tracker.propose(&report.updates, &proposer).await? {
        match &proposal.url {
            Some(url) => println!("Opened proposal #{}: {}", proposal.number, url),
            None => println!("Opened proposal #{}", proposal.number),
        }
    }

    Ok(())
}
