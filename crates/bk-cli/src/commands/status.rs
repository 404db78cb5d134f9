use bk_core::config::Config;
use bk_core::types::HealthState;

/// Run the `status` subcommand: pretty-print the board health table.
pub async fn run(config: &Config) -> anyhow::Result<()> {
    let store = super::open_store(config).await?;
    let records = store.list_all().await?;

    let mut healthy: u64 = 0;
    let mut failing: u64 = 0;
    let mut stale: u64 = 0;
    let mut removed: u64 = 0;
    for record in &records {
        match record.state {
            HealthState::Healthy => healthy += 1,
            HealthState::Failing => failing += 1,
            HealthState::Stale => stale += 1,
            HealthState::Removed => removed += 1,
        }
    }

    println!("boardkeeper status ({})", config.general.project_name);
    println!("{}", "-".repeat(40));
    println!("Tracked boards: {}", records.len());
    println!("  healthy:      {}", healthy);
    println!("  failing:      {}", failing);
    println!("  stale:        {}", stale);
    println!("  removed:      {}", removed);

    let attention: Vec<_> = records
        .iter()
        .filter(|r| matches!(r.state, HealthState::Failing | HealthState::Stale))
        .collect();
    if !attention.is_empty() {
        println!();
        for record in attention {
            let since = record
                .streak_started_at
                .map(|t| format!(" since {}", t.format("%Y-%m-%d")))
                .unwrap_or_default();
            let issue = record
                .issue
                .as_ref()
                .map(|i| format!(" (issue #{})", i.number))
                .unwrap_or_default();
            println!("  {}: {}{}{}", record.board, record.state, since, issue);
        }
    }

    Ok(())
}
