use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info};

use bk_core::hosting::{ChangeProposal, ChangeProposer, FileChange, IssueTracker};
use bk_core::registry::BoardRegistry;
use bk_core::store::HealthStore;
use bk_core::types::{HealthState, ProposalRef};

use crate::engine::{CorruptionNotice, HealthError};

/// Result of one attrition sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    /// Boards whose removal was proposed this sweep.
    pub proposed: Vec<ProposedRemoval>,
    /// Failing boards younger than the threshold, left alone.
    pub too_young: usize,
    pub corruption: Vec<CorruptionNotice>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProposedRemoval {
    pub board: bk_core::types::BoardId,
    pub proposal: ProposalRef,
    pub failing_for_days: i64,
}

// ---------------------------------------------------------------------------
// AttritionSweeper
// ---------------------------------------------------------------------------

/// Scheduled removal of boards whose failure streak exceeds the staleness
/// threshold. Runs independently of build runs; only reads durable state.
pub struct AttritionSweeper<'a> {
    store: &'a HealthStore,
    issues: &'a dyn IssueTracker,
    proposer: &'a dyn ChangeProposer,
    registry: &'a BoardRegistry,
    threshold: Duration,
}

impl<'a> AttritionSweeper<'a> {
    pub fn new(
        store: &'a HealthStore,
        issues: &'a dyn IssueTracker,
        proposer: &'a dyn ChangeProposer,
        registry: &'a BoardRegistry,
        threshold: Duration,
    ) -> Self {
        Self {
            store,
            issues,
            proposer,
            registry,
            threshold,
        }
    }

    /// Sweep every `Failing` record.
    ///
    /// Records at or past the threshold go `Stale`: a removal proposal is
    /// opened citing the linked issue, and the issue is closed. `Stale`
    /// records are not revisited (their removal is already proposed), and
    /// `Healthy`/`Removed` records are never touched.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, HealthError> {
        let mut report = SweepReport {
            proposed: Vec::new(),
            too_young: 0,
            corruption: Vec::new(),
            timestamp: now,
        };

        for mut record in self.store.list_by_state(HealthState::Failing).await? {
            let Some(streak_started_at) = record.streak_started_at else {
                corrupt(&mut report, &record.board, "failing record has no streak start");
                continue;
            };

            let age = now.signed_duration_since(streak_started_at);
            if age < self.threshold {
                debug!(board = %record.board, age_days = age.num_days(), "below threshold");
                report.too_young += 1;
                continue;
            }

            let Some(board) = self.registry.get(&record.board) else {
                corrupt(&mut report, &record.board, "failing record references a board with no declaration");
                continue;
            };

            let Some(issue) = record.issue.clone() else {
                corrupt(&mut report, &record.board, "sweep-eligible record has no linked issue");
                continue;
            };

            if !self.issues.is_open(&issue).await? {
                corrupt(
                    &mut report,
                    &record.board,
                    "linked failure issue is already closed",
                );
                continue;
            }

            let failing_for_days = age.num_days();
            let proposal = ChangeProposal {
                title: format!("boards: retire {}", board.id),
                body: format!(
                    "{} has been failing continuously for {} days \
                     (threshold: {} days). Removing its declaration; see #{} \
                     for the failure history.",
                    board.id,
                    failing_for_days,
                    self.threshold.num_days(),
                    issue.number
                ),
                branch: format!("attrition/{}-{}", board.vendor, board.model),
                changes: vec![FileChange::Delete {
                    path: board.spec_path.clone(),
                }],
            };
            let proposal_ref = self.proposer.propose(&proposal).await?;
            self.issues.close(&issue).await?;

            record.state = HealthState::Stale;
            record.updated_at = now;
            self.store.upsert(&record).await?;

            info!(
                board = %record.board,
                proposal = proposal_ref.number,
                failing_for_days,
                "board removal proposed"
            );
            report.proposed.push(ProposedRemoval {
                board: record.board.clone(),
                proposal: proposal_ref,
                failing_for_days,
            });
        }

        info!(
            proposed = report.proposed.len(),
            too_young = report.too_young,
            corrupt = report.corruption.len(),
            "attrition sweep complete"
        );
        Ok(report)
    }
}

fn corrupt(report: &mut SweepReport, board: &bk_core::types::BoardId, detail: &str) {
    tracing::error!(board = %board, detail, "health state corruption detected");
    report.corruption.push(CorruptionNotice {
        board: board.clone(),
        detail: detail.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::engine::HealthEngine;
    use crate::testutil::{registry_of, InMemoryIssues, RecordingProposer};
    use bk_core::types::{BoardId, BuildOutcome, HealthRecord, IssueRef};

    const LABEL_PREFIX: &str = "board-failure:";

    async fn store() -> HealthStore {
        HealthStore::new_in_memory().await.unwrap()
    }

    fn threshold() -> Duration {
        Duration::days(30)
    }

    #[tokio::test]
    async fn streak_past_threshold_goes_stale_with_removal_proposal() {
        let store = store().await;
        let issues = InMemoryIssues::default();
        let proposer = RecordingProposer::default();
        let registry = registry_of(&["vendorX/modelY"]);
        let board = BoardId::new("vendorX", "modelY");

        // Board fails, then stays failing for 31 days.
        let start = Utc::now() - Duration::days(31);
        let engine = HealthEngine::new(&store, &issues, &registry, LABEL_PREFIX);
        engine
            .ingest(&[BuildOutcome::failure(board.clone(), 1, "no boot")], start)
            .await
            .unwrap();

        let sweeper =
            AttritionSweeper::new(&store, &issues, &proposer, &registry, threshold());
        let report = sweeper.sweep(Utc::now()).await.unwrap();

        assert_eq!(report.proposed.len(), 1);
        assert_eq!(report.proposed[0].board, board);
        assert!(report.proposed[0].failing_for_days >= 30);

        let record = store.get(&board).await.unwrap().unwrap();
        assert_eq!(record.state, HealthState::Stale);
        // issue closed but still referenced by the record
        assert_eq!(issues.open_count(), 0);
        let issue_number = record.issue.unwrap().number;

        let proposals = proposer.proposals.lock().unwrap();
        assert_eq!(proposals.len(), 1);
        assert!(proposals[0].title.contains("vendorX/modelY"));
        assert!(proposals[0].body.contains(&format!("#{}", issue_number)));
        assert!(matches!(
            &proposals[0].changes[0],
            FileChange::Delete { path } if path == "boards/vendorX/modelY/board.toml"
        ));
    }

    #[tokio::test]
    async fn young_streaks_are_left_alone() {
        let store = store().await;
        let issues = InMemoryIssues::default();
        let proposer = RecordingProposer::default();
        let registry = registry_of(&["vendorX/modelY"]);
        let board = BoardId::new("vendorX", "modelY");

        let start = Utc::now() - Duration::days(5);
        let engine = HealthEngine::new(&store, &issues, &registry, LABEL_PREFIX);
        engine
            .ingest(&[BuildOutcome::failure(board.clone(), 1, "no boot")], start)
            .await
            .unwrap();

        let sweeper =
            AttritionSweeper::new(&store, &issues, &proposer, &registry, threshold());
        let report = sweeper.sweep(Utc::now()).await.unwrap();

        assert!(report.proposed.is_empty());
        assert_eq!(report.too_young, 1);
        let record = store.get(&board).await.unwrap().unwrap();
        assert_eq!(record.state, HealthState::Failing);
        assert_eq!(issues.open_count(), 1);
        assert!(proposer.proposals.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stale_records_are_not_reproposed() {
        let store = store().await;
        let issues = InMemoryIssues::default();
        let proposer = RecordingProposer::default();
        let registry = registry_of(&["vendorX/modelY"]);
        let board = BoardId::new("vendorX", "modelY");

        let start = Utc::now() - Duration::days(40);
        let engine = HealthEngine::new(&store, &issues, &registry, LABEL_PREFIX);
        engine
            .ingest(&[BuildOutcome::failure(board.clone(), 1, "no boot")], start)
            .await
            .unwrap();

        let sweeper =
            AttritionSweeper::new(&store, &issues, &proposer, &registry, threshold());
        sweeper.sweep(Utc::now()).await.unwrap();
        // second sweep: the record is stale now, nothing new proposed
        let report = sweeper.sweep(Utc::now()).await.unwrap();

        assert!(report.proposed.is_empty());
        assert_eq!(proposer.proposals.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn healthy_records_are_never_touched() {
        let store = store().await;
        let issues = InMemoryIssues::default();
        let proposer = RecordingProposer::default();
        let registry = registry_of(&["vendorX/modelY"]);
        let board = BoardId::new("vendorX", "modelY");
        store.upsert(&HealthRecord::healthy(board.clone())).await.unwrap();

        let sweeper =
            AttritionSweeper::new(&store, &issues, &proposer, &registry, threshold());
        let report = sweeper.sweep(Utc::now()).await.unwrap();

        assert!(report.proposed.is_empty());
        assert_eq!(report.too_young, 0);
        let record = store.get(&board).await.unwrap().unwrap();
        assert_eq!(record.state, HealthState::Healthy);
    }

    #[tokio::test]
    async fn closed_linked_issue_is_corruption() {
        let store = store().await;
        let issues = InMemoryIssues::default();
        let proposer = RecordingProposer::default();
        let registry = registry_of(&["vendorX/modelY"]);
        let board = BoardId::new("vendorX", "modelY");

        // Record claims an open issue, but the issue was closed externally.
        let issue = issues
            .open("Build failure: vendorX/modelY", "detail", vec![])
            .await
            .unwrap();
        issues.close(&issue).await.unwrap();
        store
            .upsert(&HealthRecord {
                board: board.clone(),
                state: HealthState::Failing,
                streak_started_at: Some(Utc::now() - Duration::days(45)),
                issue: Some(IssueRef {
                    number: issue.number,
                    url: None,
                }),
                last_run: 1,
                updated_at: Utc::now(),
            })
            .await
            .unwrap();

        let sweeper =
            AttritionSweeper::new(&store, &issues, &proposer, &registry, threshold());
        let report = sweeper.sweep(Utc::now()).await.unwrap();

        assert_eq!(report.corruption.len(), 1);
        assert!(report.proposed.is_empty());
        // record untouched pending manual reconciliation
        let record = store.get(&board).await.unwrap().unwrap();
        assert_eq!(record.state, HealthState::Failing);
    }

    #[tokio::test]
    async fn record_for_undeclared_board_is_corruption() {
        let store = store().await;
        let issues = InMemoryIssues::default();
        let proposer = RecordingProposer::default();
        let registry = registry_of(&[]);
        let board = BoardId::new("vendorX", "gone");

        store
            .upsert(&HealthRecord {
                board: board.clone(),
                state: HealthState::Failing,
                streak_started_at: Some(Utc::now() - Duration::days(45)),
                issue: Some(IssueRef { number: 9, url: None }),
                last_run: 1,
                updated_at: Utc::now(),
            })
            .await
            .unwrap();

        let sweeper =
            AttritionSweeper::new(&store, &issues, &proposer, &registry, threshold());
        let report = sweeper.sweep(Utc::now()).await.unwrap();
        assert_eq!(report.corruption.len(), 1);
        assert!(proposer.proposals.lock().unwrap().is_empty());
    }
}
