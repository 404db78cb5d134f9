use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info};

use bk_core::hosting::{HostingError, IssueTracker};
use bk_core::registry::BoardRegistry;
use bk_core::store::HealthStore;
use bk_core::types::{BoardId, BuildOutcome, BuildStatus, HealthState};

#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("store error: {0}")]
    Store(#[from] tokio_rusqlite::Error),

    #[error(transparent)]
    Hosting(#[from] HostingError),

    #[error("board {board} cannot transition from {from} to {to}")]
    InvalidTransition {
        board: BoardId,
        from: HealthState,
        to: HealthState,
    },
}

/// A health record that contradicts itself or its surroundings. The record
/// is reported and left untouched pending manual reconciliation, never
/// guessed at.
#[derive(Debug, Clone, Serialize)]
pub struct CorruptionNotice {
    pub board: BoardId,
    pub detail: String,
}

/// Counters from one ingestion batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub ingested: usize,
    pub new_failures: usize,
    pub repeat_failures: usize,
    pub recoveries: usize,
    pub unchanged: usize,
    /// Outcomes dropped by the run-recency guard.
    pub skipped_stale: usize,
    pub corruption: Vec<CorruptionNotice>,
    /// Per-outcome hosting errors; the batch continues past them.
    pub errors: Vec<String>,
}

// ---------------------------------------------------------------------------
// HealthEngine
// ---------------------------------------------------------------------------

/// Ingests build outcomes into the per-board health state machine and
/// keeps failure-tracking issues in sync.
///
/// All dependencies are explicit: the store, the issue tracker seam, and
/// the registry are passed in rather than held globally.
pub struct HealthEngine<'a> {
    store: &'a HealthStore,
    issues: &'a dyn IssueTracker,
    registry: &'a BoardRegistry,
    /// Stable label prefix; `<prefix><vendor>/<model>` identifies a
    /// board's issue exactly.
    label_prefix: String,
}

impl<'a> HealthEngine<'a> {
    pub fn new(
        store: &'a HealthStore,
        issues: &'a dyn IssueTracker,
        registry: &'a BoardRegistry,
        label_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            issues,
            registry,
            label_prefix: label_prefix.into(),
        }
    }

    fn failure_label(&self, board: &BoardId) -> String {
        format!("{}{}", self.label_prefix, board)
    }

    /// Ingest a batch of build outcomes.
    ///
    /// Build failures are routine signals here, never a pipeline error:
    /// one board's outcome (or a hosting hiccup while recording it) does
    /// not stop the rest of the batch.
    pub async fn ingest(
        &self,
        outcomes: &[BuildOutcome],
        now: DateTime<Utc>,
    ) -> Result<IngestReport, HealthError> {
        let mut report = IngestReport::default();
        for outcome in outcomes {
            report.ingested += 1;
            if let Err(e) = self.ingest_one(outcome, now, &mut report).await {
                error!(board = %outcome.board, error = %e, "outcome ingestion failed");
                report.errors.push(format!("{}: {}", outcome.board, e));
            }
        }
        info!(
            ingested = report.ingested,
            new_failures = report.new_failures,
            recoveries = report.recoveries,
            skipped_stale = report.skipped_stale,
            corrupt = report.corruption.len(),
            "ingestion batch complete"
        );
        Ok(report)
    }

    async fn ingest_one(
        &self,
        outcome: &BuildOutcome,
        now: DateTime<Utc>,
        report: &mut IngestReport,
    ) -> Result<(), HealthError> {
        if !self.registry.contains(&outcome.board) {
            corrupt(report, &outcome.board, "outcome references a board with no declaration");
            return Ok(());
        }

        let mut record = self.store.get_or_healthy(&outcome.board).await?;

        if record.state == HealthState::Removed {
            corrupt(report, &outcome.board, "outcome for a removed board");
            return Ok(());
        }

        // Recency guard: a late delivery from a superseded run must not
        // regress state a newer run already advanced.
        if outcome.run < record.last_run {
            debug!(
                board = %outcome.board,
                outcome_run = outcome.run,
                watermark = record.last_run,
                "stale outcome dropped"
            );
            report.skipped_stale += 1;
            return Ok(());
        }

        match (outcome.status, record.state) {
            (BuildStatus::Success, HealthState::Healthy) => {
                report.unchanged += 1;
            }
            (BuildStatus::Success, HealthState::Failing)
            | (BuildStatus::Success, HealthState::Stale) => {
                match record.issue.take() {
                    Some(issue) => self.issues.close(&issue).await?,
                    // The record still recovers, but the breached
                    // issue-linkage invariant is surfaced before the
                    // evidence is cleared.
                    None => corrupt(
                        report,
                        &outcome.board,
                        "recovering record has no linked issue",
                    ),
                }
                record.state = HealthState::Healthy;
                record.streak_started_at = None;
                info!(board = %outcome.board, run = outcome.run, "board recovered");
                report.recoveries += 1;
            }
            (BuildStatus::Failure, HealthState::Healthy) => {
                let label = self.failure_label(&outcome.board);
                // Check-then-open: concurrent or duplicate ingestion of the
                // same failure must reuse the open issue, never duplicate it.
                let issue = match self.issues.find_open(&label).await? {
                    Some(existing) => {
                        debug!(board = %outcome.board, issue = existing.number, "reusing open issue");
                        existing
                    }
                    None => {
                        self.issues
                            .open(
                                &format!("Build failure: {}", outcome.board),
                                &failure_detail(outcome),
                                vec![label],
                            )
                            .await?
                    }
                };
                record.state = HealthState::Failing;
                record.streak_started_at = Some(now);
                record.issue = Some(issue);
                info!(board = %outcome.board, run = outcome.run, "board started failing");
                report.new_failures += 1;
            }
            (BuildStatus::Failure, HealthState::Failing)
            | (BuildStatus::Failure, HealthState::Stale) => {
                let Some(issue) = record.issue.clone() else {
                    corrupt(report, &outcome.board, "failing record has no linked issue");
                    return Ok(());
                };
                // Streak start stays put: length is measured from the first
                // failure, not the most recent.
                self.issues.comment(&issue, &failure_detail(outcome)).await?;
                report.repeat_failures += 1;
            }
            (_, HealthState::Removed) => unreachable!("handled above"),
        }

        record.last_run = outcome.run;
        record.updated_at = now;
        self.store.upsert(&record).await?;
        Ok(())
    }
}

/// Record acceptance of a board's removal proposal: the single
/// authoritative `Stale` -> `Removed` trigger. Operates on the store
/// alone, so acceptance needs no hosting credentials.
pub async fn record_removal_accepted(
    store: &HealthStore,
    board: &BoardId,
) -> Result<(), HealthError> {
    let Some(mut record) = store.get(board).await? else {
        return Err(HealthError::InvalidTransition {
            board: board.clone(),
            from: HealthState::Healthy,
            to: HealthState::Removed,
        });
    };
    if !record.state.can_transition_to(&HealthState::Removed) {
        return Err(HealthError::InvalidTransition {
            board: board.clone(),
            from: record.state,
            to: HealthState::Removed,
        });
    }
    record.state = HealthState::Removed;
    record.updated_at = Utc::now();
    store.upsert(&record).await?;
    info!(board = %board, "board removal recorded");
    Ok(())
}

fn corrupt(report: &mut IngestReport, board: &BoardId, detail: &str) {
    error!(board = %board, detail, "health state corruption detected");
    report.corruption.push(CorruptionNotice {
        board: board.clone(),
        detail: detail.to_string(),
    });
}

fn failure_detail(outcome: &BuildOutcome) -> String {
    format!(
        "Build run {} failed at {}.\n\nReason: {}",
        outcome.run,
        outcome.finished_at.to_rfc3339(),
        outcome.reason.as_deref().unwrap_or("unknown")
    )
}
