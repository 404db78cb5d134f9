//! Concurrent driver over the external build orchestrator.
//!
//! The orchestrator itself is a black box; this module only fans builds
//! out across the resolved board set and collects one outcome per board.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use bk_core::types::{Board, BuildOutcome, VersionRecord};

/// Capability provided by the external build orchestrator: build one board
/// at the given component versions. Build problems are expressed as
/// failure outcomes, not errors.
#[async_trait]
pub trait BuildRunner: Send + Sync {
    async fn build(&self, board: &Board, versions: &[VersionRecord]) -> BuildOutcome;
}

/// Drive builds for the resolved board set.
///
/// Boards build concurrently (gated by `max_concurrent`) with no ordering
/// guarantee and no shared mutable state between them. One board failing
/// or its task panicking never prevents another board's outcome from being
/// collected; a panicked task is recorded as a failure outcome for that
/// board.
pub async fn run_matrix(
    runner: Arc<dyn BuildRunner>,
    boards: Vec<Board>,
    versions: Arc<Vec<VersionRecord>>,
    run: u64,
    max_concurrent: u32,
) -> Vec<BuildOutcome> {
    let limit = max_concurrent.max(1) as usize;
    let gate = Arc::new(Semaphore::new(limit));

    let mut handles = Vec::with_capacity(boards.len());
    for board in boards {
        let runner = Arc::clone(&runner);
        let versions = Arc::clone(&versions);
        let gate = Arc::clone(&gate);
        let id = board.id.clone();
        let handle = tokio::spawn(async move {
            // Semaphore is never closed while handles are pending.
            let _permit = gate.acquire_owned().await.expect("semaphore open");
            debug!(board = %board.id, run, "board build starting");
            runner.build(&board, &versions).await
        });
        handles.push((id, handle));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for (id, handle) in handles {
        match handle.await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                warn!(board = %id, run, error = %e, "build task panicked");
                outcomes.push(BuildOutcome::failure(id, run, "build task panicked"));
            }
        }
    }
    outcomes
}
