use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// BoardId
// ---------------------------------------------------------------------------

/// Identity of a board: the `vendor/model` path pair under the boards
/// directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardId(String);

impl BoardId {
    pub fn new(vendor: &str, model: &str) -> Self {
        Self(format!("{}/{}", vendor, model))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn vendor(&self) -> &str {
        self.0.split('/').next().unwrap_or(&self.0)
    }

    pub fn model(&self) -> &str {
        self.0.split('/').nth(1).unwrap_or("")
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BoardId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// A declared board configuration. Boards are declared on disk
/// (`boards/<vendor>/<model>/board.toml`) and only added or removed through
/// accepted change proposals; the core never creates them at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub vendor: String,
    pub model: String,
    /// CPU architecture, carried into the build matrix output.
    pub arch: String,
    /// Repo-relative directory prefix owning this board's files,
    /// with a trailing slash (`boards/vendorX/modelY/`).
    pub path_prefix: String,
    /// Repo-relative path of the board declaration file.
    pub spec_path: String,
}

// ---------------------------------------------------------------------------
// VersionRecord
// ---------------------------------------------------------------------------

/// Tracked upstream component version: the durable source of truth for
/// "what version are we building". Mutated only by the version tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Component name, e.g. `kernel` or `u-boot`.
    pub component: String,
    /// Current stable tag, e.g. `v6.6.4`.
    pub tag: String,
    /// Upstream remote URL, queried read-only for tag lists.
    pub remote: String,
}

// ---------------------------------------------------------------------------
// BuildOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Success,
    Failure,
}

/// Result of one board build in one run. Produced by the external build
/// orchestrator; the core only records it and passes artifact handles
/// through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildOutcome {
    pub board: BoardId,
    /// Monotone run number; ingestion drops outcomes older than a record's
    /// watermark so a late delivery cannot regress newer state.
    pub run: u64,
    pub status: BuildStatus,
    #[serde(default)]
    pub artifacts: Vec<String>,
    #[serde(default)]
    pub reason: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl BuildOutcome {
    pub fn success(board: BoardId, run: u64, artifacts: Vec<String>) -> Self {
        Self {
            board,
            run,
            status: BuildStatus::Success,
            artifacts,
            reason: None,
            finished_at: Utc::now(),
        }
    }

    pub fn failure(board: BoardId, run: u64, reason: impl Into<String>) -> Self {
        Self {
            board,
            run,
            status: BuildStatus::Failure,
            artifacts: Vec::new(),
            reason: Some(reason.into()),
            finished_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// HealthState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Failing,
    Stale,
    Removed,
}

impl HealthState {
    /// Returns `true` when a transition from `self` to `target` is valid.
    ///
    /// Valid transitions:
    /// - Healthy -> Failing  (first build failure)
    /// - Failing -> Healthy  (subsequent success)
    /// - Failing -> Stale    (failure streak crossed the attrition threshold)
    /// - Stale   -> Healthy  (recovered before the removal proposal merged)
    /// - Stale   -> Removed  (removal proposal accepted; terminal)
    pub fn can_transition_to(&self, target: &HealthState) -> bool {
        matches!(
            (self, target),
            (HealthState::Healthy, HealthState::Failing)
                | (HealthState::Failing, HealthState::Healthy)
                | (HealthState::Failing, HealthState::Stale)
                | (HealthState::Stale, HealthState::Healthy)
                | (HealthState::Stale, HealthState::Removed)
        )
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HealthState::Healthy => "healthy",
            HealthState::Failing => "failing",
            HealthState::Stale => "stale",
            HealthState::Removed => "removed",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// HealthRecord
// ---------------------------------------------------------------------------

/// Durable per-board health state, owned exclusively by the health engine.
/// Exactly one record per known board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub board: BoardId,
    pub state: HealthState,
    /// Set on the first Healthy -> Failing transition, never reset while
    /// already failing, cleared on return to Healthy. Streak length is
    /// measured from the first failure, not the most recent.
    pub streak_started_at: Option<DateTime<Utc>>,
    /// Linked failure-tracking issue. Stays recorded after the attrition
    /// sweep closes the issue so the removal proposal can cite it.
    pub issue: Option<IssueRef>,
    /// Highest build run ingested for this board.
    pub last_run: u64,
    pub updated_at: DateTime<Utc>,
}

impl HealthRecord {
    /// Fresh record for a board that has never failed.
    pub fn healthy(board: BoardId) -> Self {
        Self {
            board,
            state: HealthState::Healthy,
            streak_started_at: None,
            issue: None,
            last_run: 0,
            updated_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Hosting handles
// ---------------------------------------------------------------------------

/// Handle to a failure-tracking issue in the hosting collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    pub number: u64,
    #[serde(default)]
    pub url: Option<String>,
}

/// Handle to an open change proposal (pull request).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRef {
    pub number: u64,
    #[serde(default)]
    pub url: Option<String>,
}

// ---------------------------------------------------------------------------
// ChangeSet
// ---------------------------------------------------------------------------

/// Ordered set of repo-relative paths touched by a change proposal.
/// Ephemeral: produced by the hosting platform per proposal and consumed
/// once by the matrix resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub paths: Vec<String>,
}

impl ChangeSet {
    pub fn new(paths: Vec<String>) -> Self {
        Self { paths }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_id_parts() {
        let id = BoardId::new("vendorX", "modelY");
        assert_eq!(id.as_str(), "vendorX/modelY");
        assert_eq!(id.vendor(), "vendorX");
        assert_eq!(id.model(), "modelY");
        assert_eq!(id.to_string(), "vendorX/modelY");
    }

    #[test]
    fn health_state_valid_transitions() {
        use HealthState::*;
        assert!(Healthy.can_transition_to(&Failing));
        assert!(Failing.can_transition_to(&Healthy));
        assert!(Failing.can_transition_to(&Stale));
        assert!(Stale.can_transition_to(&Healthy));
        assert!(Stale.can_transition_to(&Removed));
    }

    #[test]
    fn health_state_invalid_transitions() {
        use HealthState::*;
        // A board never skips straight from healthy to stale, and removed
        // is terminal.
        assert!(!Healthy.can_transition_to(&Stale));
        assert!(!Healthy.can_transition_to(&Removed));
        assert!(!Failing.can_transition_to(&Removed));
        assert!(!Removed.can_transition_to(&Healthy));
        assert!(!Removed.can_transition_to(&Failing));
    }

    #[test]
    fn health_state_serde() {
        let s = serde_json::to_string(&HealthState::Failing).unwrap();
        assert_eq!(s, "\"failing\"");
        let back: HealthState = serde_json::from_str("\"stale\"").unwrap();
        assert_eq!(back, HealthState::Stale);
    }

    #[test]
    fn build_outcome_serde_defaults() {
        let json = r#"{
            "board": "vendorX/modelY",
            "run": 7,
            "status": "failure",
            "finished_at": "2026-01-01T00:00:00Z"
        }"#;
        let outcome: BuildOutcome = serde_json::from_str(json).unwrap();
        assert_eq!(outcome.board.as_str(), "vendorX/modelY");
        assert_eq!(outcome.status, BuildStatus::Failure);
        assert!(outcome.artifacts.is_empty());
        assert!(outcome.reason.is_none());
    }
}
