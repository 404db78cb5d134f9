//! Seams to the hosting collaborator (issue tracker + change proposals).
//!
//! The engines depend on these traits only; the GitHub implementation lives
//! in `bk-integrations`, and tests supply in-memory fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{IssueRef, ProposalRef};

#[derive(Debug, thiserror::Error)]
pub enum HostingError {
    #[error("hosting backend error: {0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// Change proposals
// ---------------------------------------------------------------------------

/// A single file change carried by a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum FileChange {
    Write { path: String, content: String },
    Delete { path: String },
}

impl FileChange {
    pub fn path(&self) -> &str {
        match self {
            FileChange::Write { path, .. } | FileChange::Delete { path } => path,
        }
    }
}

/// A reviewable set of file changes submitted against the board/version
/// registry, analogous to a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeProposal {
    pub title: String,
    pub body: String,
    /// Head branch name the proposal is published on.
    pub branch: String,
    pub changes: Vec<FileChange>,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Failure-tracking issue operations. Lookups are exact-match on a stable
/// per-board label, never fuzzy title search.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Find the open issue carrying `label`, if any.
    async fn find_open(&self, label: &str) -> Result<Option<IssueRef>, HostingError>;

    async fn open(
        &self,
        title: &str,
        body: &str,
        labels: Vec<String>,
    ) -> Result<IssueRef, HostingError>;

    /// Append failure detail to an existing issue.
    async fn comment(&self, issue: &IssueRef, body: &str) -> Result<(), HostingError>;

    /// Close an issue. Closing an already-closed issue is a no-op.
    async fn close(&self, issue: &IssueRef) -> Result<(), HostingError>;

    async fn is_open(&self, issue: &IssueRef) -> Result<bool, HostingError>;
}

/// Publishes change proposals against the registry.
#[async_trait]
pub trait ChangeProposer: Send + Sync {
    async fn propose(&self, proposal: &ChangeProposal) -> Result<ProposalRef, HostingError>;
}
