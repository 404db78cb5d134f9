use std::path::Path;

use serde::Serialize;

use tracing::{info, warn};

use bk_core::config::VersionsConfig;
use bk_core::hosting::{ChangeProposal, ChangeProposer, FileChange, HostingError};
use bk_core::types::{ProposalRef, VersionRecord};
use bk_core::versionfile;

use crate::tags::{latest_stable, TagSource};

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// Remote unreachable or refused. Transient: skipped for this run,
    /// retried next schedule, never fatal to other remotes.
    #[error("failed to fetch tags from {remote}: {reason}")]
    Fetch { remote: String, reason: String },

    /// The remote advertised no tag matching the stable pattern. Reported
    /// like a fetch failure for that remote.
    #[error("no stable tag found on {remote}")]
    NoStableTag { remote: String },

    #[error(transparent)]
    Hosting(#[from] HostingError),

    #[error(transparent)]
    VersionFile(#[from] versionfile::VersionFileError),
}

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// A pending version bump for one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionUpdate {
    pub component: String,
    pub current: String,
    pub latest: String,
    /// Repo-relative path of the version file to rewrite.
    pub path: String,
}

impl VersionUpdate {
    /// Human-readable one-liner for proposal bodies and logs.
    pub fn summary(&self) -> String {
        format!("{} bumped to {}", self.component, self.latest)
    }
}

/// A per-remote failure recorded during a poll.
#[derive(Debug, Clone, Serialize)]
pub struct RemoteFailure {
    pub component: String,
    pub remote: String,
    pub reason: String,
}

/// Outcome of one polling run over all configured remotes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrackerReport {
    pub updates: Vec<VersionUpdate>,
    pub failures: Vec<RemoteFailure>,
}

impl TrackerReport {
    pub fn is_noop(&self) -> bool {
        self.updates.is_empty()
    }
}

// ---------------------------------------------------------------------------
// VersionTracker
// ---------------------------------------------------------------------------

/// Polls upstream remotes for new stable tags and proposes version-file
/// updates. Each run is a pure function of (current records, fresh remote
/// state); with no upstream change it emits nothing.
pub struct VersionTracker<'a, S: TagSource> {
    source: &'a S,
    versions: &'a VersionsConfig,
}

impl<'a, S: TagSource> VersionTracker<'a, S> {
    pub fn new(source: &'a S, versions: &'a VersionsConfig) -> Self {
        Self { source, versions }
    }

    /// Compare each record against the latest stable tag on its remote.
    ///
    /// A remote failure or a remote with no stable tag is recorded in the
    /// report and does not stop the remaining remotes.
    pub fn check(&self, records: &[VersionRecord]) -> TrackerReport {
        let mut report = TrackerReport::default();

        for record in records {
            let tags = match self.source.list_tags(&record.remote) {
                Ok(tags) => tags,
                Err(e) => {
                    warn!(
                        component = record.component,
                        remote = record.remote,
                        error = %e,
                        "tag fetch failed, skipping remote this run"
                    );
                    report.failures.push(RemoteFailure {
                        component: record.component.clone(),
                        remote: record.remote.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let Some(latest) = latest_stable(&tags) else {
                let err = TrackerError::NoStableTag {
                    remote: record.remote.clone(),
                };
                warn!(component = record.component, error = %err, "no stable tag");
                report.failures.push(RemoteFailure {
                    component: record.component.clone(),
                    remote: record.remote.clone(),
                    reason: err.to_string(),
                });
                continue;
            };

            if latest.as_str() != record.tag {
                info!(
                    component = record.component,
                    current = record.tag,
                    latest = latest.as_str(),
                    "upstream version change detected"
                );
                report.updates.push(VersionUpdate {
                    component: record.component.clone(),
                    current: record.tag.clone(),
                    latest: latest.as_str().to_string(),
                    path: self.versions.file_path(&record.component),
                });
            }
        }

        report
    }

    /// Publish one change proposal batching every pending bump.
    ///
    /// Returns `None` without side effects when there is nothing to bump,
    /// keeping repeated runs idempotent.
    pub async fn propose(
        &self,
        updates: &[VersionUpdate],
        proposer: &dyn ChangeProposer,
    ) -> Result<Option<ProposalRef>, TrackerError> {
        if updates.is_empty() {
            return Ok(None);
        }

        let proposal = build_proposal(updates);
        let proposal_ref = proposer.propose(&proposal).await?;
        info!(
            proposal = proposal_ref.number,
            components = updates.len(),
            "version bump proposal opened"
        );
        Ok(Some(proposal_ref))
    }

    /// Write pending bumps straight into the local registry checkout
    /// instead of publishing a proposal (local/dry-run operation).
    pub fn apply_updates(&self, root: &Path, updates: &[VersionUpdate]) -> Result<(), TrackerError> {
        for update in updates {
            versionfile::write_tag(root, self.versions, &update.component, &update.latest)?;
            info!(component = update.component, tag = update.latest, "version file updated");
        }
        Ok(())
    }
}

fn build_proposal(updates: &[VersionUpdate]) -> ChangeProposal {
    let title = if updates.len() == 1 {
        format!(
            "chore(versions): bump {} to {}",
            updates[0].component, updates[0].latest
        )
    } else {
        let names: Vec<&str> = updates.iter().map(|u| u.component.as_str()).collect();
        format!("chore(versions): bump {}", names.join(", "))
    };

    let mut body = String::from("Automated upstream version bump.\n\n");
    for update in updates {
        body.push_str(&format!(
            "- {} ({} -> {})\n",
            update.summary(),
            update.current,
            update.latest
        ));
    }

    let changes = updates
        .iter()
        .map(|u| FileChange::Write {
            path: u.path.clone(),
            content: versionfile::file_content(&u.latest),
        })
        .collect();

    ChangeProposal {
        title,
        body,
        branch: "chore/version-bump".to_string(),
        changes,
    }
}
