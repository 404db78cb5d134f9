use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use bk_core::hosting::{ChangeProposal, ChangeProposer, FileChange, HostingError};
use bk_core::types::ProposalRef;

use super::client::{GitHubClient, GitHubError};

/// [`ChangeProposer`] backed by GitHub pull requests.
///
/// A proposal becomes a branch cut from the base ref, one commit per file
/// change via the contents API, and a pull request against the base
/// branch.
pub struct GitHubProposer {
    client: GitHubClient,
}

impl GitHubProposer {
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }

    async fn base_sha(&self) -> Result<String, GitHubError> {
        let base = self.client.base_branch.clone();
        let reference = self
            .client
            .octocrab
            .repos(&self.client.owner, &self.client.repo)
            .get_ref(&octocrab::params::repos::Reference::Branch(base.clone()))
            .await?;

        match reference.object {
            octocrab::models::repos::Object::Commit { sha, .. } => Ok(sha),
            octocrab::models::repos::Object::Tag { sha, .. } => Ok(sha),
            _ => Err(GitHubError::UnresolvableBase(base)),
        }
    }

    /// Sha of `path` on `branch`, if the file exists there.
    async fn content_sha(&self, path: &str, branch: &str) -> Result<Option<String>, GitHubError> {
        let result = self
            .client
            .octocrab
            .repos(&self.client.owner, &self.client.repo)
            .get_content()
            .path(path)
            .r#ref(branch)
            .send()
            .await;

        match result {
            Ok(contents) => Ok(contents.items.into_iter().next().map(|i| i.sha)),
            Err(octocrab::Error::GitHub { source, .. })
                if source.status_code.as_u16() == 404 =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn apply_change(&self, change: &FileChange, branch: &str) -> Result<(), GitHubError> {
        let repos = self
            .client
            .octocrab
            .repos(&self.client.owner, &self.client.repo);
        match change {
            FileChange::Write { path, content } => {
                let message = format!("Update {}", path);
                match self.content_sha(path, branch).await? {
                    Some(sha) => {
                        repos
                            .update_file(path, &message, content, &sha)
                            .branch(branch)
                            .send()
                            .await?;
                    }
                    None => {
                        repos
                            .create_file(path, &message, content)
                            .branch(branch)
                            .send()
                            .await?;
                    }
                }
            }
            FileChange::Delete { path } => {
                let sha = self
                    .content_sha(path, branch)
                    .await?
                    .ok_or_else(|| GitHubError::UnresolvableBase(path.clone()))?;
                repos
                    .delete_file(path, &format!("Delete {}", path), &sha)
                    .branch(branch)
                    .send()
                    .await?;
            }
        }
        debug!(path = change.path(), branch, "file change applied");
        Ok(())
    }
}

#[async_trait]
impl ChangeProposer for GitHubProposer {
    async fn propose(&self, proposal: &ChangeProposal) -> Result<ProposalRef, HostingError> {
        // Unique head branch per publication; the logical branch name from
        // the proposal stays as the prefix for readability.
        let branch = format!(
            "{}-{}",
            proposal.branch,
            Utc::now().format("%Y%m%d%H%M%S")
        );

        let base_sha = self.base_sha().await.map_err(HostingError::from)?;
        self.client
            .octocrab
            .repos(&self.client.owner, &self.client.repo)
            .create_ref(
                &octocrab::params::repos::Reference::Branch(branch.clone()),
                base_sha,
            )
            .await
            .map_err(|e| HostingError::Backend(e.to_string()))?;

        for change in &proposal.changes {
            self.apply_change(change, &branch)
                .await
                .map_err(HostingError::from)?;
        }

        let pr = self
            .client
            .octocrab
            .pulls(&self.client.owner, &self.client.repo)
            .create(&proposal.title, &branch, &self.client.base_branch)
            .body(&proposal.body)
            .send()
            .await
            .map_err(|e| HostingError::Backend(e.to_string()))?;

        info!(number = pr.number, branch, "change proposal opened");
        Ok(ProposalRef {
            number: pr.number,
            url: pr.html_url.map(|u| u.to_string()),
        })
    }
}
