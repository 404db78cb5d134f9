use async_trait::async_trait;
use tracing::debug;

use bk_core::hosting::{HostingError, IssueTracker};
use bk_core::types::IssueRef;

use super::client::GitHubClient;

/// [`IssueTracker`] backed by GitHub issues.
///
/// Each board's failure-tracking issue carries a stable per-board label,
/// so lookups are exact label matches rather than fuzzy title searches.
pub struct GitHubIssues {
    client: GitHubClient,
}

impl GitHubIssues {
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IssueTracker for GitHubIssues {
    async fn find_open(&self, label: &str) -> Result<Option<IssueRef>, HostingError> {
        let page = self
            .client
            .octocrab
            .issues(&self.client.owner, &self.client.repo)
            .list()
            .state(octocrab::params::State::Open)
            .labels(&[label.to_string()])
            .per_page(10)
            .send()
            .await
            .map_err(|e| HostingError::Backend(e.to_string()))?;

        let found = page
            .items
            .into_iter()
            .find(|i| i.labels.iter().any(|l| l.name == label))
            .map(|i| IssueRef {
                number: i.number,
                url: Some(i.html_url.to_string()),
            });
        debug!(label, found = found.is_some(), "open issue lookup");
        Ok(found)
    }

    async fn open(
        &self,
        title: &str,
        body: &str,
        labels: Vec<String>,
    ) -> Result<IssueRef, HostingError> {
        let issue = self
            .client
            .octocrab
            .issues(&self.client.owner, &self.client.repo)
            .create(title)
            .body(body)
            .labels(labels)
            .send()
            .await
            .map_err(|e| HostingError::Backend(e.to_string()))?;

        debug!(number = issue.number, "issue opened");
        Ok(IssueRef {
            number: issue.number,
            url: Some(issue.html_url.to_string()),
        })
    }

    async fn comment(&self, issue: &IssueRef, body: &str) -> Result<(), HostingError> {
        self.client
            .octocrab
            .issues(&self.client.owner, &self.client.repo)
            .create_comment(issue.number, body)
            .await
            .map_err(|e| HostingError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn close(&self, issue: &IssueRef) -> Result<(), HostingError> {
        self.client
            .octocrab
            .issues(&self.client.owner, &self.client.repo)
            .update(issue.number)
            .state(octocrab::models::IssueState::Closed)
            .send()
            .await
            .map_err(|e| HostingError::Backend(e.to_string()))?;
        debug!(number = issue.number, "issue closed");
        Ok(())
    }

    async fn is_open(&self, issue: &IssueRef) -> Result<bool, HostingError> {
        let issue = self
            .client
            .octocrab
            .issues(&self.client.owner, &self.client.repo)
            .get(issue.number)
            .await
            .map_err(|e| HostingError::Backend(e.to_string()))?;
        Ok(issue.state == octocrab::models::IssueState::Open)
    }
}
