//! In-memory fakes for the hosting collaborator, shared by engine and
//! sweep tests.

use std::sync::Mutex;

use async_trait::async_trait;

use bk_core::hosting::{ChangeProposal, ChangeProposer, HostingError, IssueTracker};
use bk_core::registry::BoardRegistry;
use bk_core::types::{Board, BoardId, IssueRef, ProposalRef};

#[derive(Debug, Clone)]
pub struct FakeIssue {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub open: bool,
    pub comments: Vec<String>,
}

#[derive(Default)]
pub struct InMemoryIssues {
    issues: Mutex<Vec<FakeIssue>>,
}

impl InMemoryIssues {
    pub fn open_count(&self) -> usize {
        self.issues.lock().unwrap().iter().filter(|i| i.open).count()
    }

    pub fn get(&self, number: u64) -> FakeIssue {
        self.issues
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.number == number)
            .cloned()
            .expect("issue exists")
    }
}

#[async_trait]
impl IssueTracker for InMemoryIssues {
    async fn find_open(&self, label: &str) -> Result<Option<IssueRef>, HostingError> {
        Ok(self
            .issues
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.open && i.labels.iter().any(|l| l == label))
            .map(|i| IssueRef {
                number: i.number,
                url: None,
            }))
    }

    async fn open(
        &self,
        title: &str,
        body: &str,
        labels: Vec<String>,
    ) -> Result<IssueRef, HostingError> {
        let mut issues = self.issues.lock().unwrap();
        let number = issues.len() as u64 + 1;
        issues.push(FakeIssue {
            number,
            title: title.to_string(),
            body: body.to_string(),
            labels,
            open: true,
            comments: Vec::new(),
        });
        Ok(IssueRef { number, url: None })
    }

    async fn comment(&self, issue: &IssueRef, body: &str) -> Result<(), HostingError> {
        let mut issues = self.issues.lock().unwrap();
        let found = issues
            .iter_mut()
            .find(|i| i.number == issue.number)
            .ok_or_else(|| HostingError::Backend(format!("no issue {}", issue.number)))?;
        found.comments.push(body.to_string());
        Ok(())
    }

    async fn close(&self, issue: &IssueRef) -> Result<(), HostingError> {
        let mut issues = self.issues.lock().unwrap();
        let found = issues
            .iter_mut()
            .find(|i| i.number == issue.number)
            .ok_or_else(|| HostingError::Backend(format!("no issue {}", issue.number)))?;
        found.open = false;
        Ok(())
    }

    async fn is_open(&self, issue: &IssueRef) -> Result<bool, HostingError> {
        Ok(self
            .issues
            .lock()
            .unwrap()
            .iter()
            .any(|i| i.number == issue.number && i.open))
    }
}

#[derive(Default)]
pub struct RecordingProposer {
    pub proposals: Mutex<Vec<ChangeProposal>>,
}

impl RecordingProposer {
    pub fn titles(&self) -> Vec<String> {
        self.proposals
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.title.clone())
            .collect()
    }
}

#[async_trait]
impl ChangeProposer for RecordingProposer {
    async fn propose(&self, proposal: &ChangeProposal) -> Result<ProposalRef, HostingError> {
        let mut proposals = self.proposals.lock().unwrap();
        proposals.push(proposal.clone());
        Ok(ProposalRef {
            number: proposals.len() as u64 + 100,
            url: None,
        })
    }
}

/// Registry fixture from `vendor/model` identity strings.
pub fn registry_of(ids: &[&str]) -> BoardRegistry {
    let boards = ids
        .iter()
        .map(|id| {
            let board_id = BoardId::from(*id);
            Board {
                vendor: board_id.vendor().to_string(),
                model: board_id.model().to_string(),
                arch: "arm64".to_string(),
                path_prefix: format!("boards/{}/", id),
                spec_path: format!("boards/{}/board.toml", id),
                id: board_id,
            }
        })
        .collect();
    BoardRegistry::from_boards(boards)
}
