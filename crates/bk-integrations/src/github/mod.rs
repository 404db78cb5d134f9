pub mod client;
pub mod issues;
pub mod proposals;

pub use client::{GitHubClient, GitHubError};
pub use issues::GitHubIssues;
pub use proposals::GitHubProposer;
