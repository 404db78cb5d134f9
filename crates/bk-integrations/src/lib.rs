//! Hosting-provider integrations.
//!
//! Currently GitHub only: issue tracking for board failures and pull
//! requests for version bumps and board retirements, both implemented
//! against the traits in [`bk_core::hosting`].

pub mod github;

pub use github::{GitHubClient, GitHubError, GitHubIssues, GitHubProposer};
