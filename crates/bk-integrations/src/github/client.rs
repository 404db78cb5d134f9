use octocrab::Octocrab;
use thiserror::Error;

use bk_core::config::GitHubConfig;
use bk_core::hosting::HostingError;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    #[error("missing GitHub token: set the env var named by github.token_env")]
    MissingToken,

    #[error("github.owner and github.repo must be configured")]
    MissingRepo,

    #[error("base branch {0} has no resolvable commit")]
    UnresolvableBase(String),
}

impl From<GitHubError> for HostingError {
    fn from(e: GitHubError) -> Self {
        HostingError::Backend(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GitHubError>;

#[derive(Debug, Clone)]
pub struct GitHubClient {
    pub(crate) octocrab: Octocrab,
    pub(crate) owner: String,
    pub(crate) repo: String,
    pub(crate) base_branch: String,
}

impl GitHubClient {
    /// Create a new `GitHubClient` from the `[github]` config section,
    /// resolving the token from the env var it names.
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let token = std::env::var(&config.token_env).map_err(|_| GitHubError::MissingToken)?;
        let owner = config.owner.clone().ok_or(GitHubError::MissingRepo)?;
        let repo = config.repo.clone().ok_or(GitHubError::MissingRepo)?;

        let octocrab = Octocrab::builder().personal_token(token).build()?;

        Ok(Self {
            octocrab,
            owner,
            repo,
            base_branch: config.base_branch.clone(),
        })
    }

    /// Returns a reference to the inner `Octocrab` instance.
    pub fn inner(&self) -> &Octocrab {
        &self.octocrab
    }

    /// Returns the configured owner (org or user).
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the configured repository name.
    pub fn repo(&self) -> &str {
        &self.repo
    }
}
