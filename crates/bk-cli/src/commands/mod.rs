pub mod accept_removal;
pub mod ingest;
pub mod matrix;
pub mod status;
pub mod sweep;
pub mod track;

use std::path::{Path, PathBuf};

use anyhow::Context;

use bk_core::config::Config;
use bk_core::registry::BoardRegistry;
use bk_core::store::HealthStore;
use bk_integrations::GitHubClient;

/// Load config from an explicit path or the default location. Config
/// failures are fatal to the run.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(p) => Config::load_from(p)
            .with_context(|| format!("failed to load config from {}", p.display())),
        None => Config::load().context("failed to load config"),
    }
}

/// Root of the board/version registry checkout.
pub fn registry_root(config: &Config) -> PathBuf {
    match &config.general.registry_root {
        Some(root) => expand_path(root),
        None => PathBuf::from("."),
    }
}

/// Expand a leading `~/` against the home directory.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Discover the board registry. Unreadable registries are fatal.
pub fn load_registry(config: &Config) -> anyhow::Result<BoardRegistry> {
    let root = registry_root(config);
    BoardRegistry::discover(&root, &config.boards)
        .with_context(|| format!("failed to discover boards under {}", root.display()))
}

/// Open the health store, creating its parent directory if needed.
pub async fn open_store(config: &Config) -> anyhow::Result<HealthStore> {
    let path = expand_path(&config.store.path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    HealthStore::new(&path)
        .await
        .with_context(|| format!("failed to open health store at {}", path.display()))
}

/// Build the GitHub client from the `[github]` config section.
pub fn github_client(config: &Config) -> anyhow::Result<GitHubClient> {
    GitHubClient::new(&config.github).context("failed to create GitHub client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_path_leaves_relative_paths_alone() {
        assert_eq!(expand_path("state/health.db"), PathBuf::from("state/health.db"));
        assert_eq!(expand_path("/var/lib/bk.db"), PathBuf::from("/var/lib/bk.db"));
    }

    #[test]
    fn expand_path_resolves_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~/x.db"), home.join("x.db"));
        }
    }
}
