use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from `~/.boardkeeper/config.toml`.
///
/// Credentials are never stored here: the GitHub section records the *name*
/// of the env var holding the token, resolved at runtime.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub versions: VersionsConfig,
    #[serde(default)]
    pub boards: BoardsConfig,
    #[serde(default)]
    pub attrition: AttritionConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub builds: BuildsConfig,
}

impl Config {
    /// Load config from `~/.boardkeeper/config.toml`, falling back to
    /// defaults when the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(path)
        } else {
            let cfg = Config::default();
            cfg.validate()?;
            Ok(cfg)
        }
    }

    /// Load from a specific path.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let cfg: Config = toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        self.validate()?;
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Semantic validation for settings that are not fully expressible via
    /// type checks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.versions.validate()?;
        self.boards.validate()?;
        self.attrition.validate()?;
        Ok(())
    }

    fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".boardkeeper")
            .join("config.toml")
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(String),
    #[error("parse: {0}")]
    Parse(String),
    #[error("validation: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Section structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_project_name")]
    pub project_name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Root of the board/version registry checkout. Defaults to the
    /// current directory.
    #[serde(default)]
    pub registry_root: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
            log_level: default_log_level(),
            registry_root: None,
        }
    }
}

fn default_project_name() -> String {
    "boardkeeper".into()
}
fn default_log_level() -> String {
    "info".into()
}

/// Version-file path convention and the tracked upstream remotes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionsConfig {
    /// Directory holding version files, relative to the registry root.
    #[serde(default = "default_versions_dir")]
    pub dir: String,
    /// Filename suffix marking a version file.
    #[serde(default = "default_versions_suffix")]
    pub suffix: String,
    /// Tracked components: component name -> upstream remote URL.
    #[serde(default)]
    pub remotes: BTreeMap<String, String>,
}

impl Default for VersionsConfig {
    fn default() -> Self {
        Self {
            dir: default_versions_dir(),
            suffix: default_versions_suffix(),
            remotes: BTreeMap::new(),
        }
    }
}

impl VersionsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "versions.dir must not be empty".to_string(),
            ));
        }
        if !self.suffix.starts_with('.') {
            return Err(ConfigError::Validation(format!(
                "versions.suffix '{}' must start with '.'",
                self.suffix
            )));
        }
        Ok(())
    }

    /// Repo-relative path of the version file for a component.
    pub fn file_path(&self, component: &str) -> String {
        format!(
            "{}/{}{}",
            self.dir.trim_end_matches('/'),
            component,
            self.suffix
        )
    }

    /// Returns `true` when `path` lies under the versions directory and
    /// carries the version-file suffix.
    pub fn is_version_path(&self, path: &str) -> bool {
        let dir = self.dir.trim_end_matches('/');
        path.strip_prefix(dir)
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(|name| name.ends_with(self.suffix.as_str()))
    }
}

fn default_versions_dir() -> String {
    "versions".into()
}
fn default_versions_suffix() -> String {
    ".version".into()
}

/// Board declaration path convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardsConfig {
    /// Directory holding board declarations, relative to the registry root.
    #[serde(default = "default_boards_dir")]
    pub dir: String,
    /// Declaration filename expected in each `vendor/model` directory.
    #[serde(default = "default_board_spec_file")]
    pub spec_file: String,
}

impl Default for BoardsConfig {
    fn default() -> Self {
        Self {
            dir: default_boards_dir(),
            spec_file: default_board_spec_file(),
        }
    }
}

impl BoardsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "boards.dir must not be empty".to_string(),
            ));
        }
        if self.spec_file.trim().is_empty() {
            return Err(ConfigError::Validation(
                "boards.spec_file must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_boards_dir() -> String {
    "boards".into()
}
fn default_board_spec_file() -> String {
    "board.toml".into()
}

/// Attrition sweep thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttritionConfig {
    /// A board failing continuously for this many days becomes stale and
    /// has its removal proposed.
    #[serde(default = "default_staleness_days")]
    pub staleness_days: i64,
}

impl Default for AttritionConfig {
    fn default() -> Self {
        Self {
            staleness_days: default_staleness_days(),
        }
    }
}

impl AttritionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.staleness_days < 1 {
            return Err(ConfigError::Validation(
                "attrition.staleness_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn threshold(&self) -> chrono::Duration {
        chrono::Duration::days(self.staleness_days)
    }
}

fn default_staleness_days() -> i64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database holding health records.
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> String {
    "~/.boardkeeper/health.db".into()
}

/// Hosting collaborator settings. References an env var name for the
/// token, never the token itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Env var name for the GitHub personal access token.
    #[serde(default = "default_github_token_env")]
    pub token_env: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub repo: Option<String>,
    /// Branch change proposals are opened against.
    #[serde(default = "default_base_branch")]
    pub base_branch: String,
    /// Label prefix for per-board failure-tracking issues. The full label
    /// is `<prefix><vendor>/<model>`, giving exact-match lookups.
    #[serde(default = "default_failure_label_prefix")]
    pub failure_label_prefix: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token_env: default_github_token_env(),
            owner: None,
            repo: None,
            base_branch: default_base_branch(),
            failure_label_prefix: default_failure_label_prefix(),
        }
    }
}

impl GitHubConfig {
    pub fn failure_label(&self, board: &crate::types::BoardId) -> String {
        format!("{}{}", self.failure_label_prefix, board)
    }
}

fn default_github_token_env() -> String {
    "GITHUB_TOKEN".into()
}
fn default_base_branch() -> String {
    "main".into()
}
fn default_failure_label_prefix() -> String {
    "board-failure:".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildsConfig {
    /// Maximum number of board builds driven concurrently.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: u32,
}

impl Default for BuildsConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
        }
    }
}

fn default_max_concurrent() -> u32 {
    4
}
