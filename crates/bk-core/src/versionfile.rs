use std::path::Path;

use tracing::debug;

use crate::config::VersionsConfig;
use crate::types::VersionRecord;

#[derive(Debug, thiserror::Error)]
pub enum VersionFileError {
    #[error("version file {0} is unreadable: {1}")]
    Unreadable(String, String),
    #[error("version file {0} is empty")]
    Empty(String),
    #[error("failed to write version file {0}: {1}")]
    Write(String, String),
}

/// Load the version records for every component configured under
/// `[versions.remotes]`.
///
/// The tag is the sole content of `<dir>/<component><suffix>`; the remote
/// URL comes from config so the tracked files stay environment-free.
pub fn load_records(root: &Path, cfg: &VersionsConfig) -> Result<Vec<VersionRecord>, VersionFileError> {
    let mut records = Vec::with_capacity(cfg.remotes.len());
    for (component, remote) in &cfg.remotes {
        let rel = cfg.file_path(component);
        let tag = read_tag(&root.join(&rel), &rel)?;
        records.push(VersionRecord {
            component: component.clone(),
            tag,
            remote: remote.clone(),
        });
    }
    debug!(count = records.len(), "version records loaded");
    Ok(records)
}

/// Write a component's version file with the given tag.
pub fn write_tag(root: &Path, cfg: &VersionsConfig, component: &str, tag: &str) -> Result<(), VersionFileError> {
    let rel = cfg.file_path(component);
    let path = root.join(&rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| VersionFileError::Write(rel.clone(), e.to_string()))?;
    }
    std::fs::write(&path, file_content(tag))
        .map_err(|e| VersionFileError::Write(rel, e.to_string()))
}

/// Canonical version-file content for a tag: the tag plus a trailing
/// newline.
pub fn file_content(tag: &str) -> String {
    format!("{}\n", tag)
}

fn read_tag(path: &Path, rel: &str) -> Result<String, VersionFileError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| VersionFileError::Unreadable(rel.to_string(), e.to_string()))?;
    let tag = text.trim();
    if tag.is_empty() {
        return Err(VersionFileError::Empty(rel.to_string()));
    }
    Ok(tag.to_string())
}
