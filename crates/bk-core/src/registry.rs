use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::BoardsConfig;
use crate::types::{Board, BoardId};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("boards directory {0} is unreadable: {1}")]
    Unreadable(PathBuf, String),
}

// ---------------------------------------------------------------------------
// Board declaration file
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct BoardSpecFile {
    #[serde(default)]
    board: BoardSpecSection,
}

#[derive(Debug, Default, Deserialize)]
struct BoardSpecSection {
    #[serde(default)]
    arch: Option<String>,
}

// ---------------------------------------------------------------------------
// BoardRegistry
// ---------------------------------------------------------------------------

/// Declarative listing of known boards, keyed by identity.
///
/// The registry is read from disk; it is only ever mutated through accepted
/// change proposals (board add/edit/remove), never by this process.
#[derive(Debug, Clone, Default)]
pub struct BoardRegistry {
    boards: BTreeMap<BoardId, Board>,
}

impl BoardRegistry {
    /// Scan `<root>/<boards.dir>` for `<vendor>/<model>/<spec_file>`
    /// declarations.
    ///
    /// A missing boards directory yields an empty registry; an unreadable
    /// one is fatal to the run. A declaration file that fails to parse is
    /// logged and included with `arch = "unknown"`, matching the tolerant
    /// behavior expected of registry reads.
    pub fn discover(root: &Path, cfg: &BoardsConfig) -> Result<Self, RegistryError> {
        let boards_dir = root.join(&cfg.dir);
        let mut boards = BTreeMap::new();

        if !boards_dir.exists() {
            debug!(dir = %boards_dir.display(), "boards directory missing, registry empty");
            return Ok(Self { boards });
        }

        let mut spec_files = Vec::new();
        collect_spec_files(&boards_dir, &cfg.spec_file, &mut spec_files)
            .map_err(|e| RegistryError::Unreadable(boards_dir.clone(), e.to_string()))?;

        for spec_path in spec_files {
            let board_dir = spec_path.parent().unwrap_or(&boards_dir);
            let rel = match board_dir.strip_prefix(&boards_dir) {
                Ok(rel) => rel,
                Err(_) => continue,
            };
            let rel_str = rel.to_string_lossy().replace('\\', "/");
            let mut parts = rel_str.splitn(2, '/');
            let vendor = parts.next().unwrap_or_default().to_string();
            let model = parts.next().unwrap_or_default().to_string();
            if vendor.is_empty() || model.is_empty() {
                warn!(path = %spec_path.display(), "board declaration not under vendor/model, skipped");
                continue;
            }

            let arch = read_arch(&spec_path);
            let id = BoardId::new(&vendor, &model);
            let path_prefix = format!("{}/{}/", cfg.dir.trim_end_matches('/'), rel_str);
            let board = Board {
                id: id.clone(),
                vendor,
                model,
                arch,
                path_prefix,
                spec_path: format!("{}/{}/{}", cfg.dir.trim_end_matches('/'), rel_str, cfg.spec_file),
            };
            boards.insert(id, board);
        }

        debug!(count = boards.len(), "board registry loaded");
        Ok(Self { boards })
    }

    /// Build a registry from an explicit board list (tests, fixtures).
    pub fn from_boards(list: Vec<Board>) -> Self {
        Self {
            boards: list.into_iter().map(|b| (b.id.clone(), b)).collect(),
        }
    }

    pub fn get(&self, id: &BoardId) -> Option<&Board> {
        self.boards.get(id)
    }

    pub fn contains(&self, id: &BoardId) -> bool {
        self.boards.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Board> {
        self.boards.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &BoardId> {
        self.boards.keys()
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    /// Match a repo-relative path against the declared board path prefixes.
    pub fn match_path(&self, path: &str) -> Option<&Board> {
        self.boards
            .values()
            .find(|b| path.starts_with(b.path_prefix.as_str()))
    }
}

fn collect_spec_files(
    dir: &Path,
    spec_file: &str,
    out: &mut Vec<PathBuf>,
) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_spec_files(&path, spec_file, out)?;
        } else if entry.file_name().to_string_lossy() == spec_file {
            out.push(path);
        }
    }
    Ok(())
}

fn read_arch(spec_path: &Path) -> String {
    let text = match std::fs::read_to_string(spec_path) {
        Ok(t) => t,
        Err(e) => {
            warn!(path = %spec_path.display(), error = %e, "failed to read board declaration");
            return "unknown".to_string();
        }
    };
    match toml::from_str::<BoardSpecFile>(&text) {
        Ok(spec) => spec.board.arch.unwrap_or_else(|| "unknown".to_string()),
        Err(e) => {
            warn!(path = %spec_path.display(), error = %e, "failed to parse board declaration");
            "unknown".to_string()
        }
    }
}
