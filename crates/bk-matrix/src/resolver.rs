use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use bk_core::config::VersionsConfig;
use bk_core::registry::BoardRegistry;
use bk_core::types::{BoardId, ChangeSet};

/// Decide which boards must be rebuilt for a change set.
///
/// Rules, in order:
/// 1. Any version-file path selects **all** boards. A version bump can
///    affect any board, so over-approximation is the safe direction; this
///    rule wins even when board paths are also present.
/// 2. Otherwise each path is matched against the declared board path
///    prefixes and the distinct matches are collected.
/// 3. Paths matching neither convention select nothing.
///
/// Pure function of its inputs: same change set and registry always yield
/// the same set, independent of path ordering or duplicates.
pub fn resolve(
    change_set: &ChangeSet,
    registry: &BoardRegistry,
    versions: &VersionsConfig,
) -> BTreeSet<BoardId> {
    if change_set
        .paths
        .iter()
        .any(|p| versions.is_version_path(p))
    {
        debug!("version file changed, selecting all boards");
        return registry.ids().cloned().collect();
    }

    let selected: BTreeSet<BoardId> = change_set
        .paths
        .iter()
        .filter_map(|p| registry.match_path(p))
        .map(|b| b.id.clone())
        .collect();

    debug!(count = selected.len(), "boards selected by path prefix");
    selected
}

// ---------------------------------------------------------------------------
// Matrix rendering
// ---------------------------------------------------------------------------

/// One row of the build matrix handed to the external orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixEntry {
    pub board: BoardId,
    pub arch: String,
}

/// Resolved build matrix plus a human-readable selection reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildMatrix {
    pub include: Vec<MatrixEntry>,
    pub reason: String,
    pub total: usize,
}

impl BuildMatrix {
    /// Resolve a change set and package the result for the orchestrator.
    pub fn from_change_set(
        change_set: &ChangeSet,
        registry: &BoardRegistry,
        versions: &VersionsConfig,
    ) -> Self {
        let version_changed = change_set
            .paths
            .iter()
            .any(|p| versions.is_version_path(p));
        let selected = resolve(change_set, registry, versions);

        let include: Vec<MatrixEntry> = selected
            .iter()
            .map(|id| MatrixEntry {
                board: id.clone(),
                arch: registry
                    .get(id)
                    .map(|b| b.arch.clone())
                    .unwrap_or_else(|| "unknown".to_string()),
            })
            .collect();

        let reason = if version_changed {
            "version update (testing all boards)".to_string()
        } else if include.is_empty() {
            "no boards affected".to_string()
        } else {
            "board-specific changes".to_string()
        };

        Self {
            total: include.len(),
            include,
            reason,
        }
    }

    pub fn boards(&self) -> Vec<&BoardId> {
        self.include.iter().map(|e| &e.board).collect()
    }

    /// Render as key=value lines for a CI job output
    /// (`boards=[...]`, `include=[{board,arch}...]`, `total=N`).
    pub fn to_ci_output(&self) -> String {
        let boards: Vec<&str> = self.include.iter().map(|e| e.board.as_str()).collect();
        let boards_json = serde_json::to_string(&boards).unwrap_or_else(|_| "[]".to_string());
        let include_json =
            serde_json::to_string(&self.include).unwrap_or_else(|_| "[]".to_string());
        format!(
            "boards={}\ninclude={}\ntotal={}\n",
            boards_json, include_json, self.total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bk_core::types::Board;

    fn board(vendor: &str, model: &str, arch: &str) -> Board {
        let id = BoardId::new(vendor, model);
        Board {
            id,
            vendor: vendor.to_string(),
            model: model.to_string(),
            arch: arch.to_string(),
            path_prefix: format!("boards/{}/{}/", vendor, model),
            spec_path: format!("boards/{}/{}/board.toml", vendor, model),
        }
    }

    fn registry() -> BoardRegistry {
        BoardRegistry::from_boards(vec![
            board("vendorX", "modelY", "arm64"),
            board("vendorZ", "modelW", "arm"),
            board("vendorZ", "modelV", "riscv64"),
        ])
    }

    fn resolve_paths(paths: &[&str]) -> BTreeSet<BoardId> {
        let cs: ChangeSet = paths.iter().copied().collect();
        resolve(&cs, &registry(), &VersionsConfig::default())
    }

    #[test]
    fn version_file_selects_all_boards() {
        let selected = resolve_paths(&["versions/kernel.version"]);
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn version_file_takes_precedence_over_board_paths() {
        let selected = resolve_paths(&[
            "boards/vendorX/modelY/dts/foo.dts",
            "versions/u-boot.version",
        ]);
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn board_paths_select_exactly_matched_boards() {
        let selected = resolve_paths(&["boards/vendorX/modelY/dts/foo.dts"]);
        assert_eq!(selected.len(), 1);
        assert!(selected.contains(&BoardId::new("vendorX", "modelY")));
    }

    #[test]
    fn duplicates_and_order_do_not_matter() {
        let forward = resolve_paths(&[
            "boards/vendorX/modelY/config",
            "boards/vendorZ/modelW/recipe.sh",
            "boards/vendorX/modelY/config",
        ]);
        let reverse = resolve_paths(&[
            "boards/vendorZ/modelW/recipe.sh",
            "boards/vendorX/modelY/config",
        ]);
        assert_eq!(forward, reverse);
        assert_eq!(forward.len(), 2);
    }

    #[test]
    fn unmatched_paths_select_nothing() {
        let selected = resolve_paths(&["docs/README.md", ".github/workflows/build.yml"]);
        assert!(selected.is_empty());
    }

    #[test]
    fn empty_change_set_selects_nothing() {
        let selected = resolve_paths(&[]);
        assert!(selected.is_empty());
    }

    #[test]
    fn matrix_reason_and_arch() {
        let cs: ChangeSet = ["versions/kernel.version"].into_iter().collect();
        let matrix = BuildMatrix::from_change_set(&cs, &registry(), &VersionsConfig::default());
        assert_eq!(matrix.total, 3);
        assert_eq!(matrix.reason, "version update (testing all boards)");
        assert!(matrix
            .include
            .iter()
            .any(|e| e.board.as_str() == "vendorX/modelY" && e.arch == "arm64"));

        let cs: ChangeSet = ["docs/README.md"].into_iter().collect();
        let matrix = BuildMatrix::from_change_set(&cs, &registry(), &VersionsConfig::default());
        assert_eq!(matrix.total, 0);
        assert_eq!(matrix.reason, "no boards affected");
    }

    #[test]
    fn ci_output_format() {
        let cs: ChangeSet = ["boards/vendorZ/modelW/recipe.sh"].into_iter().collect();
        let matrix = BuildMatrix::from_change_set(&cs, &registry(), &VersionsConfig::default());
        let out = matrix.to_ci_output();
        assert!(out.contains("boards=[\"vendorZ/modelW\"]"));
        assert!(out.contains("total=1"));
        assert!(out.contains("\"arch\":\"arm\""));
    }
}
