//! Stable-tag parsing, ordering, and remote tag listing.
//!
//! Remote queries go through libgit2 (git2 crate) in read-only,
//! fetch-direction mode: no clone, no write access, just the advertised
//! ref list.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::tracker::TrackerError;

// ---------------------------------------------------------------------------
// StableTag
// ---------------------------------------------------------------------------

/// A stable upstream version tag: a leading literal `v` followed by one or
/// more dot-separated non-negative integer segments, with no suffix of any
/// kind. Pre-release and candidate tags (`v6.7-rc4`, `v6.7.1-beta`) do not
/// parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StableTag {
    segments: Vec<u64>,
    raw: String,
}

impl StableTag {
    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for StableTag {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix('v').ok_or(())?;
        if rest.is_empty() {
            return Err(());
        }
        let mut segments = Vec::new();
        for part in rest.split('.') {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(());
            }
            segments.push(part.parse::<u64>().map_err(|_| ())?);
        }
        Ok(Self {
            segments,
            raw: s.to_string(),
        })
    }
}

impl fmt::Display for StableTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl Ord for StableTag {
    /// Numeric per-segment comparison; a shorter sequence compares as if
    /// padded with trailing zeros (`v6.7` < `v6.7.1`, `v6.7` == `v6.7.0`).
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let a = self.segments.get(i).copied().unwrap_or(0);
            let b = other.segments.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for StableTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Select the maximum stable tag from a raw tag list, or `None` when no
/// tag matches the stable pattern.
pub fn latest_stable(tags: &[String]) -> Option<StableTag> {
    tags.iter()
        .filter_map(|t| t.parse::<StableTag>().ok())
        .max()
}

// ---------------------------------------------------------------------------
// TagSource
// ---------------------------------------------------------------------------

/// Source of a remote's tag list. The production implementation talks
/// libgit2; tests substitute fixed lists.
pub trait TagSource: Send + Sync {
    fn list_tags(&self, remote_url: &str) -> Result<Vec<String>, TrackerError>;
}

/// Lists tags by connecting to the remote in fetch direction and reading
/// the advertised refs. Dereference entries (`refs/tags/v6.7^{}`) are
/// normalized and the result deduplicated.
pub struct GitTagSource;

impl TagSource for GitTagSource {
    fn list_tags(&self, remote_url: &str) -> Result<Vec<String>, TrackerError> {
        let mut remote = git2::Remote::create_detached(remote_url).map_err(|e| {
            TrackerError::Fetch {
                remote: remote_url.to_string(),
                reason: e.message().to_string(),
            }
        })?;
        remote
            .connect(git2::Direction::Fetch)
            .map_err(|e| TrackerError::Fetch {
                remote: remote_url.to_string(),
                reason: e.message().to_string(),
            })?;
        let heads = remote.list().map_err(|e| TrackerError::Fetch {
            remote: remote_url.to_string(),
            reason: e.message().to_string(),
        })?;

        let mut tags = BTreeSet::new();
        for head in heads {
            if let Some(name) = head.name().strip_prefix("refs/tags/") {
                tags.insert(name.trim_end_matches("^{}").to_string());
            }
        }

        debug!(remote = remote_url, count = tags.len(), "remote tags listed");
        Ok(tags.into_iter().collect())
    }
}
