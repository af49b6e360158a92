//! File snapshots and their lineage keys.
//!
//! A snapshot never owns its predecessor. `previous` is a lookup key into the
//! commit cache, filled in by `git::lineage::link_snapshots` once every commit
//! of the run is known.

use serde::{Deserialize, Serialize};

/// Identifies one snapshot: the commit it was taken at, the path and the
/// position of its file change within that commit. A single commit can carry
/// two changes on one path (a Deleted/Added pair when a file becomes a
/// symlink), so the path alone is not enough.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotKey {
    pub commit_sha: String,
    pub path: String,
    pub change_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSnapshot {
    pub path: String,
    /// Decoded text with NUL bytes removed
    pub content: String,
    pub commit_sha: String,
    pub previous: Option<SnapshotKey>,
}

impl FileSnapshot {
    pub fn new(commit_sha: &str, path: &str, content: String) -> Self {
        Self {
            path: path.to_string(),
            content: sanitize(content),
            commit_sha: commit_sha.to_string(),
            previous: None,
        }
    }

    /// Key of this snapshot, owned by the file change at `change_index`.
    pub fn key(&self, change_index: usize) -> SnapshotKey {
        SnapshotKey {
            commit_sha: self.commit_sha.clone(),
            path: self.path.clone(),
            change_index,
        }
    }
}

/// Strip NUL characters, which text columns downstream cannot store.
pub fn sanitize(content: String) -> String {
    if content.contains('\0') {
        content.replace('\0', "")
    } else {
        content
    }
}
