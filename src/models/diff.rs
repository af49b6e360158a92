//! File-level and line-level change DTOs.
//!
//! - `FileChange`: one file's change within a commit, owning its hunks and snapshot
//! - `FileChangeStatus`: closed set of change kinds
//! - `DiffHunk`: contiguous block of changed lines, stored as raw diff text

use serde::{Deserialize, Serialize};

use super::FileSnapshot;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileChangeStatus {
    Added,
    Deleted,
    Modified,
    Renamed,
    Copied,
}

impl FileChangeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileChangeStatus::Added => "added",
            FileChangeStatus::Deleted => "deleted",
            FileChangeStatus::Modified => "modified",
            FileChangeStatus::Renamed => "renamed",
            FileChangeStatus::Copied => "copied",
        }
    }

    /// Whether the previous version of this file lived under `old_path`
    /// rather than the snapshot path.
    pub fn moves_path(&self) -> bool {
        matches!(self, FileChangeStatus::Renamed | FileChangeStatus::Copied)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChange {
    /// Empty for additions
    pub old_path: String,
    /// Empty for deletions
    pub new_path: String,
    pub status: FileChangeStatus,
    pub hunks: Vec<DiffHunk>,
    pub snapshot: Option<FileSnapshot>,
    pub commit_sha: String,
    pub summary: Option<String>,
    pub embedding: Option<Vec<f32>>,
}

impl FileChange {
    /// The path a snapshot of this change is taken at.
    pub fn snapshot_path(&self) -> &str {
        match self.status {
            FileChangeStatus::Deleted => &self.old_path,
            _ => &self.new_path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffHunk {
    pub old_start: u32,
    /// 0 means a pure insertion
    pub old_lines: u32,
    pub new_start: u32,
    /// 0 means a pure deletion
    pub new_lines: u32,
    /// Every line prefixed by its origin marker (' ', '+', '-')
    pub content: String,
    pub commit_sha: String,
    pub summary: Option<String>,
    pub embedding: Option<Vec<f32>>,
}
