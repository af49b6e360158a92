use serde::{Deserialize, Serialize};

use super::FileChange;

/// One extracted commit. Created once per sha; only the summarizer touches
/// `summary`/`embedding` afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    /// Full 40-char hex sha
    pub sha: String,
    /// Parent shas in git order; the first one is the diff baseline
    pub parents: Vec<String>,
    pub author: Option<String>,
    pub email: Option<String>,
    /// Commit time, epoch seconds
    pub time: i64,
    pub message: String,
    pub file_changes: Vec<FileChange>,
    pub summary: Option<String>,
    pub embedding: Option<Vec<f32>>,
}

impl Commit {
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}
