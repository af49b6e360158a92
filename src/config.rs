//! Extraction limits shared by the CLI, the ingest endpoint and the engine.

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONTEXT_LINES: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Unchanged lines kept around each hunk
    pub context_lines: u32,
    /// Clone depth and per-branch walk limit; `None` walks everything
    pub max_commits: Option<usize>,
    /// Run similarity detection so renames and copies are reported as such
    pub detect_renames: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            context_lines: DEFAULT_CONTEXT_LINES,
            max_commits: None,
            detect_renames: false,
        }
    }
}
