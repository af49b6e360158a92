//! Extracted history data model.
//!
//! - `commit`: Commit
//! - `diff`: FileChange, FileChangeStatus, DiffHunk
//! - `snapshot`: FileSnapshot and the SnapshotKey used for lineage links
//! - `branch`: Branch
//! - `records`: persistence records and late-binding annotations

pub mod branch;
pub mod commit;
pub mod diff;
pub mod records;
pub mod snapshot;

pub use branch::*;
pub use commit::*;
pub use diff::*;
pub use records::*;
pub use snapshot::*;
