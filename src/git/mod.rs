//! History extraction engine.
//!
//! - `repository`: clone lifecycle and the per-repository run (orchestrator)
//! - `history`: branch walking over the shared commit cache
//! - `diff`: per-commit extraction (file changes, hunks, snapshots)
//! - `tree`: snapshot resolution inside a tree
//! - `cache`: the sha -> commit cache shared across branch walks
//! - `lineage`: history ordering and previous-snapshot links

pub mod cache;
pub mod diff;
pub mod history;
pub mod lineage;
pub mod repository;
pub mod tree;

#[cfg(test)]
pub(crate) mod fixture;

pub use cache::CommitCache;
pub use diff::{CommitExtractor, Extract};
pub use history::{BranchWalker, WalkStats};
pub use repository::{ExtractionReport, RemoteRepo, WorkingCopy};
