//! git-lineage: commit-history extraction with snapshot lineage.
//!
//! Clones a repository, walks every remote branch, extracts each distinct
//! commit once (file changes, hunks, full-file snapshots) and links every
//! snapshot to the previous snapshot of the same file. The result is handed
//! out as persistence records.

pub mod config;
pub mod error;
pub mod git;
pub mod ingest;
pub mod models;
pub mod routes;

pub use config::ExtractionConfig;
pub use error::{AppError, Result};
pub use git::RemoteRepo;
pub use models::RepositoryRecord;
