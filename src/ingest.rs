//! One-shot ingest: clone, extract, translate, clean up.

use std::path::Path;
use tokio_util::sync::CancellationToken;

use crate::config::ExtractionConfig;
use crate::error::Result;
use crate::git::RemoteRepo;
use crate::models::RepositoryRecord;

/// Ingest `url` through a temporary working copy.
pub fn ingest(url: &str, config: &ExtractionConfig, cancel: &CancellationToken) -> Result<RepositoryRecord> {
    ingest_into(url, None, config, cancel)
}

/// Ingest `url`, cloning into `dest` when given. The working copy is removed
/// on success and on failure alike.
pub fn ingest_into(
    url: &str,
    dest: Option<&Path>,
    config: &ExtractionConfig,
    cancel: &CancellationToken,
) -> Result<RepositoryRecord> {
    let mut repo = RemoteRepo::clone_remote(url, dest, config.clone())?;

    let outcome = repo.extract(cancel).and_then(|report| {
        tracing::info!(?report, "Extracted repository");
        repo.to_records()
    });

    let removed = repo.remove();
    if let (Err(_), Err(err)) = (&outcome, &removed) {
        tracing::warn!(error = %err, "Failed to remove working copy");
    }

    let record = outcome?;
    removed?;
    Ok(record)
}
