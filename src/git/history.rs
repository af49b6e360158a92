//! Branch walking: collect a branch's commits and extract the unseen ones.
//!
//! The walk starts at the branch tip and follows all parents in libgit2's
//! topological + time order (newest first). Commits already in the shared
//! `CommitCache` are recorded but not extracted again. The returned sha list
//! keeps walk order, not cache insertion order.

use git2::{ErrorCode, Oid, Repository, Sort};
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::git::cache::CommitCache;
use crate::git::diff::Extract;
use crate::models::Branch;

/// Per-walk diagnostics, returned alongside the branch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Commits this walk extracted and stored
    pub extracted: usize,
    /// Commits found in the cache (or stored by another walker first)
    pub reused: usize,
    /// File changes whose snapshot could not be resolved
    pub degraded_snapshots: usize,
    /// The walk stopped at the commit limit
    pub truncated: bool,
}

pub struct BranchWalker<'a, E: Extract> {
    repo: &'a Repository,
    cache: &'a CommitCache,
    extractor: &'a E,
    cancel: &'a CancellationToken,
    max_commits: Option<usize>,
}

impl<'a, E: Extract> BranchWalker<'a, E> {
    pub fn new(
        repo: &'a Repository,
        cache: &'a CommitCache,
        extractor: &'a E,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            repo,
            cache,
            extractor,
            cancel,
            max_commits: None,
        }
    }

    pub fn max_commits(mut self, limit: Option<usize>) -> Self {
        self.max_commits = limit;
        self
    }

    /// Walk `name` from its tip. An unborn branch yields no commits.
    pub fn walk(&self, name: &str) -> Result<(Branch, WalkStats)> {
        let span = tracing::info_span!("walk_branch", branch = name);
        let _enter = span.enter();

        let mut branch = Branch {
            name: name.to_string(),
            commits: Vec::new(),
        };
        let mut stats = WalkStats::default();

        let Some(tip) = resolve_tip(self.repo, name)? else {
            tracing::info!("Branch has no commits");
            return Ok((branch, stats));
        };

        // Failures reading the commit graph belong to this branch.
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push(tip).map_err(|err| branch_error(name, &err))?;

        for oid in revwalk {
            if self.max_commits.is_some_and(|limit| branch.commits.len() >= limit) {
                stats.truncated = true;
                tracing::info!(limit = branch.commits.len(), "Commit limit reached");
                break;
            }
            if self.cancel.is_cancelled() {
                tracing::info!(walked = branch.commits.len(), "Walk cancelled");
                return Err(AppError::Cancelled);
            }

            let oid = oid.map_err(|err| branch_error(name, &err))?;
            let sha = oid.to_string();

            if self.cache.contains(&sha)? {
                tracing::debug!(sha = %sha, "Commit already extracted");
                stats.reused += 1;
                branch.commits.push(sha);
                continue;
            }

            let commit = self
                .repo
                .find_commit(oid)
                .map_err(|err| AppError::in_commit(&sha, err.into()))?;
            let extracted = self.extractor.extract(self.repo, &commit)?;
            stats.degraded_snapshots += extracted
                .file_changes
                .iter()
                .filter(|fc| fc.snapshot.is_none())
                .count();

            if self.cache.insert_if_absent(extracted)? {
                stats.extracted += 1;
            } else {
                stats.reused += 1;
            }
            branch.commits.push(sha);

            let walked = branch.commits.len();
            if walked % 100 == 0 {
                tracing::debug!(walked, "Walk progress");
            }
        }

        tracing::info!(
            commits = branch.commits.len(),
            extracted = stats.extracted,
            reused = stats.reused,
            "Branch walked"
        );
        Ok((branch, stats))
    }
}

/// Resolve a branch name to its tip commit.
///
/// Tries the name as a full reference, then under `refs/heads/`,
/// `refs/remotes/` and `refs/tags/`, then as any revision. A reference (or
/// HEAD's target) that exists but points at nothing yet is unborn and
/// resolves to `None`. A name that matches nothing at all is an error.
pub fn resolve_tip(repo: &Repository, name: &str) -> Result<Option<Oid>> {
    let candidates = [
        name.to_string(),
        format!("refs/heads/{name}"),
        format!("refs/remotes/{name}"),
        format!("refs/tags/{name}"),
    ];

    for candidate in &candidates {
        let Ok(reference) = repo.find_reference(candidate) else {
            continue;
        };
        return match reference.resolve() {
            Ok(resolved) => {
                let commit = resolved
                    .peel_to_commit()
                    .map_err(|err| branch_error(name, &err))?;
                Ok(Some(commit.id()))
            }
            Err(err) if is_unborn(&err) => Ok(None),
            Err(err) => Err(branch_error(name, &err)),
        };
    }

    // The branch HEAD is waiting on, before its first commit.
    let head_target = repo
        .find_reference("HEAD")
        .ok()
        .and_then(|head| head.symbolic_target().map(str::to_string));
    if let Some(target) = head_target {
        if candidates.contains(&target) {
            return Ok(None);
        }
    }

    let object = repo.revparse_single(name).map_err(|err| branch_error(name, &err))?;
    let commit = object.peel_to_commit().map_err(|err| branch_error(name, &err))?;
    Ok(Some(commit.id()))
}

fn is_unborn(err: &git2::Error) -> bool {
    matches!(err.code(), ErrorCode::NotFound | ErrorCode::UnbornBranch)
}

fn branch_error(name: &str, err: &git2::Error) -> AppError {
    AppError::BranchResolution {
        branch: name.to_string(),
        reason: err.message().to_string(),
    }
}
