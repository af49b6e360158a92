use git2::{Delta, DiffFindOptions, DiffOptions, Patch, Repository};

use crate::config::ExtractionConfig;
use crate::error::{AppError, Result};
use crate::git::tree::resolve_snapshot;
use crate::models::{Commit, DiffHunk, FileChange, FileChangeStatus, FileSnapshot};

/// Turns one git commit into a fully populated `Commit`.
///
/// Implementations must be pure: extracting the same commit twice yields
/// equal records.
pub trait Extract {
    fn extract(&self, repo: &Repository, commit: &git2::Commit<'_>) -> Result<Commit>;
}

#[derive(Debug, Clone)]
pub struct CommitExtractor {
    context_lines: u32,
    detect_renames: bool,
}

impl CommitExtractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            context_lines: config.context_lines,
            detect_renames: config.detect_renames,
        }
    }
}

impl Default for CommitExtractor {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

impl Extract for CommitExtractor {
    fn extract(&self, repo: &Repository, commit: &git2::Commit<'_>) -> Result<Commit> {
        let sha = commit.id().to_string();
        let span = tracing::debug_span!("extract_commit", sha = %sha);
        let _enter = span.enter();

        self.extract_commit(repo, commit, &sha)
            .map_err(|err| AppError::in_commit(&sha, err))
    }
}

impl CommitExtractor {
    fn extract_commit(&self, repo: &Repository, commit: &git2::Commit<'_>, sha: &str) -> Result<Commit> {
        let tree = commit.tree()?;

        // Merges are diffed against the first parent only; a root commit
        // against the empty tree, which reports every file as added.
        let parent_tree = if commit.parent_count() > 0 {
            Some(commit.parent(0)?.tree()?)
        } else {
            None
        };

        let mut opts = DiffOptions::new();
        opts.context_lines(self.context_lines);

        let mut diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))?;

        if self.detect_renames {
            let mut find = DiffFindOptions::new();
            find.renames(true).copies(true);
            diff.find_similar(Some(&mut find))?;
        }

        let mut file_changes = Vec::with_capacity(diff.deltas().len());

        for (delta_idx, delta) in diff.deltas().enumerate() {
            let old_path = delta
                .old_file()
                .path()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default();
            let new_path = delta
                .new_file()
                .path()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default();

            let status = change_status(delta.status(), &new_path)?;

            // libgit2 fills both sides with the same path for adds and deletes.
            let (old_path, new_path) = match status {
                FileChangeStatus::Added => (String::new(), new_path),
                FileChangeStatus::Deleted => (old_path, String::new()),
                _ => (old_path, new_path),
            };

            let hunks = match Patch::from_diff(&diff, delta_idx)? {
                Some(patch) => extract_hunks(&patch, sha)?,
                None => Vec::new(),
            };

            // A deleted file only exists in the parent's tree.
            let (snapshot_path, content) = match status {
                FileChangeStatus::Deleted => (
                    old_path.as_str(),
                    parent_tree
                        .as_ref()
                        .and_then(|parent| resolve_snapshot(repo, parent, &old_path)),
                ),
                _ => (new_path.as_str(), resolve_snapshot(repo, &tree, &new_path)),
            };

            if content.is_none() {
                tracing::debug!(path = snapshot_path, status = status.as_str(), "Snapshot unavailable");
            }
            let snapshot = content.map(|text| FileSnapshot::new(sha, snapshot_path, text));

            file_changes.push(FileChange {
                old_path,
                new_path,
                status,
                hunks,
                snapshot,
                commit_sha: sha.to_string(),
                summary: None,
                embedding: None,
            });
        }

        let author = commit.author();

        Ok(Commit {
            sha: sha.to_string(),
            parents: commit.parent_ids().map(|id| id.to_string()).collect(),
            author: author.name().filter(|n| !n.is_empty()).map(str::to_string),
            email: author.email().filter(|e| !e.is_empty()).map(str::to_string),
            time: commit.time().seconds(),
            message: String::from_utf8_lossy(commit.message_bytes()).trim().to_string(),
            file_changes,
            summary: None,
            embedding: None,
        })
    }
}

/// Map libgit2's delta code onto the closed status set. Codes outside the set
/// fail the commit instead of being guessed at.
pub fn change_status(delta: Delta, path: &str) -> Result<FileChangeStatus> {
    match delta {
        Delta::Added => Ok(FileChangeStatus::Added),
        Delta::Deleted => Ok(FileChangeStatus::Deleted),
        Delta::Modified => Ok(FileChangeStatus::Modified),
        Delta::Renamed => Ok(FileChangeStatus::Renamed),
        Delta::Copied => Ok(FileChangeStatus::Copied),
        Delta::Unmodified
        | Delta::Ignored
        | Delta::Untracked
        | Delta::Typechange
        | Delta::Unreadable
        | Delta::Conflicted => Err(AppError::UnknownStatus {
            path: path.to_string(),
            status: format!("{delta:?}"),
        }),
    }
}

/// Each hunk becomes one text block, every line prefixed with its origin
/// marker. Line bytes are decoded lossily.
fn extract_hunks(patch: &Patch<'_>, sha: &str) -> Result<Vec<DiffHunk>> {
    let mut hunks = Vec::with_capacity(patch.num_hunks());

    for hunk_idx in 0..patch.num_hunks() {
        let (hunk, line_count) = patch.hunk(hunk_idx)?;

        let mut content = String::new();
        for line_idx in 0..line_count {
            let line = patch.line_in_hunk(hunk_idx, line_idx)?;
            content.push(line.origin());
            content.push_str(&String::from_utf8_lossy(line.content()));
        }

        hunks.push(DiffHunk {
            old_start: hunk.old_start(),
            old_lines: hunk.old_lines(),
            new_start: hunk.new_start(),
            new_lines: hunk.new_lines(),
            content,
            commit_sha: sha.to_string(),
            summary: None,
            embedding: None,
        });
    }

    Ok(hunks)
}
