//! Persistence records produced from one extraction run.
//!
//! Translation is pure: it reads the extracted commits and branches and
//! assigns stable numeric ids to file changes, hunks and snapshots so the
//! summarizer can address them later. Referential guarantees:
//! - every `commit_sha` names a commit in `RepositoryRecord::commits`
//! - `previous_snapshot_id` always names a snapshot of an earlier commit
//! - branches only list shas that are present in `commits`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::{Branch, Commit, FileChange, FileChangeStatus, SnapshotKey};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub url: String,
    pub owner: String,
    pub name: String,
    pub default_branch: String,
    pub branches: Vec<BranchRecord>,
    /// Commits in history order (parents before children)
    pub commits: Vec<CommitRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchRecord {
    pub name: String,
    pub head_commit: Option<String>,
    pub commits: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    pub sha: String,
    pub repo_url: String,
    pub parents: Vec<String>,
    pub author: Option<String>,
    pub email: Option<String>,
    pub time: i64,
    pub committed_at: Option<DateTime<Utc>>,
    pub message: String,
    pub summary: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub file_changes: Vec<FileChangeRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChangeRecord {
    pub id: u64,
    pub commit_sha: String,
    pub old_path: String,
    pub new_path: String,
    pub status: FileChangeStatus,
    pub summary: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub snapshot: Option<SnapshotRecord>,
    pub hunks: Vec<HunkRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HunkRecord {
    pub id: u64,
    pub file_change_id: u64,
    pub commit_sha: String,
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    pub content: String,
    pub summary: Option<String>,
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub id: u64,
    pub commit_sha: String,
    pub path: String,
    pub content: String,
    pub previous_snapshot_id: Option<u64>,
}

/// Identity of the repository a run was taken from.
#[derive(Debug, Clone)]
pub struct RepoIdentity {
    pub url: String,
    pub owner: String,
    pub name: String,
    pub default_branch: String,
}

#[derive(Default)]
struct IdCounters {
    file_change: u64,
    hunk: u64,
    snapshot: u64,
}

fn next(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

impl RepositoryRecord {
    /// Translate extracted state into records. `order` lists the shas of
    /// `commits` in history order; shas missing from `commits` are skipped.
    pub fn from_extraction(
        identity: RepoIdentity,
        branches: &[Branch],
        commits: &HashMap<String, Commit>,
        order: &[String],
    ) -> Self {
        let mut ids = IdCounters::default();
        let mut snapshot_ids: HashMap<SnapshotKey, u64> = HashMap::new();

        let commit_records: Vec<CommitRecord> = order
            .iter()
            .filter_map(|sha| commits.get(sha))
            .map(|commit| commit_record(&identity.url, commit, &mut ids, &mut snapshot_ids))
            .collect();

        let present: HashSet<&str> = commit_records.iter().map(|c| c.sha.as_str()).collect();
        let branch_records = branches
            .iter()
            .map(|branch| {
                let commits: Vec<String> = branch
                    .commits
                    .iter()
                    .filter(|sha| present.contains(sha.as_str()))
                    .cloned()
                    .collect();
                BranchRecord {
                    name: branch.name.clone(),
                    head_commit: commits.first().cloned(),
                    commits,
                }
            })
            .collect();

        tracing::info!(
            commits = commit_records.len(),
            file_changes = ids.file_change,
            hunks = ids.hunk,
            snapshots = ids.snapshot,
            "Translated repository records"
        );

        RepositoryRecord {
            url: identity.url,
            owner: identity.owner,
            name: identity.name,
            default_branch: identity.default_branch,
            branches: branch_records,
            commits: commit_records,
        }
    }

    /// Attach a summary/embedding to an already translated record. Fields the
    /// annotation leaves as `None` keep their stored value.
    /// Returns false when the target does not exist.
    pub fn annotate(&mut self, annotation: Annotation) -> bool {
        let Annotation {
            target,
            summary,
            embedding,
        } = annotation;

        let slot = match &target {
            AnnotationTarget::Commit(sha) => self
                .commits
                .iter_mut()
                .find(|c| &c.sha == sha)
                .map(|c| (&mut c.summary, &mut c.embedding)),
            AnnotationTarget::FileChange(id) => self
                .commits
                .iter_mut()
                .flat_map(|c| c.file_changes.iter_mut())
                .find(|fc| fc.id == *id)
                .map(|fc| (&mut fc.summary, &mut fc.embedding)),
            AnnotationTarget::Hunk(id) => self
                .commits
                .iter_mut()
                .flat_map(|c| c.file_changes.iter_mut())
                .flat_map(|fc| fc.hunks.iter_mut())
                .find(|h| h.id == *id)
                .map(|h| (&mut h.summary, &mut h.embedding)),
        };

        match slot {
            Some((summary_slot, embedding_slot)) => {
                if summary.is_some() {
                    *summary_slot = summary;
                }
                if embedding.is_some() {
                    *embedding_slot = embedding;
                }
                true
            }
            None => {
                tracing::debug!(?target, "Annotation target not found");
                false
            }
        }
    }
}

fn commit_record(
    repo_url: &str,
    commit: &Commit,
    ids: &mut IdCounters,
    snapshot_ids: &mut HashMap<SnapshotKey, u64>,
) -> CommitRecord {
    let file_changes = commit
        .file_changes
        .iter()
        .enumerate()
        .map(|(index, fc)| file_change_record(fc, index, ids, snapshot_ids))
        .collect();

    CommitRecord {
        sha: commit.sha.clone(),
        repo_url: repo_url.to_string(),
        parents: commit.parents.clone(),
        author: commit.author.clone(),
        email: commit.email.clone(),
        time: commit.time,
        committed_at: DateTime::from_timestamp(commit.time, 0),
        message: commit.message.clone(),
        summary: commit.summary.clone(),
        embedding: commit.embedding.clone(),
        file_changes,
    }
}

fn file_change_record(
    fc: &FileChange,
    index: usize,
    ids: &mut IdCounters,
    snapshot_ids: &mut HashMap<SnapshotKey, u64>,
) -> FileChangeRecord {
    let id = next(&mut ids.file_change);

    let snapshot = fc.snapshot.as_ref().map(|snapshot| {
        let snapshot_id = next(&mut ids.snapshot);
        let previous_snapshot_id = snapshot
            .previous
            .as_ref()
            .and_then(|key| snapshot_ids.get(key).copied());
        snapshot_ids.insert(snapshot.key(index), snapshot_id);
        SnapshotRecord {
            id: snapshot_id,
            commit_sha: snapshot.commit_sha.clone(),
            path: snapshot.path.clone(),
            content: snapshot.content.clone(),
            previous_snapshot_id,
        }
    });

    let hunks = fc
        .hunks
        .iter()
        .map(|hunk| HunkRecord {
            id: next(&mut ids.hunk),
            file_change_id: id,
            commit_sha: hunk.commit_sha.clone(),
            old_start: hunk.old_start,
            old_lines: hunk.old_lines,
            new_start: hunk.new_start,
            new_lines: hunk.new_lines,
            content: hunk.content.clone(),
            summary: hunk.summary.clone(),
            embedding: hunk.embedding.clone(),
        })
        .collect();

    FileChangeRecord {
        id,
        commit_sha: fc.commit_sha.clone(),
        old_path: fc.old_path.clone(),
        new_path: fc.new_path.clone(),
        status: fc.status,
        summary: fc.summary.clone(),
        embedding: fc.embedding.clone(),
        snapshot,
        hunks,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AnnotationTarget {
    Commit(String),
    FileChange(u64),
    Hunk(u64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub target: AnnotationTarget,
    pub summary: Option<String>,
    pub embedding: Option<Vec<f32>>,
}
