use git2::build::RepoBuilder;
use git2::{BranchType, FetchOptions, ReferenceType, Repository};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use crate::config::ExtractionConfig;
use crate::error::{AppError, Result};
use crate::git::cache::CommitCache;
use crate::git::diff::{CommitExtractor, Extract};
use crate::git::history::{BranchWalker, WalkStats};
use crate::git::lineage::{history_order, link_snapshots};
use crate::models::{Branch, RepoIdentity, RepositoryRecord};

/// Local directory holding a bare clone.
///
/// A temporary working copy is deleted when dropped, on every exit path. A
/// caller-supplied one is only deleted by `remove`.
#[derive(Debug)]
pub struct WorkingCopy {
    path: PathBuf,
    temp: Option<TempDir>,
}

impl WorkingCopy {
    pub fn temporary() -> Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix("git-lineage-")
            .tempdir()
            .map_err(|err| AppError::Destination {
                path: std::env::temp_dir().display().to_string(),
                reason: err.to_string(),
            })?;
        Ok(Self {
            path: temp.path().to_path_buf(),
            temp: Some(temp),
        })
    }

    /// Use `path`, creating it if needed. An existing non-empty directory is
    /// rejected rather than overwritten.
    pub fn at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let destination_error = |reason: String| AppError::Destination {
            path: path.display().to_string(),
            reason,
        };

        if path.exists() {
            let mut entries = std::fs::read_dir(&path).map_err(|e| destination_error(e.to_string()))?;
            if entries.next().is_some() {
                return Err(destination_error("directory is not empty".to_string()));
            }
        } else {
            std::fs::create_dir_all(&path).map_err(|e| destination_error(e.to_string()))?;
        }

        Ok(Self { path, temp: None })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn remove(self) -> Result<()> {
        match self.temp {
            Some(temp) => temp.close()?,
            None => {
                if self.path.exists() {
                    std::fs::remove_dir_all(&self.path)?;
                }
            }
        }
        Ok(())
    }
}

/// Totals for a whole extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    pub branches: usize,
    pub commits: usize,
    pub extracted: usize,
    pub reused: usize,
    pub degraded_snapshots: usize,
    pub truncated_branches: usize,
    pub snapshot_links: usize,
}

impl ExtractionReport {
    fn absorb(&mut self, stats: &WalkStats) {
        self.branches += 1;
        self.extracted += stats.extracted;
        self.reused += stats.reused;
        self.degraded_snapshots += stats.degraded_snapshots;
        if stats.truncated {
            self.truncated_branches += 1;
        }
    }
}

/// A cloned remote and everything extracted from it.
///
/// Lifecycle: `clone_remote` → `extract` → `to_records` → `remove`. The
/// working copy can be removed whether or not translation succeeded.
pub struct RemoteRepo {
    pub url: String,
    pub owner: String,
    pub name: String,
    pub default_branch: String,
    /// Remote branch names, without the symbolic `origin/HEAD`
    pub branch_names: Vec<String>,
    config: ExtractionConfig,
    repo: Repository,
    working_copy: WorkingCopy,
    cache: CommitCache,
    branches: Vec<Branch>,
}

impl RemoteRepo {
    /// Bare-clone `url` into `dest` (or a temporary directory), limited to
    /// `config.max_commits` of depth when set.
    pub fn clone_remote(url: &str, dest: Option<&Path>, config: ExtractionConfig) -> Result<Self> {
        let span = tracing::info_span!("clone", url);
        let _enter = span.enter();

        let (owner, name) = parse_repo_url(url);
        let working_copy = match dest {
            Some(path) => WorkingCopy::at(path)?,
            None => WorkingCopy::temporary()?,
        };

        tracing::info!(path = %working_copy.path().display(), "Cloning repository");

        // libgit2's local transport cannot fetch shallow; the walk limit
        // still applies there.
        let mut fetch = FetchOptions::new();
        if let Some(depth) = config.max_commits.filter(|_| !is_local(url)) {
            fetch.depth(i32::try_from(depth).unwrap_or(i32::MAX));
        }

        let repo = match RepoBuilder::new()
            .bare(true)
            .fetch_options(fetch)
            .clone(url, working_copy.path())
        {
            Ok(repo) => repo,
            Err(source) => {
                if let Err(err) = working_copy.remove() {
                    tracing::warn!(error = %err, "Failed to remove working copy after failed clone");
                }
                return Err(AppError::Clone {
                    url: url.to_string(),
                    source,
                });
            }
        };

        let branch_names = remote_branch_names(&repo)?;
        let default_branch = default_branch(&repo)?;
        tracing::info!(branches = ?branch_names, default_branch = %default_branch, "Cloned repository");

        Ok(Self {
            url: url.to_string(),
            owner,
            name,
            default_branch,
            branch_names,
            config,
            repo,
            working_copy,
            cache: CommitCache::new(),
            branches: Vec::new(),
        })
    }

    /// Walk every remote branch with the default extractor, then link
    /// snapshots in history order.
    pub fn extract(&mut self, cancel: &CancellationToken) -> Result<ExtractionReport> {
        let extractor = CommitExtractor::new(&self.config);
        self.extract_with(&extractor, cancel)
    }

    /// Like `extract`, with a caller-chosen extractor.
    pub fn extract_with<E: Extract>(&mut self, extractor: &E, cancel: &CancellationToken) -> Result<ExtractionReport> {
        let mut report = ExtractionReport::default();
        let mut branches = Vec::with_capacity(self.branch_names.len());

        for name in &self.branch_names {
            let walker = BranchWalker::new(&self.repo, &self.cache, extractor, cancel)
                .max_commits(self.config.max_commits);
            let (branch, stats) = walker.walk(name)?;
            report.absorb(&stats);
            branches.push(branch);
        }
        self.branches = branches;

        let commits = self.cache.commits_mut()?;
        report.snapshot_links = link_snapshots(commits);
        report.commits = commits.len();

        tracing::info!(
            commits = report.commits,
            extracted = report.extracted,
            reused = report.reused,
            degraded_snapshots = report.degraded_snapshots,
            "Extraction finished"
        );
        Ok(report)
    }

    /// Translate the extracted graph into persistence records. Nothing is
    /// re-extracted.
    pub fn to_records(&self) -> Result<RepositoryRecord> {
        let identity = RepoIdentity {
            url: self.url.clone(),
            owner: self.owner.clone(),
            name: self.name.clone(),
            default_branch: self.default_branch.clone(),
        };
        self.cache.with_commits(|commits| {
            let order = history_order(commits);
            RepositoryRecord::from_extraction(identity, &self.branches, commits, &order)
        })
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn cache(&self) -> &CommitCache {
        &self.cache
    }

    pub fn path(&self) -> &Path {
        self.working_copy.path()
    }

    /// Close the repository and delete the working copy.
    pub fn remove(self) -> Result<()> {
        let RemoteRepo {
            repo, working_copy, ..
        } = self;
        drop(repo);
        tracing::info!(path = %working_copy.path().display(), "Removing working copy");
        working_copy.remove()
    }
}

fn remote_branch_names(repo: &Repository) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for branch in repo.branches(Some(BranchType::Remote))? {
        let (branch, _) = branch?;
        if branch.get().kind() == Some(ReferenceType::Symbolic) {
            continue;
        }
        let Some(name) = branch.name()? else {
            continue;
        };
        if name.ends_with("/HEAD") {
            continue;
        }
        names.push(name.to_string());
    }
    names.sort();
    Ok(names)
}

/// The branch the clone's HEAD tracks, e.g. `main` or `release/1.x`.
fn default_branch(repo: &Repository) -> Result<String> {
    let head = repo.find_reference("HEAD")?;
    let name = match head.symbolic_target() {
        Some(target) => target.strip_prefix("refs/heads/").unwrap_or(target).to_string(),
        None => "HEAD".to_string(),
    };
    Ok(name)
}

fn is_local(url: &str) -> bool {
    url.starts_with("file://") || Path::new(url).exists()
}

/// Split a clone URL into `(owner, name)` using its last two path segments.
///
/// Handles `https://host/owner/name(.git)`, `git@host:owner/name.git` and
/// plain filesystem paths. Missing parts come back empty.
pub fn parse_repo_url(url: &str) -> (String, String) {
    let trimmed = url.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    let mut segments = trimmed.rsplit(['/', ':']).filter(|s| !s.is_empty());

    let name = segments.next().unwrap_or_default().to_string();
    let owner = segments.next().unwrap_or_default().to_string();
    (owner, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::fixture::Fixture;
    use crate::models::FileChangeStatus;

    fn build_source() -> Fixture {
        let fixture = Fixture::new();
        let c1 = fixture.commit("main", &[], &[("a.txt", "one\n"), ("lib/util.rs", "// v1\n")], 1_000);
        let c2 = fixture.commit("main", &[c1], &[("a.txt", "two\n"), ("lib/util.rs", "// v1\n")], 2_000);
        fixture.commit("main", &[c2], &[("lib/util.rs", "// v1\n")], 3_000);
        fixture.commit("feature", &[c2], &[("a.txt", "feature\n"), ("lib/util.rs", "// v1\n")], 4_000);
        fixture
    }

    #[test]
    fn test_parse_repo_url() {
        let cases = [
            ("https://github.com/acme/widgets", ("acme", "widgets")),
            ("https://github.com/acme/widgets.git", ("acme", "widgets")),
            ("https://github.com/acme/widgets/", ("acme", "widgets")),
            ("git@github.com:acme/widgets.git", ("acme", "widgets")),
            ("/srv/git/widgets", ("git", "widgets")),
            ("widgets", ("", "widgets")),
        ];
        for (url, (owner, name)) in cases {
            assert_eq!(parse_repo_url(url), (owner.to_string(), name.to_string()), "{url}");
        }
    }

    #[test]
    fn test_depth_limited_local_clone_walks_limit() {
        let source = build_source();
        let config = ExtractionConfig {
            max_commits: Some(2),
            ..ExtractionConfig::default()
        };
        let mut repo = RemoteRepo::clone_remote(source.path(), None, config).unwrap();

        let report = repo.extract(&CancellationToken::new()).unwrap();
        assert_eq!(report.truncated_branches, 2);
        assert!(repo.branches().iter().all(|b| b.commits.len() == 2));
        // feature: c4, c2; main: c3, c2
        assert_eq!(report.commits, 3);
        repo.remove().unwrap();
    }

    #[test]
    fn test_clone_lists_remote_branches() {
        let source = build_source();
        let repo = RemoteRepo::clone_remote(source.path(), None, ExtractionConfig::default()).unwrap();

        assert_eq!(repo.default_branch, "main");
        assert_eq!(repo.branch_names, vec!["origin/feature".to_string(), "origin/main".to_string()]);
        assert!(repo.path().exists());

        let path = repo.path().to_path_buf();
        repo.remove().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_extract_and_translate() {
        let source = build_source();
        let mut repo = RemoteRepo::clone_remote(source.path(), None, ExtractionConfig::default()).unwrap();

        let report = repo.extract(&CancellationToken::new()).unwrap();
        assert_eq!(report.branches, 2);
        assert_eq!(report.commits, 4);
        assert_eq!(report.extracted, 4);
        assert_eq!(report.reused, 2);
        assert_eq!(report.degraded_snapshots, 0);
        assert_eq!(repo.cache().len().unwrap(), 4);

        let record = repo.to_records().unwrap();
        assert_eq!(record.default_branch, "main");
        assert_eq!(record.commits.len(), 4);
        assert_eq!(record.commits[0].time, 1_000);
        assert!(record.commits.windows(2).all(|w| w[0].time <= w[1].time));

        let main = record.branches.iter().find(|b| b.name == "origin/main").unwrap();
        assert_eq!(main.commits.len(), 3);
        assert_eq!(main.head_commit.as_deref(), Some(record.commits[2].sha.as_str()));

        // c3 deletes a.txt: its snapshot is c2's content and links back to it.
        let deletion = record.commits[2]
            .file_changes
            .iter()
            .find(|fc| fc.status == FileChangeStatus::Deleted)
            .unwrap();
        assert_eq!(deletion.old_path, "a.txt");
        let snapshot = deletion.snapshot.as_ref().unwrap();
        assert_eq!(snapshot.content, "two\n");

        let modified = &record.commits[1].file_changes[0];
        assert_eq!(modified.status, FileChangeStatus::Modified);
        let modified_snapshot = modified.snapshot.as_ref().unwrap();
        assert_eq!(snapshot.previous_snapshot_id, Some(modified_snapshot.id));

        repo.remove().unwrap();
    }

    #[test]
    fn test_clone_into_non_empty_dir_fails() {
        let source = build_source();
        let dest = tempfile::tempdir().unwrap();
        std::fs::write(dest.path().join("keep.txt"), "mine").unwrap();

        let err = RemoteRepo::clone_remote(source.path(), Some(dest.path()), ExtractionConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, AppError::Destination { .. }));
        assert!(dest.path().join("keep.txt").exists());
    }

    #[test]
    fn test_clone_into_given_dir_and_remove() {
        let source = build_source();
        let parent = tempfile::tempdir().unwrap();
        let dest = parent.path().join("work.git");

        let repo = RemoteRepo::clone_remote(source.path(), Some(&dest), ExtractionConfig::default()).unwrap();
        assert_eq!(repo.path(), dest.as_path());
        repo.remove().unwrap();
        assert!(!dest.exists());
    }

    #[test]
    fn test_unreachable_remote_is_clone_error() {
        let missing = tempfile::tempdir().unwrap();
        let url = missing.path().join("nothing-here").display().to_string();

        let err = RemoteRepo::clone_remote(&url, None, ExtractionConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, AppError::Clone { .. }));
        assert_eq!(err.stage(), "clone");
    }

    #[test]
    fn test_cancelled_extraction_can_still_be_removed() {
        let source = build_source();
        let mut repo = RemoteRepo::clone_remote(source.path(), None, ExtractionConfig::default()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = repo.extract(&cancel).unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
        assert!(repo.cache().is_empty().unwrap());
        repo.remove().unwrap();
    }
}
