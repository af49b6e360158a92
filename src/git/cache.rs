//! Commit cache shared by every branch walk of one extraction run.
//!
//! Maps sha -> fully extracted `Commit` so a commit reachable from several
//! branches is diffed and stored once.
//! - Writes are first-writer-wins: `insert_if_absent` never overwrites
//! - The lock is held only for a single check or insert, never across an
//!   extraction, so walkers on other threads are not blocked by diffing
//! - Only complete commits are ever inserted, so a cancelled run leaves a
//!   usable, partially populated cache
//!
//! Used by: `BranchWalker::walk()` in history.rs, `RemoteRepo` in repository.rs

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::{AppError, Result};
use crate::models::Commit;

#[derive(Debug, Default)]
pub struct CommitCache {
    commits: Mutex<HashMap<String, Commit>>,
}

impl CommitCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Commit>>> {
        self.commits
            .lock()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))
    }

    pub fn contains(&self, sha: &str) -> Result<bool> {
        Ok(self.lock()?.contains_key(sha))
    }

    /// Insert `commit` unless its sha is already cached. Returns whether this
    /// call stored it.
    pub fn insert_if_absent(&self, commit: Commit) -> Result<bool> {
        match self.lock()?.entry(commit.sha.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(commit);
                Ok(true)
            }
            Entry::Occupied(_) => Ok(false),
        }
    }

    pub fn get(&self, sha: &str) -> Result<Option<Commit>> {
        Ok(self.lock()?.get(sha).cloned())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    /// All cached shas, sorted.
    pub fn shas(&self) -> Result<Vec<String>> {
        let mut shas: Vec<String> = self.lock()?.keys().cloned().collect();
        shas.sort();
        Ok(shas)
    }

    /// Run `f` against the cached commits while holding the lock.
    pub fn with_commits<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&HashMap<String, Commit>) -> T,
    {
        let commits = self.lock()?;
        Ok(f(&commits))
    }

    /// Exclusive access without locking, for post-walk passes such as
    /// snapshot linking.
    pub fn commits_mut(&mut self) -> Result<&mut HashMap<String, Commit>> {
        self.commits
            .get_mut()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))
    }

    pub fn into_commits(self) -> Result<HashMap<String, Commit>> {
        self.commits
            .into_inner()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))
    }
}
