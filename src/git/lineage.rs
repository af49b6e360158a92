//! Snapshot lineage: order commits by history and link each snapshot to the
//! previous snapshot of the same file.
//!
//! Walk order is newest-first, the reverse of history, so links are resolved
//! only after every branch has been walked. History order is a topological
//! sort (parents before children) with ties broken by commit time, then sha.
//! A child committed "before" its parent (clock skew) therefore still comes
//! after it. Parents outside the cache (shallow boundary, commit limit) are
//! ignored.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::models::{Commit, SnapshotKey};

/// Shas of `commits` in history order.
pub fn history_order(commits: &HashMap<String, Commit>) -> Vec<String> {
    let mut pending_parents: HashMap<&str, usize> = HashMap::with_capacity(commits.len());
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();

    for commit in commits.values() {
        let mut known = 0;
        for parent in &commit.parents {
            if commits.contains_key(parent) {
                known += 1;
                children.entry(parent.as_str()).or_default().push(commit.sha.as_str());
            }
        }
        pending_parents.insert(commit.sha.as_str(), known);
    }

    let mut ready: BinaryHeap<Reverse<(i64, &str)>> = commits
        .values()
        .filter(|c| pending_parents.get(c.sha.as_str()) == Some(&0))
        .map(|c| Reverse((c.time, c.sha.as_str())))
        .collect();

    let mut order = Vec::with_capacity(commits.len());
    while let Some(Reverse((_, sha))) = ready.pop() {
        order.push(sha.to_string());
        for child in children.get(sha).into_iter().flatten() {
            if let Some(count) = pending_parents.get_mut(child) {
                *count -= 1;
                if *count == 0 {
                    ready.push(Reverse((commits[*child].time, *child)));
                }
            }
        }
    }

    order
}

/// Point every snapshot at the most recent earlier snapshot of its file.
///
/// Renames and copies look their predecessor up under `old_path`; everything
/// else under the snapshot's own path. Returns the number of links set.
/// Existing links are recomputed, so calling this twice is harmless.
///
/// A commit's snapshots become visible only after all of its changes are
/// linked, so a link always points into an earlier commit.
pub fn link_snapshots(commits: &mut HashMap<String, Commit>) -> usize {
    let order = history_order(commits);
    let mut latest: HashMap<String, SnapshotKey> = HashMap::new();
    let mut links = 0;

    for sha in &order {
        let Some(commit) = commits.get_mut(sha) else {
            continue;
        };
        let mut published = Vec::new();

        for (index, change) in commit.file_changes.iter_mut().enumerate() {
            let lookup = if change.status.moves_path() {
                change.old_path.as_str()
            } else {
                change.snapshot_path()
            };
            let previous = latest.get(lookup).cloned();

            let Some(snapshot) = change.snapshot.as_mut() else {
                continue;
            };
            if previous.is_some() {
                links += 1;
            }
            snapshot.previous = previous;
            published.push((snapshot.path.clone(), snapshot.key(index)));
        }

        // Later changes win: the Added half of a Deleted/Added pair is the
        // live version of the path.
        latest.extend(published);
    }

    tracing::debug!(commits = order.len(), links, "Linked snapshots");
    links
}
