//! Scratch repositories for engine tests.
//!
//! Each `commit` call writes the complete tree it is given, so a test states
//! exactly which files exist at every commit.

use git2::{Oid, Repository, Signature, Time};
use std::collections::BTreeMap;
use tempfile::TempDir;

pub struct Fixture {
    pub dir: TempDir,
    pub repo: Repository,
}

enum Node {
    File(Vec<u8>),
    Dir(BTreeMap<String, Node>),
}

impl Fixture {
    /// Empty repository whose HEAD points at the unborn `main` branch.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        repo.set_head("refs/heads/main").unwrap();
        Self { dir, repo }
    }

    pub fn path(&self) -> &str {
        self.dir.path().to_str().unwrap()
    }

    pub fn commit(&self, branch: &str, parents: &[Oid], files: &[(&str, &str)], time: i64) -> Oid {
        let tree = self.repo.find_tree(self.tree(files)).unwrap();
        let signature = Signature::new("Ada Lovelace", "ada@example.com", &Time::new(time, 0)).unwrap();
        let parents: Vec<git2::Commit> = parents
            .iter()
            .map(|oid| self.repo.find_commit(*oid).unwrap())
            .collect();
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();

        self.repo
            .commit(
                Some(&format!("refs/heads/{branch}")),
                &signature,
                &signature,
                &format!("commit at {time}\n\n"),
                &tree,
                &parent_refs,
            )
            .unwrap()
    }

    /// Write `files` as a (possibly nested) tree and return its id.
    pub fn tree(&self, files: &[(&str, &str)]) -> Oid {
        let mut root = BTreeMap::new();
        for (path, content) in files {
            let segments: Vec<&str> = path.split('/').collect();
            insert(&mut root, &segments, content.as_bytes());
        }
        write_tree(&self.repo, &root)
    }
}

fn insert(nodes: &mut BTreeMap<String, Node>, segments: &[&str], content: &[u8]) {
    match segments {
        [] => {}
        [name] => {
            nodes.insert(name.to_string(), Node::File(content.to_vec()));
        }
        [dir, rest @ ..] => {
            let entry = nodes
                .entry(dir.to_string())
                .or_insert_with(|| Node::Dir(BTreeMap::new()));
            if let Node::Dir(children) = entry {
                insert(children, rest, content);
            }
        }
    }
}

fn write_tree(repo: &Repository, nodes: &BTreeMap<String, Node>) -> Oid {
    let mut builder = repo.treebuilder(None).unwrap();
    for (name, node) in nodes {
        match node {
            Node::File(data) => {
                let oid = repo.blob(data).unwrap();
                builder.insert(name, oid, 0o100644).unwrap();
            }
            Node::Dir(children) => {
                let oid = write_tree(repo, children);
                builder.insert(name, oid, 0o040000).unwrap();
            }
        }
    }
    builder.write().unwrap()
}
