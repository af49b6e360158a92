//! Snapshot resolution: read one file's text out of a tree.
//!
//! Resolution is fail-soft. A missing segment, a file where a directory was
//! expected, a non-blob terminal entry or an unreadable object all yield
//! `None`; callers record an absent snapshot and carry on.

use git2::{ObjectType, Repository, Tree};

use crate::models::snapshot::sanitize;

/// Resolve a slash-separated `path` inside `tree` to decoded text.
///
/// Bytes are decoded as UTF-8 with replacement characters for invalid
/// sequences, and NUL characters are removed.
pub fn resolve_snapshot(repo: &Repository, tree: &Tree<'_>, path: &str) -> Option<String> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let (file_name, dirs) = segments.split_last()?;

    let mut current = tree.clone();
    for segment in dirs {
        let next = {
            let entry = current.get_name(segment)?;
            if entry.kind() != Some(ObjectType::Tree) {
                return None;
            }
            entry.to_object(repo).ok()?.into_tree().ok()?
        };
        current = next;
    }

    let entry = current.get_name(file_name)?;
    if entry.kind() != Some(ObjectType::Blob) {
        return None;
    }
    let blob = entry.to_object(repo).ok()?.into_blob().ok()?;

    Some(sanitize(String::from_utf8_lossy(blob.content()).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::fixture::Fixture;

    fn tree_of<'r>(fixture: &'r Fixture, files: &[(&str, &str)]) -> Tree<'r> {
        let oid = fixture.tree(files);
        fixture.repo.find_tree(oid).unwrap()
    }

    #[test]
    fn test_resolves_nested_path() {
        let fixture = Fixture::new();
        let tree = tree_of(&fixture, &[("src/git/tree.rs", "fn main() {}\n"), ("README", "hi\n")]);

        assert_eq!(
            resolve_snapshot(&fixture.repo, &tree, "src/git/tree.rs").as_deref(),
            Some("fn main() {}\n")
        );
        assert_eq!(resolve_snapshot(&fixture.repo, &tree, "README").as_deref(), Some("hi\n"));
    }

    #[test]
    fn test_missing_path_is_none() {
        let fixture = Fixture::new();
        let tree = tree_of(&fixture, &[("src/lib.rs", "")]);

        assert_eq!(resolve_snapshot(&fixture.repo, &tree, "src/main.rs"), None);
        assert_eq!(resolve_snapshot(&fixture.repo, &tree, "docs/guide.md"), None);
        assert_eq!(resolve_snapshot(&fixture.repo, &tree, ""), None);
    }

    #[test]
    fn test_file_in_directory_position_is_none() {
        let fixture = Fixture::new();
        let tree = tree_of(&fixture, &[("config", "x = 1\n")]);

        assert_eq!(resolve_snapshot(&fixture.repo, &tree, "config/app.toml"), None);
    }

    #[test]
    fn test_directory_as_terminal_is_none() {
        let fixture = Fixture::new();
        let tree = tree_of(&fixture, &[("src/lib.rs", "")]);

        assert_eq!(resolve_snapshot(&fixture.repo, &tree, "src"), None);
    }

    #[test]
    fn test_nul_bytes_are_stripped() {
        let fixture = Fixture::new();
        let tree = tree_of(&fixture, &[("data.bin", "ab\0cd\0")]);

        assert_eq!(resolve_snapshot(&fixture.repo, &tree, "data.bin").as_deref(), Some("abcd"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let fixture = Fixture::new();
        let blob = fixture.repo.blob(&[b'o', b'k', 0xff, b'!']).unwrap();
        let mut builder = fixture.repo.treebuilder(None).unwrap();
        builder.insert("latin1.txt", blob, 0o100644).unwrap();
        let tree = fixture.repo.find_tree(builder.write().unwrap()).unwrap();

        assert_eq!(
            resolve_snapshot(&fixture.repo, &tree, "latin1.txt").as_deref(),
            Some("ok\u{FFFD}!")
        );
    }

    #[test]
    fn test_leading_and_doubled_slashes_are_ignored() {
        let fixture = Fixture::new();
        let tree = tree_of(&fixture, &[("a/b.txt", "b\n")]);

        assert_eq!(resolve_snapshot(&fixture.repo, &tree, "/a//b.txt").as_deref(), Some("b\n"));
    }
}
