use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    /// Shas reachable from the tip, in walk order (newest first)
    pub commits: Vec<String>,
}

impl Branch {
    pub fn head_commit(&self) -> Option<&str> {
        self.commits.first().map(String::as_str)
    }
}
