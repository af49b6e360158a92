//! Application error types and HTTP response mapping.
//!
//! `AppError` covers every fatal condition of an extraction run. Each variant
//! names the stage that failed so the boundary can report a single clear
//! failure. Per-file snapshot problems never show up here: the extractor
//! absorbs them into the data model.
//!
//! Error mappings:
//! - `Clone`, `Destination` → 502
//! - `BranchResolution` → 404
//! - `CommitExtraction`, `UnknownStatus`, `Git`, `Io`, `Json`, `Internal` → 500
//! - `Cancelled` → 503

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to clone {url}: {source}")]
    Clone {
        url: String,
        #[source]
        source: git2::Error,
    },

    #[error("Working copy unusable at {path}: {reason}")]
    Destination { path: String, reason: String },

    #[error("Cannot resolve branch {branch}: {reason}")]
    BranchResolution { branch: String, reason: String },

    #[error("Failed to extract commit {sha}: {source}")]
    CommitExtraction {
        sha: String,
        #[source]
        source: Box<AppError>,
    },

    #[error("Unknown change status {status} for {path}")]
    UnknownStatus { path: String, status: String },

    #[error("Extraction cancelled")]
    Cancelled,

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Which stage of the run produced this error.
    pub fn stage(&self) -> &'static str {
        match self {
            AppError::Clone { .. } | AppError::Destination { .. } => "clone",
            AppError::BranchResolution { .. } => "branch",
            AppError::CommitExtraction { .. } | AppError::UnknownStatus { .. } => "commit",
            AppError::Cancelled => "cancelled",
            AppError::Git(_) | AppError::Io(_) | AppError::Json(_) | AppError::Internal(_) => {
                "internal"
            }
        }
    }

    /// Wrap a failure that happened while reading one commit.
    pub fn in_commit(sha: impl Into<String>, err: AppError) -> Self {
        match err {
            // Already attributed, or not a commit-level failure.
            AppError::CommitExtraction { .. } | AppError::Cancelled => err,
            other => AppError::CommitExtraction {
                sha: sha.into(),
                source: Box::new(other),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Clone { .. } | AppError::Destination { .. } => StatusCode::BAD_GATEWAY,
            AppError::BranchResolution { .. } => StatusCode::NOT_FOUND,
            AppError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            AppError::CommitExtraction { .. }
            | AppError::UnknownStatus { .. }
            | AppError::Git(_)
            | AppError::Io(_)
            | AppError::Json(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "stage": self.stage(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_commit_wraps_once() {
        let inner = AppError::UnknownStatus {
            path: "a.txt".to_string(),
            status: "Typechange".to_string(),
        };
        let wrapped = AppError::in_commit("abc", inner);
        assert_eq!(wrapped.stage(), "commit");

        let rewrapped = AppError::in_commit("def", wrapped);
        match rewrapped {
            AppError::CommitExtraction { sha, .. } => assert_eq!(sha, "abc"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cancelled_is_not_wrapped() {
        let err = AppError::in_commit("abc", AppError::Cancelled);
        assert!(matches!(err, AppError::Cancelled));
        assert_eq!(err.stage(), "cancelled");
    }

    #[test]
    fn test_status_codes() {
        let clone = AppError::Destination {
            path: "/tmp/x".to_string(),
            reason: "not empty".to_string(),
        };
        assert_eq!(clone.into_response().status(), StatusCode::BAD_GATEWAY);

        let branch = AppError::BranchResolution {
            branch: "origin/nope".to_string(),
            reason: "not found".to_string(),
        };
        assert_eq!(branch.into_response().status(), StatusCode::NOT_FOUND);

        assert_eq!(
            AppError::Cancelled.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
