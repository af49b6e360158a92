//! Repository ingest endpoint.
//!
//! - POST /api/v1/ingest { url, context_lines?, max_commits?, detect_renames? }
//!   Clones the repository, extracts every branch and returns the
//!   persistence records. Extraction runs on the blocking pool.
//!   Any fatal failure becomes a single `{error, stage}` response.

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crate::config::ExtractionConfig;
use crate::error::{AppError, Result};
use crate::ingest::ingest;
use crate::models::RepositoryRecord;

use super::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/ingest", post(ingest_repo))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub url: String,
    #[serde(flatten)]
    pub config: ExtractionConfig,
}

async fn ingest_repo(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<RepositoryRecord>> {
    let cancel = state.cancel.child_token();
    tracing::info!(url = %request.url, config = ?request.config, "Ingest requested");

    let record = tokio::task::spawn_blocking(move || ingest(&request.url, &request.config, &cancel))
        .await
        .map_err(|err| AppError::Internal(format!("Ingest task failed: {err}")))??;

    Ok(Json(record))
}
