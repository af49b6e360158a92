//! API route handlers - the HTTP boundary around the extraction engine.
//!
//! - `ingest`: clone and extract a repository (POST /api/v1/ingest)

pub mod ingest;

use axum::Router;
use tokio_util::sync::CancellationToken;

/// State shared by all handlers. Cancelling `cancel` stops running ingests
/// between commits.
#[derive(Clone, Default)]
pub struct AppState {
    pub cancel: CancellationToken,
}

pub fn create_router(state: AppState) -> Router {
    Router::new().merge(ingest::routes(state))
}
