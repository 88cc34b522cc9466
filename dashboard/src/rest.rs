use crate::dashboard::DashboardSnapshot;
use crate::metrics;
use crate::model::KnowledgeEntry;
use crate::search::KnowledgeIndex;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::error;

#[derive(Debug, Clone)]
pub struct AppState {
    snapshots: watch::Receiver<DashboardSnapshot>,
    index: Arc<KnowledgeIndex>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<KnowledgeEntry>,
    pub total: usize,
}

pub fn create_router(
    snapshots: watch::Receiver<DashboardSnapshot>,
    index: Arc<KnowledgeIndex>,
) -> Router {
    let state = AppState { snapshots, index };

    Router::new()
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/search", get(search_knowledge))
        .route("/metrics", get(get_metrics))
        .with_state(state)
}

async fn get_dashboard(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    Json(state.snapshots.borrow().clone())
}

async fn search_knowledge(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Json<SearchResponse> {
    let results: Vec<KnowledgeEntry> = state
        .index
        .search(&params.q)
        .into_iter()
        .cloned()
        .collect();

    Json(SearchResponse {
        query: params.q,
        total: results.len(),
        results,
    })
}

async fn get_metrics() -> Result<String, AppError> {
    Ok(metrics::gather_metrics()?)
}

struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("API error: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal server error: {}", self.0),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
