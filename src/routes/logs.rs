use axum::extract::{Query, State};
use axum::Json;

use crate::error::AppError;
use crate::state::SharedState;

use super::Paging;

/// Ingestion attempts across all events, most recent first.
pub async fn feed(
    State(state): State<SharedState>,
    Query(paging): Query<Paging>,
) -> Result<Json<serde_json::Value>, AppError> {
    super::list_logs(&state, None, &paging).await.map(Json)
}
