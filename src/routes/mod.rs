pub mod events;
pub mod logs;
pub mod schema;

use axum::routing::{get, post, put};
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Events
        .route("/api/v1/events", post(events::submit))
        .route("/api/v1/events/{id}", get(events::get))
        .route("/api/v1/events/{id}/fetch", post(events::fetch))
        .route("/api/v1/events/{id}/review", put(events::review))
        .route("/api/v1/events/{id}/logs", get(events::logs))
        // Audit log
        .route("/api/v1/logs", get(logs::feed))
        // Schemas
        .route("/api/v1/schema", get(schema::list_versions))
        .route("/api/v1/schema/{version}", get(schema::get_schema))
        .route("/api/v1/validate", post(schema::validate))
}

#[derive(Deserialize)]
pub struct Paging {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

async fn list_logs(
    state: &SharedState,
    event_id: Option<Uuid>,
    paging: &Paging,
) -> Result<serde_json::Value, AppError> {
    let page = paging.page.unwrap_or(1).max(1);
    let per_page = paging.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1).saturating_mul(per_page);

    let logs = state.store.list_logs(event_id, per_page, offset).await?;
    let total = state.store.count_logs(event_id).await?;

    Ok(json!({
        "logs": logs,
        "total": total,
        "page": page,
        "per_page": per_page,
        "total_pages": (total as f64 / per_page as f64).ceil() as i64,
    }))
}
