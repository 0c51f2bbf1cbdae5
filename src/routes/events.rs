use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::Event;
use crate::state::SharedState;

use super::Paging;

#[derive(Deserialize)]
pub struct SubmitEvent {
    pub url: String,
}

pub async fn submit(
    State(state): State<SharedState>,
    Json(req): Json<SubmitEvent>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let url = req.url.trim();
    if url.contains('\0') {
        return Err(AppError::BadRequest("URL must not contain NUL characters".to_string()));
    }
    match reqwest::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        Ok(_) => return Err(AppError::BadRequest("URL must use http or https".to_string())),
        Err(e) => return Err(AppError::BadRequest(format!("Invalid URL: {e}"))),
    }

    let submission = state.pipeline.submit(url).await?;

    let status = if submission.event.is_some() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };

    Ok((
        status,
        Json(json!({
            "event": submission.event,
            "log": submission.log,
        })),
    ))
}

pub async fn get(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Event>, AppError> {
    let event = state
        .store
        .find_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    Ok(Json(event))
}

pub async fn fetch(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut event = state
        .store
        .find_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let log = state.pipeline.fetch(&mut event).await?;

    Ok(Json(json!({
        "event": event,
        "log": log,
    })))
}

pub async fn review(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Event>, AppError> {
    let event = state
        .store
        .mark_reviewed(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    tracing::info!("Event {id} marked as reviewed");
    Ok(Json(event))
}

pub async fn logs(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(paging): Query<Paging>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .store
        .find_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    super::list_logs(&state, Some(id), &paging).await.map(Json)
}
