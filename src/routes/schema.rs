use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use serde_json::json;

use crate::error::AppError;
use crate::ingest::parser;
use crate::ingest::IngestError;
use crate::state::SharedState;

pub async fn list_versions(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let schemas = state.pipeline.schemas();
    Json(json!({
        "versions": schemas.versions(),
        "latest": schemas.latest().map(|s| s.version()),
    }))
}

pub async fn get_schema(
    State(state): State<SharedState>,
    Path(version): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let schema = state
        .pipeline
        .schemas()
        .get_schema(&version)
        .map_err(|e| AppError::NotFound(e.to_string()))?;
    Ok(Json(schema.document().clone()))
}

/// Check a payload the way a fetched one would be checked, without storing anything.
pub async fn validate(State(state): State<SharedState>, body: Bytes) -> Json<serde_json::Value> {
    let payload = match parser::parse_body(&body) {
        Ok(payload) => payload,
        Err(e) => {
            return Json(json!({
                "valid": false,
                "error": IngestError::MalformedPayload(e).to_string(),
            }))
        }
    };

    match state.pipeline.check(&payload) {
        Ok(schema) => Json(json!({
            "valid": true,
            "version": schema.version(),
        })),
        Err(IngestError::SchemaViolation(violation)) => Json(json!({
            "valid": false,
            "error": format!("Invalid data: {violation}"),
            "path": violation.path,
            "message": violation.message,
        })),
        Err(err) => Json(json!({
            "valid": false,
            "error": err.to_string(),
        })),
    }
}
