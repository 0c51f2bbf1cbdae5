pub mod config;
pub mod error;
pub mod state;
pub mod db;
pub mod models;
pub mod routes;
pub mod schema;
pub mod store;
pub mod ingest;

use std::sync::Arc;

use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::ingest::{Fetcher, Pipeline};
use crate::schema::SchemaRegistry;
use crate::state::{AppState, SharedState};
use crate::store::EventStore;

/// Wire the pipeline to its collaborators.
pub fn build_state(
    config: Config,
    store: Arc<dyn EventStore>,
    fetcher: Arc<dyn Fetcher>,
    schemas: SchemaRegistry,
) -> SharedState {
    tracing::info!("Schema versions: {}", schemas.versions().join(", "));

    let pipeline = Pipeline::new(fetcher, store.clone(), Arc::new(schemas))
        .keep_failed_submissions(config.keep_failed_submissions);

    Arc::new(AppState {
        config,
        store,
        pipeline,
    })
}

pub fn build_app(state: SharedState) -> Router {
    let max_body_size = state.config.max_body_size;

    Router::new()
        .merge(routes::api_routes())
        .route("/health", axum::routing::get(health))
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
