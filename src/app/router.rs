use super::state::AppState;
use crate::handler::cors::cors_layer;
use crate::handler::health::{health_handler, root_handler};
use crate::handler::ingest::{ingest_handler, preflight_handler};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};

/// Build the HTTP router (banner, health, ingestion).
pub fn main_router(state: AppState) -> Router {
    let health_router = Router::new()
        .route("/", get(root_handler))
        .route("/v1/health", get(health_handler));

    let ingest_router = Router::new()
        .route(
            "/ingest/v1",
            post(ingest_handler).options(preflight_handler),
        )
        .with_state(state.dispatcher)
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(middleware::from_fn_with_state(state.cors, cors_layer));

    Router::new().merge(health_router).merge(ingest_router)
}
