use crate::sender::Dispatcher;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, trace, warn};

/// Default cap on a single ingest request body (16 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Reply to an empty ingest body; lets clients align their clock with the
/// server's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResponse {
    pub t: i64,
}

impl SyncResponse {
    pub fn now() -> Self {
        Self {
            t: chrono::Utc::now().timestamp(),
        }
    }
}

/// Handler for POST /ingest/v1
///
/// The body is one or more complete `_bulk` lines and is queued verbatim.
pub async fn ingest_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    body: Bytes,
) -> Response {
    if body.is_empty() {
        return (StatusCode::OK, Json(SyncResponse::now())).into_response();
    }

    let bytes = body.len();
    match dispatcher.enqueue(body) {
        Ok(()) => {
            trace!(bytes, "Queued ingest payload");
            StatusCode::CREATED.into_response()
        }
        Err(e) if e.is_stopped() => {
            warn!(bytes, "Rejecting ingest payload, dispatcher is shutting down");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
        Err(e) => {
            error!(bytes, error = %e, "Failed to queue ingest payload");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Handler for OPTIONS /ingest/v1 (CORS preflight)
pub async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}
