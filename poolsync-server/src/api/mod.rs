//! API Routes
//!
//! The orchestrator-facing processor endpoint plus the watcher REST API.

pub mod processor;
mod watchers;

#[cfg(test)]
mod processor_tests;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get},
    Router,
};
use serde::Serialize;

use poolsync_types::ValidationError;

use crate::state::AppState;

/// Where the orchestrator sends block POST/DELETE requests.
pub const PROCESSOR_PATH: &str = "/shared/iapp/processors/basicPoolConfig";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/watchers", get(watchers::list_watchers).post(watchers::start_watcher))
        .route("/watchers/*key", delete(watchers::stop_watcher))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    pub watchers: usize,
    pub busy_pools: Vec<String>,
}

async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        watchers: state.watchers().len(),
        busy_pools: state.engine().busy_pools(),
    })
}

/// Request rejected before anything was accepted.
#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationError),
    NotFound(String),
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(ValidationError::MalformedTask { message: rejection.body_text() })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(e) => {
                tracing::info!("Rejected request: {}", e);
                (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({ "error": e.to_string(), "details": e })),
                )
                    .into_response()
            },
            Self::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": message })))
                    .into_response()
            },
        }
    }
}
