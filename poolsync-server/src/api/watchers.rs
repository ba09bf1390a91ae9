//! Registry watcher handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use std::time::Duration;

use poolsync_core::sync::watcher::WatcherStatus;
use poolsync_core::WatcherHandle;
use poolsync_types::{ConfigTaskState, ValidationError, SYNC_PROPERTIES};

use super::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StartWatcherRequest {
    pub task: ConfigTaskState,
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
}

pub async fn start_watcher(
    State(state): State<AppState>,
    payload: Result<Json<StartWatcherRequest>, JsonRejection>,
) -> Result<Json<WatcherHandle>, ApiError> {
    let Json(request) = payload?;
    let desired = request.task.desired_state(SYNC_PROPERTIES)?;

    let interval = match request.poll_interval_secs {
        Some(0) => {
            return Err(ValidationError::invalid("poll_interval_secs", "must be at least 1").into())
        },
        Some(secs) => Some(Duration::from_secs(secs)),
        None => None,
    };

    Ok(Json(state.watchers().start(desired, interval)))
}

pub async fn list_watchers(State(state): State<AppState>) -> Json<Vec<WatcherStatus>> {
    Json(state.watchers().list().await)
}

pub async fn stop_watcher(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    let key = key.trim_start_matches('/');
    if state.watchers().stop_key(key).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("No watcher running for {}", key)))
    }
}
