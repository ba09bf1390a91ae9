//! Block processor handlers.
//!
//! Validation happens inline; the pipeline runs detached after `202 Accepted`
//! and its outcome travels through the report sink only.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::Json,
};
use serde::{Deserialize, Serialize};

use poolsync_core::SyncRequest;
use poolsync_types::{
    ConfigTaskState, Credentials, Origin, SyncState, SYNC_PROPERTIES, TEARDOWN_PROPERTIES,
};

use super::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedResponse {
    pub id: String,
    pub state: SyncState,
}

#[derive(Debug, Clone, Copy)]
enum Verb {
    Sync,
    Teardown,
}

pub async fn handle_sync(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ConfigTaskState>, JsonRejection>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    accept(&state, &headers, payload, Verb::Sync)
}

pub async fn handle_teardown(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ConfigTaskState>, JsonRejection>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    accept(&state, &headers, payload, Verb::Teardown)
}

fn accept(
    state: &AppState,
    headers: &HeaderMap,
    payload: Result<Json<ConfigTaskState>, JsonRejection>,
    verb: Verb,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    let Json(task) = payload?;
    let required = match verb {
        Verb::Sync => SYNC_PROPERTIES,
        Verb::Teardown => TEARDOWN_PROPERTIES,
    };
    let desired = task.desired_state(required)?;

    let origin = Origin::new(state.processor_uri()).with_credentials(forwarded_credentials(headers));
    let request = SyncRequest::new(task.id.clone(), origin, desired);
    let engine = state.engine();

    tracing::info!(
        task_id = %task.id,
        pool = %engine.target_key(request.desired()),
        "Accepted {:?} request",
        verb
    );

    tokio::spawn(async move {
        match verb {
            Verb::Sync => engine.synchronize(request).await,
            Verb::Teardown => engine.desynchronize(request).await,
        };
    });

    Ok((StatusCode::ACCEPTED, Json(AcceptedResponse { id: task.id, state: SyncState::Accepted })))
}

fn forwarded_credentials(headers: &HeaderMap) -> Option<Credentials> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .map(Credentials::from_header)
}
