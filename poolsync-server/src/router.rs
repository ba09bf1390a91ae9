use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::api::{self, processor, PROCESSOR_PATH};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let processor_routes = Router::<AppState>::new().route(
        PROCESSOR_PATH,
        post(processor::handle_sync).delete(processor::handle_teardown),
    );

    let public_routes = Router::<AppState>::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .route("/version", get(version_info));

    Router::<AppState>::new()
        .nest("/api", api::router())
        .merge(processor_routes)
        .merge(public_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, axum::Json(serde_json::json!({"status": "ok"})))
}

async fn version_info() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({
            "cargo_version": env!("CARGO_PKG_VERSION"),
        })),
    )
}
