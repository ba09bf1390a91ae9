#![allow(clippy::unwrap_used, clippy::indexing_slicing, reason = "test assertions")]

use axum::http::{header, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use std::time::Duration;

use poolsync_types::{SyncError, TerminalState};

use super::PROCESSOR_PATH;
use crate::router::build_router;
use crate::test_helpers::{local_sync_properties, task_body, test_app_state, TestContext};

fn server(ctx: &TestContext) -> TestServer {
    TestServer::new(build_router(ctx.state.clone())).unwrap()
}

#[tokio::test]
async fn test_sync_request_is_accepted_then_bound() {
    let ctx = test_app_state();
    let server = server(&ctx);

    let response = server
        .post(PROCESSOR_PATH)
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("Basic YWRtaW46YWRtaW4="))
        .json(&task_body("block-1", &local_sync_properties("web")))
        .await;

    response.assert_status(StatusCode::ACCEPTED);
    let body: Value = response.json();
    assert_eq!(body, json!({ "id": "block-1", "state": "ACCEPTED" }));

    let reports = ctx.sink.wait_for(1).await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].attempt_id, "block-1");
    assert_eq!(reports[0].state, TerminalState::Bound);
    assert_eq!(reports[0].origin.uri, ctx.state.processor_uri());
    assert_eq!(
        reports[0].origin.credentials.as_ref().map(|c| c.header_value().to_string()),
        Some("Basic YWRtaW46YWRtaW4=".to_string())
    );
    assert_eq!(ctx.gateway.members("web"), vec!["10.0.0.1:80", "10.0.0.2:80"]);
}

#[tokio::test]
async fn test_missing_property_rejected_before_acceptance() {
    let ctx = test_app_state();
    let server = server(&ctx);
    let properties: Vec<_> = local_sync_properties("web")
        .into_iter()
        .filter(|(name, _)| *name != "deviceGroupName")
        .collect();

    let response = server.post(PROCESSOR_PATH).json(&task_body("block-2", &properties)).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["details"]["type"], "MissingProperty");
    assert_eq!(body["details"]["details"]["name"], "deviceGroupName");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(ctx.sink.reports().is_empty());
    assert!(ctx.gateway.calls().is_empty());
}

#[tokio::test]
async fn test_bad_member_rejected() {
    let ctx = test_app_state();
    let server = server(&ctx);
    let mut properties = local_sync_properties("web");
    properties[2] = ("poolMembers", json!(["10.0.0.1"]));

    let response = server.post(PROCESSOR_PATH).json(&task_body("block-3", &properties)).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["details"]["type"], "InvalidMember");
}

#[tokio::test]
async fn test_malformed_body_rejected() {
    let ctx = test_app_state();
    let server = server(&ctx);

    let response = server.post(PROCESSOR_PATH).json(&json!({ "block": "nope" })).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["details"]["type"], "MalformedTask");
}

#[tokio::test]
async fn test_teardown_needs_only_pool_properties() {
    let ctx = test_app_state();
    ctx.gateway.insert_pool("web", "round-robin", &["10.0.0.1:80"]);
    let server = server(&ctx);
    let properties = vec![
        ("poolName", json!("web")),
        ("poolType", json!("round-robin")),
        ("poolMembers", json!([])),
    ];

    let response = server.delete(PROCESSOR_PATH).json(&task_body("block-4", &properties)).await;

    response.assert_status(StatusCode::ACCEPTED);
    let reports = ctx.sink.wait_for(1).await;
    assert_eq!(reports[0].state, TerminalState::Unbound);
    assert!(reports[0].origin.credentials.is_none());
    assert!(ctx.gateway.pool("web").is_none());
}

#[tokio::test]
async fn test_teardown_of_absent_pool_is_unbound() {
    let ctx = test_app_state();
    let server = server(&ctx);

    let response = server
        .delete(PROCESSOR_PATH)
        .json(&task_body("block-5", &local_sync_properties("ghost")))
        .await;

    response.assert_status(StatusCode::ACCEPTED);
    let reports = ctx.sink.wait_for(1).await;
    assert_eq!(reports[0].state, TerminalState::Unbound);
}

#[tokio::test]
async fn test_gateway_failure_surfaces_in_report_only() {
    let ctx = test_app_state();
    ctx.gateway.reject(poolsync_types::GatewayOperation::CreatePool);
    let server = server(&ctx);

    let response =
        server.post(PROCESSOR_PATH).json(&task_body("block-6", &local_sync_properties("web"))).await;

    response.assert_status(StatusCode::ACCEPTED);
    let reports = ctx.sink.wait_for(1).await;
    assert_eq!(reports[0].state, TerminalState::Error);
    assert!(matches!(reports[0].cause, Some(SyncError::Stage { .. })));
}

#[tokio::test]
async fn test_health_endpoints() {
    let ctx = test_app_state();
    let server = server(&ctx);

    for path in ["/health", "/healthz"] {
        let response = server.get(path).await;
        response.assert_status_ok();
        response.assert_json(&json!({ "status": "ok" }));
    }
}
