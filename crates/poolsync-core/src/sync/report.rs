//! Delivery of terminal attempt states.
//!
//! Sinks are fire-and-forget: a delivery problem is logged and never flows
//! back into the attempt it describes.

use async_trait::async_trait;
use poolsync_types::models::ReportConfig;
use poolsync_types::{SyncReport, TerminalState};
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Header pointing the orchestrator back at the request that started an attempt.
pub const ORIGIN_URI_HEADER: &str = "X-Origin-Uri";

#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn report(&self, report: SyncReport);
}

/// Logs every report; used when no orchestrator endpoint is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReportSink;

#[async_trait]
impl ReportSink for TracingReportSink {
    async fn report(&self, report: SyncReport) {
        log_report(&report);
    }
}

fn log_report(report: &SyncReport) {
    match (&report.state, &report.cause) {
        (TerminalState::Error, Some(cause)) => tracing::warn!(
            attempt_id = %report.attempt_id,
            origin = %report.origin.uri,
            stage = ?cause.stage(),
            kind = ?cause.kind(),
            "Attempt ended in ERROR: {}",
            cause
        ),
        (state, _) => tracing::info!(
            attempt_id = %report.attempt_id,
            origin = %report.origin.uri,
            "Attempt ended in {}",
            state
        ),
    }
}

#[derive(Debug, Serialize)]
struct BlockPatch<'a> {
    state: TerminalState,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(rename = "attemptId")]
    attempt_id: &'a str,
}

pub(crate) fn block_patch_body(report: &SyncReport) -> serde_json::Value {
    let patch = BlockPatch {
        state: report.state,
        error: report.cause.as_ref().map(ToString::to_string),
        attempt_id: &report.attempt_id,
    };
    serde_json::to_value(patch).unwrap_or_else(|_| serde_json::json!({ "state": report.state }))
}

/// PATCHes the terminal state onto the orchestrator's block resource.
pub struct BlockReportSink {
    client: Client,
    block_base_url: String,
}

impl BlockReportSink {
    pub fn new(block_base_url: &str, timeout: Duration) -> AppResult<Self> {
        let trimmed = block_base_url.trim().trim_end_matches('/');
        url::Url::parse(trimmed)
            .map_err(|e| AppError::Config(format!("invalid block_base_url '{}': {}", trimmed, e)))?;

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, block_base_url: trimmed.to_string() })
    }

    pub fn block_url(&self, attempt_id: &str) -> String {
        format!("{}/{}", self.block_base_url, attempt_id)
    }

    async fn deliver(&self, report: &SyncReport) -> Result<(), String> {
        let mut request = self
            .client
            .patch(self.block_url(&report.attempt_id))
            .header(ORIGIN_URI_HEADER, &report.origin.uri)
            .json(&block_patch_body(report));
        if let Some(credentials) = &report.origin.credentials {
            request = request.header(reqwest::header::AUTHORIZATION, credentials.header_value());
        }

        let response = request.send().await.map_err(|e| e.to_string())?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("status {}", response.status()))
        }
    }
}

#[async_trait]
impl ReportSink for BlockReportSink {
    async fn report(&self, report: SyncReport) {
        log_report(&report);
        if let Err(e) = self.deliver(&report).await {
            tracing::warn!(
                attempt_id = %report.attempt_id,
                url = %self.block_url(&report.attempt_id),
                "Failed to deliver block state: {}",
                e
            );
        }
    }
}

/// The block sink when an endpoint is configured, the tracing sink otherwise.
pub fn sink_from_config(config: &ReportConfig, timeout: Duration) -> AppResult<Arc<dyn ReportSink>> {
    match config.block_base_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => Ok(Arc::new(BlockReportSink::new(url, timeout)?)),
        _ => Ok(Arc::new(TracingReportSink)),
    }
}
