//! HTTP request handlers for the registry API.

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response}
};
use chrono::{SecondsFormat, Utc};
use registry_sync::documents::{ApiEndpoint, AssetList, ChainInfo, Document, Peer, VersionInfo};
use registry_sync::{ChainSummary, EndpointKind, SyncPhase, SyncStatus, SyncTrigger};
use serde::Serialize;
use std::sync::Arc;

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Envelope wrapping every JSON response except `/health` and `/metrics`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: now_rfc3339()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            timestamp: now_rfc3339()
        }
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

type Envelope<T> = Result<Json<ApiResponse<T>>>;

fn found<T>(name: String, value: Option<T>) -> Envelope<T> {
    value
        .map(|v| Json(ApiResponse::ok(v)))
        .ok_or(ApiError::ChainNotFound(name))
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub endpoints: Vec<&'static str>
}

/// GET /
pub async fn root() -> Json<ApiResponse<ServiceInfo>> {
    Json(ApiResponse::ok(ServiceInfo {
        name: "chain-registry-api",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: vec![
            "GET /health",
            "GET /metrics",
            "GET /v1/chains",
            "GET /v1/chain/{chain_name}",
            "GET /v1/chain/{chain_name}/lite",
            "GET /v1/chain/{chain_name}/assets",
            "GET /v1/chain/{chain_name}/versions",
            "GET /v1/chain/{chain_name}/endpoints/rpc",
            "GET /v1/chain/{chain_name}/endpoints/rest",
            "GET /v1/chain/{chain_name}/endpoints/grpc",
            "GET /v1/chain/{chain_name}/peers",
            "GET /v1/chain/{chain_name}/seeds",
            "POST /v1/sync",
            "GET /v1/sync/status",
        ]
    }))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub chains_loaded: usize,
    pub uptime_secs: u64,
    pub ready: bool
}

/// Health check endpoint.
///
/// Returns 503 until the first snapshot has been published.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let ready = state.service.is_ready();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if ready { "healthy" } else { "initializing" },
            timestamp: now_rfc3339(),
            chains_loaded: state.service.loaded_count(),
            uptime_secs: state.uptime_secs(),
            ready
        })
    )
}

/// Prometheus text exposition of the sync metrics.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render()
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response()
    }
}

/// GET /v1/chains
pub async fn list_chains(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Vec<String>>> {
    Json(ApiResponse::ok(state.service.list_chain_names()))
}

/// GET /v1/chain/{chain_name}
pub async fn get_chain(
    State(state): State<Arc<AppState>>,
    Path(chain_name): Path<String>
) -> Envelope<Document<ChainInfo>> {
    let info = state
        .service
        .chain(&chain_name)
        .map(|record| record.chain_info.clone());
    found(chain_name, info)
}

/// GET /v1/chain/{chain_name}/lite
pub async fn get_chain_lite(
    State(state): State<Arc<AppState>>,
    Path(chain_name): Path<String>
) -> Envelope<ChainSummary> {
    let summary = state.service.chain_summary(&chain_name);
    found(chain_name, summary)
}

/// GET /v1/chain/{chain_name}/assets
pub async fn get_chain_assets(
    State(state): State<Arc<AppState>>,
    Path(chain_name): Path<String>
) -> Envelope<Document<AssetList>> {
    let assets = state.service.asset_list(&chain_name);
    found(chain_name, assets)
}

/// GET /v1/chain/{chain_name}/versions
///
/// `data` is `null` for a known chain without `versions.json`.
pub async fn get_chain_versions(
    State(state): State<Arc<AppState>>,
    Path(chain_name): Path<String>
) -> Envelope<Option<Document<VersionInfo>>> {
    let versions = state
        .service
        .chain(&chain_name)
        .map(|record| record.version_info.clone());
    found(chain_name, versions)
}

fn endpoints(state: &AppState, chain_name: String, kind: EndpointKind) -> Envelope<Vec<ApiEndpoint>> {
    let list = state.service.endpoints(&chain_name, kind);
    found(chain_name, list)
}

/// GET /v1/chain/{chain_name}/endpoints/rpc
pub async fn get_rpc_endpoints(
    State(state): State<Arc<AppState>>,
    Path(chain_name): Path<String>
) -> Envelope<Vec<ApiEndpoint>> {
    endpoints(&state, chain_name, EndpointKind::Rpc)
}

/// GET /v1/chain/{chain_name}/endpoints/rest
pub async fn get_rest_endpoints(
    State(state): State<Arc<AppState>>,
    Path(chain_name): Path<String>
) -> Envelope<Vec<ApiEndpoint>> {
    endpoints(&state, chain_name, EndpointKind::Rest)
}

/// GET /v1/chain/{chain_name}/endpoints/grpc
pub async fn get_grpc_endpoints(
    State(state): State<Arc<AppState>>,
    Path(chain_name): Path<String>
) -> Envelope<Vec<ApiEndpoint>> {
    endpoints(&state, chain_name, EndpointKind::Grpc)
}

/// GET /v1/chain/{chain_name}/peers
pub async fn get_peers(
    State(state): State<Arc<AppState>>,
    Path(chain_name): Path<String>
) -> Envelope<Vec<Peer>> {
    let peers = state.service.peers(&chain_name);
    found(chain_name, peers)
}

/// GET /v1/chain/{chain_name}/seeds
pub async fn get_seeds(
    State(state): State<Arc<AppState>>,
    Path(chain_name): Path<String>
) -> Envelope<Vec<Peer>> {
    let seeds = state.service.seeds(&chain_name);
    found(chain_name, seeds)
}

#[derive(Debug, Serialize)]
pub struct SyncAccepted {
    pub message: &'static str,
    pub state: SyncTrigger
}

/// POST /v1/sync
///
/// Always accepted; a request arriving during a run joins that run.
pub async fn trigger_sync(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let trigger = state.service.trigger_sync();
    let message = match trigger {
        SyncTrigger::Started => "Sync started",
        SyncTrigger::AlreadyRunning => "Sync already in progress"
    };
    tracing::info!(state = ?trigger, "Manual sync requested");

    (
        StatusCode::ACCEPTED,
        Json(ApiResponse::ok(SyncAccepted {
            message,
            state: trigger
        }))
    )
}

#[derive(Debug, Serialize)]
pub struct SyncStatusResponse {
    pub ready: bool,
    pub chains_loaded: usize,
    pub running: bool,
    #[serde(flatten)]
    pub status: SyncStatus
}

/// GET /v1/sync/status
pub async fn sync_status(State(state): State<Arc<AppState>>) -> Json<ApiResponse<SyncStatusResponse>> {
    let status = state.service.status();
    Json(ApiResponse::ok(SyncStatusResponse {
        ready: state.service.is_ready(),
        chains_loaded: state.service.loaded_count(),
        running: matches!(
            status.phase,
            SyncPhase::Fetching | SyncPhase::Filtering | SyncPhase::Loading
        ),
        status
    }))
}

/// Fallback for unmatched routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
