//! Route definitions for the registry API.

use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post}
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer
};

use crate::handlers;
use crate::state::{AppState, ServerConfig};

/// Creates the Axum router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);

    // API v1 routes
    let api_v1 = Router::new()
        .route("/chains", get(handlers::list_chains))
        .route("/chain/{chain_name}", get(handlers::get_chain))
        .route("/chain/{chain_name}/lite", get(handlers::get_chain_lite))
        .route("/chain/{chain_name}/assets", get(handlers::get_chain_assets))
        .route("/chain/{chain_name}/versions", get(handlers::get_chain_versions))
        .route("/chain/{chain_name}/endpoints/rpc", get(handlers::get_rpc_endpoints))
        .route("/chain/{chain_name}/endpoints/rest", get(handlers::get_rest_endpoints))
        .route("/chain/{chain_name}/endpoints/grpc", get(handlers::get_grpc_endpoints))
        .route("/chain/{chain_name}/peers", get(handlers::get_peers))
        .route("/chain/{chain_name}/seeds", get(handlers::get_seeds))
        .route("/sync", post(handlers::trigger_sync))
        .route("/sync/status", get(handlers::sync_status));

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .nest("/v1", api_v1)
        .fallback(handlers::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.allows_any_origin() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
