//! # Chain Registry API
//!
//! HTTP front end for [`registry_sync`]: serves chain registry documents from
//! the in-memory snapshot and exposes the sync lifecycle.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │ chain-registry  │────►│   SyncService   │────►│  Registry API   │
//! │   (upstream)    │ git │ (registry-sync) │ Arc │  (This crate)   │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//!                                 ▲                        │
//!                                 │ POST /v1/sync          │ HTTP
//!                                 └────────────────────────┘
//! ```
//!
//! ## Endpoints
//!
//! - `GET /health` - Readiness and loaded chain count
//! - `GET /metrics` - Prometheus metrics endpoint
//! - `GET /v1/chains` - Names of all loaded chains
//! - `GET /v1/chain/{chain_name}` - Full `chain.json` document
//! - `GET /v1/chain/{chain_name}/lite` - Chain summary
//! - `GET /v1/chain/{chain_name}/assets` - Asset list
//! - `GET /v1/chain/{chain_name}/versions` - Version history
//! - `GET /v1/chain/{chain_name}/endpoints/{rpc,rest,grpc}` - Public endpoints
//! - `GET /v1/chain/{chain_name}/peers` and `/seeds` - Peer lists
//! - `POST /v1/sync` - Start a sync run in the background
//! - `GET /v1/sync/status` - Phase and last outcome of the sync service

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use server::RegistryServer;
pub use state::{AppState, ServerConfig};
