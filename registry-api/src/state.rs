//! Application state for the registry API.

use metrics_exporter_prometheus::PrometheusHandle;
use registry_sync::SyncService;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{ApiError, Result};

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind the server to.
    pub host: String,
    /// Port to bind the server to.
    pub port: u16,
    /// CORS origins; empty or `*` allows any origin.
    pub allowed_origins: Vec<String>,
    /// Optional TOML file with the registry sync configuration.
    pub config_file: Option<PathBuf>
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            allowed_origins: Vec::new(),
            config_file: None
        }
    }
}

impl ServerConfig {
    /// Creates a new configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(p) => p
                .parse()
                .map_err(|_| ApiError::Configuration(format!("PORT is not a valid port: {p}")))?,
            Err(_) => 3000
        };

        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .map(|v| parse_origins(&v))
                .unwrap_or_default(),
            config_file: std::env::var("REGISTRY_CONFIG").ok().map(PathBuf::from)
        })
    }

    /// Creates a builder for configuration.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

/// Builder for `ServerConfig`.
#[derive(Default)]
pub struct ServerConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    allowed_origins: Vec<String>,
    config_file: Option<PathBuf>
}

impl ServerConfigBuilder {
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Adds an allowed CORS origin.
    #[must_use]
    pub fn allowed_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_origins.push(origin.into());
        self
    }

    #[must_use]
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn build(self) -> ServerConfig {
        ServerConfig {
            host: self.host.unwrap_or_else(|| "0.0.0.0".to_string()),
            port: self.port.unwrap_or(3000),
            allowed_origins: self.allowed_origins,
            config_file: self.config_file
        }
    }
}

/// Shared application state for Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Sync orchestrator and query façade.
    pub service: Arc<SyncService>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Prometheus exporter handle, when the recorder is installed.
    pub metrics: Option<PrometheusHandle>,
    pub started_at: Instant
}

impl AppState {
    #[must_use]
    pub fn new(service: Arc<SyncService>, config: ServerConfig) -> Self {
        Self {
            service,
            config: Arc::new(config),
            metrics: None,
            started_at: Instant::now()
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
