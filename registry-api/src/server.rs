//! Server setup and lifecycle for the registry API.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use registry_sync::config::load_from_toml;
use registry_sync::{RegistryConfig, SyncScheduler, SyncService};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;

use crate::error::{ApiError, Result};
use crate::routes::create_router;
use crate::state::{AppState, ServerConfig};

const METRICS_UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// The registry API server.
pub struct RegistryServer {
    state: Arc<AppState>,
    scheduler: Option<SyncScheduler>
}

impl RegistryServer {
    /// Creates the sync service and loads the first snapshot.
    ///
    /// Fails when neither durable data nor the upstream fetch produce a
    /// snapshot.
    pub async fn new(config: ServerConfig, registry: RegistryConfig) -> Result<Self> {
        registry.validate()?;

        let service = Arc::new(SyncService::from_config(registry));
        service.initialize().await?;

        let mut state = AppState::new(service, config);
        if let Some(handle) = install_metrics_recorder() {
            state = state.with_metrics(handle);
        }

        Ok(Self::with_state(Arc::new(state)))
    }

    /// Creates a server instance from an existing `AppState`.
    pub fn with_state(state: Arc<AppState>) -> Self {
        Self {
            state,
            scheduler: None
        }
    }

    /// Starts the cron-driven sync scheduler.
    pub async fn start_scheduler(&mut self) -> Result<()> {
        if !self.state.service.config().enable_scheduler {
            tracing::info!("Sync scheduler disabled by configuration");
            return Ok(());
        }

        let scheduler = SyncScheduler::new(self.state.service.clone()).await?;
        scheduler.start().await?;
        self.scheduler = Some(scheduler);
        Ok(())
    }

    /// Runs the HTTP server.
    ///
    /// This method blocks until the server is shut down (e.g., via Ctrl+C).
    pub async fn run(mut self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.state.config.host, self.state.config.port)
            .parse()
            .map_err(|e| ApiError::Configuration(format!("Invalid address: {e}")))?;

        self.start_scheduler().await?;

        let router = create_router(self.state.clone());

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ApiError::Server(format!("Failed to bind to {addr}: {e}")))?;

        tracing::info!(
            %addr,
            chains = self.state.service.loaded_count(),
            "Chain registry API server starting"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ApiError::Server(format!("Server error: {e}")))?;

        if let Some(mut scheduler) = self.scheduler.take() {
            if let Err(e) = scheduler.stop().await {
                tracing::warn!(error = %e, "Failed to stop sync scheduler");
            }
        }

        tracing::info!("Chain registry API server stopped");
        Ok(())
    }

    #[must_use]
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }
}

fn install_metrics_recorder() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let upkeep = handle.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(METRICS_UPKEEP_INTERVAL);
                loop {
                    interval.tick().await;
                    upkeep.run_upkeep();
                }
            });
            Some(handle)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Prometheus recorder not installed; /metrics disabled");
            None
        }
    }
}

/// Signal handler for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        () = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}

/// Entry point for running the server from configuration.
pub async fn run_server(config: ServerConfig, registry: RegistryConfig) -> Result<()> {
    let server = RegistryServer::new(config, registry).await?;
    server.run().await
}

/// Entry point for running the server from environment variables.
///
/// `REGISTRY_CONFIG` points at a TOML file for the sync settings; without it
/// they are read from the environment.
pub async fn run_from_env() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    let config = ServerConfig::from_env()?;
    let registry = match &config.config_file {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading registry configuration file");
            load_from_toml(path)?
        }
        None => RegistryConfig::from_env()?
    };

    run_server(config, registry).await
}
