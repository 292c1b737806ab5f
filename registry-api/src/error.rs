//! Error types for the registry API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response}
};
use registry_sync::RegistryError;
use thiserror::Error;

use crate::handlers::ApiResponse;

/// Result type alias for the API.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors returned by HTTP handlers and server startup.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The requested chain is not in the current snapshot.
    #[error("Chain not found")]
    ChainNotFound(String),

    /// No route matched the request.
    #[error("Endpoint not found")]
    NotFound,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Server startup error.
    #[error("Server error: {0}")]
    Server(String),

    /// Error from the sync subsystem.
    #[error(transparent)]
    Registry(#[from] RegistryError)
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ChainNotFound(_) | Self::NotFound => StatusCode::NOT_FOUND,
            Self::Registry(RegistryError::SyncInProgress) => StatusCode::CONFLICT,
            Self::Configuration(_) | Self::Server(_) | Self::Registry(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::ChainNotFound(name) => {
                tracing::debug!(chain = %name, "Chain not found");
                self.to_string()
            }
            Self::NotFound | Self::Registry(RegistryError::SyncInProgress) => self.to_string(),
            Self::Configuration(msg) | Self::Server(msg) => {
                tracing::error!(message = %msg, "Server error");
                "Internal server error".to_string()
            }
            Self::Registry(e) => {
                tracing::error!(error = %e, "Registry error");
                "Internal server error".to_string()
            }
        };

        (status, Json(ApiResponse::<()>::failure(message))).into_response()
    }
}
