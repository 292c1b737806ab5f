//! Error types for the registry sync subsystem.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Pipeline stage a sync run was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStage {
    Fetching,
    Filtering,
    Loading
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fetching => "fetching",
            Self::Filtering => "filtering",
            Self::Loading => "loading"
        };
        f.write_str(name)
    }
}

/// Errors raised by the fetch/filter/load pipeline.
///
/// Per-chain problems (missing files, malformed documents) are not errors:
/// they are recorded as [`crate::report::SkippedChain`] entries in the stage
/// reports and never abort a run.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Fetch from {url} failed: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("Fetch timed out after {timeout_secs}s")]
    FetchTimeout { timeout_secs: u64 },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error
    },

    #[error("Sync failed while {stage}: {source}")]
    SyncFailed {
        stage: SyncStage,
        #[source]
        source: Box<RegistryError>
    },

    #[error("A sync run is already in progress")]
    SyncInProgress,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Background task failed: {0}")]
    Task(String)
}

impl RegistryError {
    pub(crate) fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source
        }
    }

    pub(crate) fn at_stage(self, stage: SyncStage) -> Self {
        match self {
            already @ Self::SyncFailed { .. } => already,
            other => Self::SyncFailed {
                stage,
                source: Box::new(other)
            }
        }
    }

    /// Stage of a failed run, if this error came out of the pipeline.
    pub fn stage(&self) -> Option<SyncStage> {
        match self {
            Self::SyncFailed { stage, .. } => Some(*stage),
            _ => None
        }
    }

    /// Whether the error originated in the fetch stage.
    pub fn is_fetch_failure(&self) -> bool {
        match self {
            Self::FetchFailed { .. } | Self::FetchTimeout { .. } => true,
            Self::SyncFailed { source, .. } => source.is_fetch_failure(),
            _ => false
        }
    }
}
