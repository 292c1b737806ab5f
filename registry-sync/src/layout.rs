//! On-disk layout of the durable store and the fetch staging area.
//!
//! ```text
//! <data_dir>/
//! ├── current/            durable store, one directory per chain
//! │   └── cosmoshub/
//! │       ├── chain.json
//! │       ├── assetlist.json
//! │       └── versions.json   (optional)
//! └── temp/
//!     └── <run-id>/       staging clone of the upstream repository, one per run
//! ```

use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{RegistryError, RegistryResult};

pub const CHAIN_FILE: &str = "chain.json";
pub const ASSET_LIST_FILE: &str = "assetlist.json";
pub const VERSIONS_FILE: &str = "versions.json";

/// Files a directory must contain to count as a chain.
pub const REQUIRED_FILES: [&str; 2] = [CHAIN_FILE, ASSET_LIST_FILE];

/// Top-level upstream folders holding registry infrastructure, not chains.
pub const DENYLIST: [&str; 6] = [
    ".github",
    "_IBC",
    "_memo_keys",
    "_non-cosmos",
    "_scripts",
    "_template"
];

const CURRENT_DIR: &str = "current";
const STAGING_DIR: &str = "temp";

pub fn is_denylisted(name: &str) -> bool {
    DENYLIST.contains(&name)
}

/// Required files absent from `dir`, in [`REQUIRED_FILES`] order.
pub fn missing_required_files(dir: &Path) -> Vec<&'static str> {
    REQUIRED_FILES
        .iter()
        .copied()
        .filter(|file| !dir.join(file).is_file())
        .collect()
}

#[derive(Debug, Clone)]
pub struct DataLayout {
    data_dir: PathBuf
}

impl DataLayout {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into()
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn current_dir(&self) -> PathBuf {
        self.data_dir.join(CURRENT_DIR)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.data_dir.join(STAGING_DIR)
    }

    /// Clone target for one sync run.
    pub fn run_staging_dir(&self, run_id: Uuid) -> PathBuf {
        self.staging_dir().join(run_id.to_string())
    }

    /// Creates `data/` and `data/current/` if missing.
    pub fn ensure_directories(&self) -> RegistryResult<()> {
        let current = self.current_dir();
        std::fs::create_dir_all(&current).map_err(|e| RegistryError::io(&current, e))
    }

    /// Whether the durable store holds at least one entry.
    pub fn has_existing_data(&self) -> RegistryResult<bool> {
        let current = self.current_dir();
        match std::fs::read_dir(&current) {
            Ok(mut entries) => Ok(entries.next().is_some()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(RegistryError::io(&current, e))
        }
    }

    /// Removes run directories left behind by earlier runs.
    ///
    /// A clone abandoned after a timeout may still hold its directory open,
    /// so entries that cannot be removed are logged and left in place.
    pub fn reset_staging(&self) -> RegistryResult<()> {
        let staging = self.staging_dir();
        let entries = match std::fs::read_dir(&staging) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(RegistryError::io(&staging, e))
        };

        for entry in entries {
            let path = entry.map_err(|e| RegistryError::io(&staging, e))?.path();
            tracing::debug!(path = %path.display(), "Removing stale staging entry");
            let removed = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            if let Err(e) = removed {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove stale staging entry");
            }
        }
        Ok(())
    }

    /// Best-effort staging cleanup after a run; failures are only logged.
    pub fn discard_staging(&self) {
        let staging = self.staging_dir();
        if staging.exists() {
            if let Err(e) = std::fs::remove_dir_all(&staging) {
                tracing::warn!(
                    path = %staging.display(),
                    error = %e,
                    "Failed to remove staging directory"
                );
            }
        }
    }
}
