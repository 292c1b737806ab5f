//! Builds a [`Snapshot`] from the durable `current/` directory.
//!
//! Each chain directory is loaded independently: a missing required file or a
//! document that is not valid JSON excludes that chain and is recorded in the
//! [`LoadReport`], but never fails the load as a whole.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::documents::Document;
use crate::error::{RegistryError, RegistryResult};
use crate::layout::{
    ASSET_LIST_FILE, CHAIN_FILE, VERSIONS_FILE, is_denylisted, missing_required_files
};
use crate::record::ChainRecord;
use crate::report::{LoadReport, SkipReason};
use crate::snapshot::Snapshot;

/// Loads every chain under `current_dir`.
///
/// An absent directory yields an empty snapshot. Hidden entries (leading `.`)
/// are in-flight filter staging siblings and are ignored, as are denylisted
/// folders.
pub fn load_snapshot(current_dir: &Path) -> RegistryResult<(Snapshot, LoadReport)> {
    let mut report = LoadReport::default();
    let mut chains = BTreeMap::new();

    let entries = match std::fs::read_dir(current_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %current_dir.display(), "Current data directory does not exist");
            return Ok((Snapshot::empty(), report));
        }
        Err(e) => return Err(RegistryError::io(current_dir, e))
    };

    for entry in entries {
        let entry = entry.map_err(|e| RegistryError::io(current_dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || is_denylisted(&name) {
            continue;
        }

        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        match load_chain(&path) {
            Ok(record) => {
                chains.insert(name, Arc::new(record));
            }
            Err(reason) => {
                tracing::warn!(chain = %name, reason = %reason, "Skipping chain during load");
                report.skip(name, reason);
            }
        }
    }

    report.loaded = chains.len();
    tracing::info!(
        loaded = report.loaded,
        skipped = report.skipped.len(),
        "Loaded chain data into snapshot"
    );

    Ok((Snapshot::new(chains), report))
}

/// Loads one chain directory into a record.
pub fn load_chain(dir: &Path) -> Result<ChainRecord, SkipReason> {
    let missing = missing_required_files(dir);
    if !missing.is_empty() {
        return Err(SkipReason::MissingFiles {
            files: missing.into_iter().map(str::to_string).collect()
        });
    }

    let chain_path = dir.join(CHAIN_FILE);
    let chain_info = read_document(&chain_path, CHAIN_FILE)?;
    let asset_list = read_document(&dir.join(ASSET_LIST_FILE), ASSET_LIST_FILE)?;

    let versions_path = dir.join(VERSIONS_FILE);
    let version_info = if versions_path.is_file() {
        Some(read_document(&versions_path, VERSIONS_FILE)?)
    } else {
        None
    };

    let last_modified = std::fs::metadata(&chain_path)
        .and_then(|meta| meta.modified())
        .map(DateTime::<Utc>::from)
        .map_err(|e| SkipReason::Unreadable {
            reason: format!("{CHAIN_FILE}: {e}")
        })?;

    Ok(ChainRecord {
        chain_info,
        asset_list,
        version_info,
        last_modified
    })
}

/// Reads a document; only invalid JSON syntax makes it malformed.
fn read_document<T>(path: &Path, file: &str) -> Result<Document<T>, SkipReason>
where
    T: DeserializeOwned + Default
{
    let contents = std::fs::read_to_string(path).map_err(|e| SkipReason::Unreadable {
        reason: format!("{file}: {e}")
    })?;

    Document::parse(&contents).map_err(|e| SkipReason::Malformed {
        file: file.to_string(),
        reason: e.to_string()
    })
}
