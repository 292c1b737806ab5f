//! Copies qualifying chain directories from a staged upstream tree into the
//! durable `current/` directory.
//!
//! A chain is replaced without ever leaving a half-copied directory under its
//! real name: the new copy is built in a hidden `.incoming-<name>` sibling,
//! the old directory is moved aside to `.retired-<name>`, the new one is
//! renamed into place and the retired copy is deleted. Hidden siblings left by
//! a crash are settled by [`recover_staging_siblings`] before the next pass.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{RegistryError, RegistryResult};
use crate::layout::{is_denylisted, missing_required_files};
use crate::report::{FilterReport, SkipReason};

const INCOMING_PREFIX: &str = ".incoming-";
const RETIRED_PREFIX: &str = ".retired-";

#[derive(Debug, Clone, Copy, Default)]
pub struct FilterOptions {
    /// Remove chains from `current/` that were not qualifying upstream.
    pub prune_stale: bool
}

/// Stages every qualifying chain from `staging_root` into `current_dir`.
///
/// Directory-level I/O failures abort the pass. Chains lacking a required
/// file are skipped and reported.
pub fn stage_valid_chains(
    staging_root: &Path,
    current_dir: &Path,
    options: FilterOptions
) -> RegistryResult<FilterReport> {
    fs::create_dir_all(current_dir).map_err(|e| RegistryError::io(current_dir, e))?;
    recover_staging_siblings(current_dir)?;

    let mut report = FilterReport::default();
    let mut qualifying = HashSet::new();

    for (name, source) in sorted_children(staging_root)? {
        if is_denylisted(&name) {
            tracing::debug!(folder = %name, "Ignoring denylisted folder");
            report.denied.push(name);
            continue;
        }
        if name.starts_with('.') || !source.is_dir() {
            continue;
        }

        let missing = missing_required_files(&source);
        if !missing.is_empty() {
            tracing::warn!(chain = %name, missing = ?missing, "Skipping chain: missing required files");
            report.skip(
                name,
                SkipReason::MissingFiles {
                    files: missing.into_iter().map(str::to_string).collect()
                }
            );
            continue;
        }

        replace_chain(&source, current_dir, &name)?;
        tracing::debug!(chain = %name, "Copied chain data");
        qualifying.insert(name.clone());
        report.copied.push(name);
    }

    if options.prune_stale {
        report.pruned = prune_absent(current_dir, &qualifying)?;
    }

    tracing::info!(
        copied = report.copied.len(),
        skipped = report.skipped.len(),
        denied = report.denied.len(),
        pruned = report.pruned.len(),
        "Filtered staged chain data"
    );

    Ok(report)
}

fn sorted_children(dir: &Path) -> RegistryResult<Vec<(String, PathBuf)>> {
    let mut children = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| RegistryError::io(dir, e))? {
        let entry = entry.map_err(|e| RegistryError::io(dir, e))?;
        children.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
    }
    children.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(children)
}

fn replace_chain(source: &Path, current_dir: &Path, name: &str) -> RegistryResult<()> {
    let target = current_dir.join(name);
    let incoming = current_dir.join(format!("{INCOMING_PREFIX}{name}"));
    let retired = current_dir.join(format!("{RETIRED_PREFIX}{name}"));

    copy_dir_recursive(source, &incoming)?;

    if target.exists() {
        fs::rename(&target, &retired).map_err(|e| RegistryError::io(&target, e))?;
    }
    fs::rename(&incoming, &target).map_err(|e| RegistryError::io(&incoming, e))?;

    if retired.exists() {
        if let Err(e) = fs::remove_dir_all(&retired) {
            tracing::warn!(path = %retired.display(), error = %e, "Failed to remove retired chain copy");
        }
    }
    Ok(())
}

/// Deep-copies `source` to `dest`. Symlinks are not followed or copied.
pub fn copy_dir_recursive(source: &Path, dest: &Path) -> RegistryResult<()> {
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().map_or_else(|| source.to_path_buf(), Path::to_path_buf);
            RegistryError::io(path, e.into())
        })?;

        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = dest.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(|e| RegistryError::io(&target, e))?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target).map_err(|e| RegistryError::io(entry.path(), e))?;
        } else {
            tracing::debug!(path = %entry.path().display(), "Not copying symlink");
        }
    }
    Ok(())
}

/// Settles `.incoming-` and `.retired-` siblings left by an interrupted pass.
///
/// A retired copy whose chain directory is missing is the only copy left and
/// is renamed back into place. Every other leftover is removed.
pub fn recover_staging_siblings(current_dir: &Path) -> RegistryResult<()> {
    for (name, path) in sorted_children(current_dir)? {
        if let Some(chain) = name.strip_prefix(RETIRED_PREFIX) {
            let target = current_dir.join(chain);
            if !target.exists() {
                tracing::warn!(chain = %chain, "Restoring chain from interrupted replace");
                fs::rename(&path, &target).map_err(|e| RegistryError::io(&path, e))?;
                continue;
            }
        } else if !name.starts_with(INCOMING_PREFIX) {
            continue;
        }

        tracing::warn!(path = %path.display(), "Removing leftover chain staging directory");
        fs::remove_dir_all(&path).map_err(|e| RegistryError::io(&path, e))?;
    }
    Ok(())
}

fn prune_absent(current_dir: &Path, keep: &HashSet<String>) -> RegistryResult<Vec<String>> {
    let mut pruned = Vec::new();
    for (name, path) in sorted_children(current_dir)? {
        if name.starts_with('.') || !path.is_dir() || keep.contains(&name) {
            continue;
        }
        fs::remove_dir_all(&path).map_err(|e| RegistryError::io(&path, e))?;
        tracing::info!(chain = %name, "Pruned chain no longer present upstream");
        pruned.push(name);
    }
    Ok(pruned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{ASSET_LIST_FILE, CHAIN_FILE, DENYLIST};

    fn write_chain(root: &Path, name: &str, with_assets: bool) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(CHAIN_FILE), format!(r#"{{"chain_name": "{name}"}}"#)).unwrap();
        if with_assets {
            fs::write(dir.join(ASSET_LIST_FILE), r#"{"assets": []}"#).unwrap();
        }
    }

    fn dir_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_copies_only_qualifying_chains() {
        let staging = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let current = data.path().join("current");

        write_chain(staging.path(), "cosmoshub", true);
        write_chain(staging.path(), "brokenchain", false);
        fs::write(staging.path().join("README.md"), "docs").unwrap();
        fs::create_dir_all(staging.path().join(".git/objects")).unwrap();

        let report = stage_valid_chains(staging.path(), &current, FilterOptions::default()).unwrap();

        assert_eq!(report.copied, vec!["cosmoshub"]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].name, "brokenchain");
        assert_eq!(dir_names(&current), vec!["cosmoshub"]);
    }

    #[test]
    fn test_denylisted_folders_never_copied() {
        let staging = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let current = data.path().join("current");
        for name in DENYLIST {
            write_chain(staging.path(), name, true);
        }

        let report = stage_valid_chains(staging.path(), &current, FilterOptions::default()).unwrap();

        assert!(report.copied.is_empty());
        assert_eq!(report.denied.len(), DENYLIST.len());
        assert!(dir_names(&current).is_empty());
    }

    #[test]
    fn test_replaces_existing_chain_wholesale() {
        let staging = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let current = data.path().join("current");

        write_chain(&current, "osmosis", true);
        fs::write(current.join("osmosis").join("versions.json"), "{}").unwrap();
        write_chain(staging.path(), "osmosis", true);
        fs::create_dir_all(staging.path().join("osmosis/images")).unwrap();
        fs::write(staging.path().join("osmosis/images/osmo.svg"), "<svg/>").unwrap();

        stage_valid_chains(staging.path(), &current, FilterOptions::default()).unwrap();

        let osmosis = current.join("osmosis");
        assert!(!osmosis.join("versions.json").exists());
        assert!(osmosis.join("images/osmo.svg").is_file());
        assert_eq!(dir_names(&current), vec!["osmosis"]);
    }

    #[test]
    fn test_keeps_stale_chains_by_default() {
        let staging = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let current = data.path().join("current");
        write_chain(&current, "retiredchain", true);
        write_chain(staging.path(), "cosmoshub", true);

        let report = stage_valid_chains(staging.path(), &current, FilterOptions::default()).unwrap();

        assert!(report.pruned.is_empty());
        assert_eq!(dir_names(&current), vec!["cosmoshub", "retiredchain"]);
    }

    #[test]
    fn test_prunes_stale_chains_when_enabled() {
        let staging = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let current = data.path().join("current");
        write_chain(&current, "retiredchain", true);
        write_chain(&current, "nowbroken", true);
        write_chain(staging.path(), "cosmoshub", true);
        write_chain(staging.path(), "nowbroken", false);

        let report =
            stage_valid_chains(staging.path(), &current, FilterOptions { prune_stale: true }).unwrap();

        assert_eq!(report.pruned, vec!["nowbroken", "retiredchain"]);
        assert_eq!(dir_names(&current), vec!["cosmoshub"]);
    }

    #[test]
    fn test_clears_leftover_staging_siblings() {
        let staging = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let current = data.path().join("current");
        fs::create_dir_all(current.join(".incoming-juno")).unwrap();
        fs::create_dir_all(current.join(".retired-juno")).unwrap();
        write_chain(staging.path(), "juno", true);

        stage_valid_chains(staging.path(), &current, FilterOptions::default()).unwrap();

        assert_eq!(dir_names(&current), vec!["juno"]);
    }

    #[test]
    fn test_restores_retired_copy_when_chain_missing() {
        let data = tempfile::tempdir().unwrap();
        let current = data.path().join("current");
        write_chain(&current, ".retired-osmosis", true);
        write_chain(&current, ".incoming-osmosis", false);
        write_chain(&current, "juno", true);
        write_chain(&current, ".retired-juno", false);

        recover_staging_siblings(&current).unwrap();

        assert_eq!(dir_names(&current), vec!["juno", "osmosis"]);
        assert!(current.join("osmosis").join(ASSET_LIST_FILE).is_file());
        assert!(current.join("juno").join(ASSET_LIST_FILE).is_file());
    }

    #[test]
    fn test_missing_staging_root_is_an_error() {
        let data = tempfile::tempdir().unwrap();
        let result = stage_valid_chains(
            &data.path().join("temp"),
            &data.path().join("current"),
            FilterOptions::default()
        );
        assert!(matches!(result, Err(RegistryError::Io { .. })));
    }
}
