//! Configuration for the sync subsystem.
//!
//! Values come from (in order of precedence) explicit builder calls,
//! environment variables via [`RegistryConfig::from_env`], or a TOML file via
//! [`load_from_toml`]. Anything unset falls back to [`RegistryConfig::default`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_cron_scheduler::Job;

use crate::error::{RegistryError, RegistryResult};

/// Upstream chain registry repository.
pub const DEFAULT_REPOSITORY_URL: &str = "https://github.com/cosmos/chain-registry.git";

/// Daily at 02:00 (seconds, minutes, hours, day-of-month, month, day-of-week).
pub const DEFAULT_SYNC_SCHEDULE: &str = "0 0 2 * * *";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Root data directory; holds `current/` and the `temp/` staging area.
    pub data_dir: PathBuf,
    /// Git URL (or local path) of the upstream registry.
    pub repository_url: String,
    /// Branch to clone. `None` uses the remote's default branch.
    pub branch: Option<String>,
    /// Clone with depth 1.
    pub shallow: bool,
    /// Upper bound on a single fetch.
    pub fetch_timeout_secs: u64,
    /// Cron expression for the recurring sync (UTC).
    pub sync_schedule: String,
    /// Remove entities from `current/` that vanished upstream.
    pub prune_stale: bool,
    /// Register the recurring sync job.
    pub enable_scheduler: bool
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            repository_url: DEFAULT_REPOSITORY_URL.to_string(),
            branch: None,
            shallow: true,
            fetch_timeout_secs: 600,
            sync_schedule: DEFAULT_SYNC_SCHEDULE.to_string(),
            prune_stale: false,
            enable_scheduler: true
        }
    }
}

impl RegistryConfig {
    /// Creates a configuration from environment variables.
    pub fn from_env() -> RegistryResult<Self> {
        let defaults = Self::default();

        let fetch_timeout_secs = match std::env::var("FETCH_TIMEOUT_SECS") {
            Ok(raw) => raw.parse().map_err(|_| {
                RegistryError::Configuration(format!("FETCH_TIMEOUT_SECS is not a number: {raw}"))
            })?,
            Err(_) => defaults.fetch_timeout_secs
        };

        let config = Self {
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            repository_url: std::env::var("REPOSITORY_URL").unwrap_or(defaults.repository_url),
            branch: std::env::var("REPOSITORY_BRANCH")
                .ok()
                .filter(|b| !b.trim().is_empty()),
            shallow: env_flag("SHALLOW_CLONE").unwrap_or(defaults.shallow),
            fetch_timeout_secs,
            sync_schedule: std::env::var("SYNC_SCHEDULE").unwrap_or(defaults.sync_schedule),
            prune_stale: env_flag("PRUNE_STALE").unwrap_or(defaults.prune_stale),
            enable_scheduler: env_flag("ENABLE_SCHEDULER").unwrap_or(defaults.enable_scheduler)
        };

        config.validate()?;
        Ok(config)
    }

    /// Creates a builder for configuration.
    #[must_use]
    pub fn builder() -> RegistryConfigBuilder {
        RegistryConfigBuilder::default()
    }

    pub fn validate(&self) -> RegistryResult<()> {
        if self.repository_url.trim().is_empty() {
            return Err(RegistryError::Configuration(
                "repository_url must not be empty".to_string()
            ));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(RegistryError::Configuration(
                "fetch_timeout_secs must be greater than zero".to_string()
            ));
        }
        let fields = self.sync_schedule.split_whitespace().count();
        if !(6..=7).contains(&fields) {
            return Err(RegistryError::Configuration(format!(
                "sync_schedule must have 6 or 7 cron fields, got {fields}: '{}'",
                self.sync_schedule
            )));
        }
        Job::new_async(self.sync_schedule.as_str(), |_uuid, _lock| Box::pin(async {})).map_err(
            |e| {
                RegistryError::Configuration(format!(
                    "sync_schedule '{}' is not a valid cron expression: {e}",
                    self.sync_schedule
                ))
            }
        )?;
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
}

/// Loads a [`RegistryConfig`] from a TOML file. Missing keys take defaults.
pub fn load_from_toml(path: &Path) -> RegistryResult<RegistryConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| RegistryError::io(path, e))?;

    let config: RegistryConfig = toml::from_str(&contents).map_err(|e| {
        RegistryError::Configuration(format!("Failed to parse {}: {e}", path.display()))
    })?;

    config.validate()?;
    Ok(config)
}

/// Builder for `RegistryConfig`.
#[derive(Default)]
pub struct RegistryConfigBuilder {
    data_dir: Option<PathBuf>,
    repository_url: Option<String>,
    branch: Option<String>,
    shallow: Option<bool>,
    fetch_timeout_secs: Option<u64>,
    sync_schedule: Option<String>,
    prune_stale: Option<bool>,
    enable_scheduler: Option<bool>
}

impl RegistryConfigBuilder {
    #[must_use]
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn repository_url(mut self, url: impl Into<String>) -> Self {
        self.repository_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    #[must_use]
    pub fn shallow(mut self, shallow: bool) -> Self {
        self.shallow = Some(shallow);
        self
    }

    #[must_use]
    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.fetch_timeout_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn sync_schedule(mut self, schedule: impl Into<String>) -> Self {
        self.sync_schedule = Some(schedule.into());
        self
    }

    #[must_use]
    pub fn prune_stale(mut self, prune: bool) -> Self {
        self.prune_stale = Some(prune);
        self
    }

    #[must_use]
    pub fn enable_scheduler(mut self, enable: bool) -> Self {
        self.enable_scheduler = Some(enable);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> RegistryResult<RegistryConfig> {
        let defaults = RegistryConfig::default();
        let config = RegistryConfig {
            data_dir: self.data_dir.unwrap_or(defaults.data_dir),
            repository_url: self.repository_url.unwrap_or(defaults.repository_url),
            branch: self.branch,
            shallow: self.shallow.unwrap_or(defaults.shallow),
            fetch_timeout_secs: self
                .fetch_timeout_secs
                .unwrap_or(defaults.fetch_timeout_secs),
            sync_schedule: self.sync_schedule.unwrap_or(defaults.sync_schedule),
            prune_stale: self.prune_stale.unwrap_or(defaults.prune_stale),
            enable_scheduler: self.enable_scheduler.unwrap_or(defaults.enable_scheduler)
        };
        config.validate()?;
        Ok(config)
    }
}
