//! Sync orchestration: fetch → filter → load → publish.
//!
//! [`SyncService`] owns the durable layout, the snapshot cache and the
//! single-flight guard. At most one run touches the staging and durable
//! directories at a time; a failed run leaves the published snapshot as it
//! was. Read accessors never wait on a run.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::cache::SnapshotCache;
use crate::config::RegistryConfig;
use crate::documents::{ApiEndpoint, AssetList, Document, Peer};
use crate::error::{RegistryError, RegistryResult, SyncStage};
use crate::fetcher::{GitFetcher, SourceFetcher};
use crate::filter::{self, FilterOptions};
use crate::layout::DataLayout;
use crate::loader;
use crate::record::{ChainRecord, ChainSummary, EndpointKind};
use crate::report::{LoadReport, SyncReport};
use crate::snapshot::Snapshot;
use crate::telemetry::{SyncTelemetry, SyncTimer};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    #[default]
    Idle,
    Fetching,
    Filtering,
    Loading,
    /// The last run failed; cleared when the next run starts.
    Failed
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum SyncOutcome {
    Succeeded {
        report: SyncReport
    },
    Failed {
        run_id: Uuid,
        stage: SyncStage,
        error: String,
        failed_at: DateTime<Utc>
    }
}

/// Observable state of the orchestrator, for health and status endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub phase: SyncPhase,
    pub last_outcome: Option<SyncOutcome>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32
}

/// Result of a fire-and-forget trigger. Both variants mean "accepted".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    Started,
    /// Coalesced into the run already in flight.
    AlreadyRunning
}

pub struct SyncService {
    config: RegistryConfig,
    layout: DataLayout,
    fetcher: Arc<dyn SourceFetcher>,
    cache: Arc<SnapshotCache>,
    sync_lock: Arc<Mutex<()>>,
    status: RwLock<SyncStatus>
}

impl SyncService {
    pub fn new(config: RegistryConfig, fetcher: Arc<dyn SourceFetcher>) -> Self {
        let layout = DataLayout::new(config.data_dir.clone());
        Self {
            config,
            layout,
            fetcher,
            cache: Arc::new(SnapshotCache::new()),
            sync_lock: Arc::new(Mutex::new(())),
            status: RwLock::new(SyncStatus::default())
        }
    }

    /// Creates a service that clones the configured git repository.
    pub fn from_config(config: RegistryConfig) -> Self {
        let fetcher = Arc::new(GitFetcher::from_config(&config));
        Self::new(config, fetcher)
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    /// Prepares the data directories and publishes the first snapshot.
    ///
    /// Existing durable data is trusted and loaded without fetching; an
    /// empty store triggers a full sync first.
    #[tracing::instrument(skip(self), fields(data_dir = %self.layout.data_dir().display()))]
    pub async fn initialize(&self) -> RegistryResult<()> {
        let layout = self.layout.clone();
        let has_data = blocking(move || {
            layout.ensure_directories()?;
            filter::recover_staging_siblings(&layout.current_dir())?;
            layout.has_existing_data()
        })
        .await?;

        if has_data {
            tracing::info!("Loading existing chain data");
            self.reload().await?;
        } else {
            tracing::info!("No existing data found, performing initial sync");
            self.sync_data().await?;
        }

        tracing::info!(chains = self.loaded_count(), "Registry sync service initialized");
        Ok(())
    }

    /// Rebuilds and publishes the snapshot from the durable store only.
    pub async fn reload(&self) -> RegistryResult<LoadReport> {
        let _guard = self.sync_lock.lock().await;
        self.set_phase(SyncPhase::Loading);
        let result = self.load_and_publish().await;
        self.set_phase(if result.is_ok() {
            SyncPhase::Idle
        } else {
            SyncPhase::Failed
        });
        result.map_err(|e| e.at_stage(SyncStage::Loading))
    }

    /// Runs a full fetch → filter → load pass.
    ///
    /// Returns [`RegistryError::SyncInProgress`] without side effects when
    /// another run holds the guard.
    #[tracing::instrument(skip(self))]
    pub async fn sync_data(&self) -> RegistryResult<SyncReport> {
        let Ok(_guard) = self.sync_lock.try_lock() else {
            return Err(RegistryError::SyncInProgress);
        };
        self.run_locked().await
    }

    /// Starts a sync in a detached task and returns immediately.
    pub fn trigger_sync(self: &Arc<Self>) -> SyncTrigger {
        let Ok(guard) = self.sync_lock.clone().try_lock_owned() else {
            tracing::info!("Sync already in progress, trigger coalesced");
            return SyncTrigger::AlreadyRunning;
        };

        let service = Arc::clone(self);
        tokio::spawn(async move {
            let _guard = guard;
            match service.run_locked().await {
                Ok(report) => tracing::info!(
                    run_id = %report.run_id,
                    chains = report.load.loaded,
                    "Triggered sync completed"
                ),
                Err(e) => tracing::error!(error = %e, "Triggered sync failed")
            }
        });

        SyncTrigger::Started
    }

    async fn run_locked(&self) -> RegistryResult<SyncReport> {
        let timer = SyncTimer::start();
        let mut report = SyncReport::new();
        self.set_phase(SyncPhase::Idle);
        tracing::info!(run_id = %report.run_id, source = %self.fetcher.source(), "Starting data sync");

        let result = self.run_stages(&mut report).await;

        let layout = self.layout.clone();
        if let Err(e) = blocking(move || {
            layout.discard_staging();
            Ok(())
        })
        .await
        {
            tracing::warn!(error = %e, "Staging cleanup task failed");
        }

        match result {
            Ok(()) => {
                report.complete();
                SyncTelemetry::record_success(timer.elapsed_ms());
                tracing::info!(
                    run_id = %report.run_id,
                    revision = ?report.revision,
                    copied = report.filter.copied.len(),
                    loaded = report.load.loaded,
                    skipped = report.skipped_total(),
                    "Data sync completed successfully"
                );

                let mut status = self.status.write();
                status.phase = SyncPhase::Idle;
                status.last_success_at = report.completed_at;
                status.consecutive_failures = 0;
                status.last_outcome = Some(SyncOutcome::Succeeded {
                    report: report.clone()
                });
                Ok(report)
            }
            Err(e) => {
                let stage = e.stage().unwrap_or(SyncStage::Fetching);
                SyncTelemetry::record_failure(stage, timer.elapsed_ms());
                tracing::error!(
                    run_id = %report.run_id,
                    stage = %stage,
                    error = %e,
                    "Data sync failed; keeping previous snapshot"
                );

                let mut status = self.status.write();
                status.phase = SyncPhase::Failed;
                status.consecutive_failures += 1;
                status.last_outcome = Some(SyncOutcome::Failed {
                    run_id: report.run_id,
                    stage,
                    error: e.to_string(),
                    failed_at: Utc::now()
                });
                Err(e)
            }
        }
    }

    async fn run_stages(&self, report: &mut SyncReport) -> RegistryResult<()> {
        let staging = self.layout.run_staging_dir(report.run_id);
        let current = self.layout.current_dir();

        self.set_phase(SyncPhase::Fetching);
        let layout = self.layout.clone();
        blocking(move || {
            layout.ensure_directories()?;
            layout.reset_staging()
        })
        .await
        .map_err(|e| e.at_stage(SyncStage::Fetching))?;

        let fetched = self
            .fetcher
            .fetch(&staging)
            .await
            .map_err(|e| e.at_stage(SyncStage::Fetching))?;
        report.revision = fetched.revision;

        self.set_phase(SyncPhase::Filtering);
        let options = FilterOptions {
            prune_stale: self.config.prune_stale
        };
        report.filter = blocking(move || filter::stage_valid_chains(&staging, &current, options))
            .await
            .map_err(|e| e.at_stage(SyncStage::Filtering))?;
        SyncTelemetry::record_skipped(SyncStage::Filtering, report.filter.skipped.len());

        self.set_phase(SyncPhase::Loading);
        report.load = self
            .load_and_publish()
            .await
            .map_err(|e| e.at_stage(SyncStage::Loading))?;

        Ok(())
    }

    async fn load_and_publish(&self) -> RegistryResult<LoadReport> {
        let current = self.layout.current_dir();
        let (snapshot, report) = blocking(move || loader::load_snapshot(&current)).await?;

        let count = snapshot.len();
        self.cache.publish(snapshot);
        SyncTelemetry::set_loaded_chains(count);
        SyncTelemetry::record_skipped(SyncStage::Loading, report.skipped.len());
        Ok(report)
    }

    fn set_phase(&self, phase: SyncPhase) {
        self.status.write().phase = phase;
    }

    pub fn status(&self) -> SyncStatus {
        self.status.read().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.cache.is_ready()
    }

    pub fn loaded_count(&self) -> usize {
        self.cache.loaded_count()
    }

    /// The snapshot currently served; stable for as long as it is held.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.cache.current()
    }

    pub fn list_chain_names(&self) -> Vec<String> {
        self.snapshot().chain_names()
    }

    pub fn chain(&self, name: &str) -> Option<Arc<ChainRecord>> {
        self.snapshot().chain(name)
    }

    pub fn chain_summary(&self, name: &str) -> Option<ChainSummary> {
        self.snapshot().summary(name)
    }

    pub fn asset_list(&self, name: &str) -> Option<Document<AssetList>> {
        self.snapshot().asset_list(name)
    }

    pub fn endpoints(&self, name: &str, kind: EndpointKind) -> Option<Vec<ApiEndpoint>> {
        self.snapshot().endpoints(name, kind)
    }

    pub fn peers(&self, name: &str) -> Option<Vec<Peer>> {
        self.snapshot().peers(name)
    }

    pub fn seeds(&self, name: &str) -> Option<Vec<Peer>> {
        self.snapshot().seeds(name)
    }
}

async fn blocking<T, F>(f: F) -> RegistryResult<T>
where
    F: FnOnce() -> RegistryResult<T> + Send + 'static,
    T: Send + 'static
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| RegistryError::Task(e.to_string()))?
}
