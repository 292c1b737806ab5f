use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::error::{RegistryError, RegistryResult};
use crate::report::SyncReport;
use crate::service::SyncService;

/// Runs [`SyncService::sync_data`] on the configured cron schedule (UTC).
pub struct SyncScheduler {
    scheduler: JobScheduler,
    service: Arc<SyncService>,
    schedule: String
}

impl SyncScheduler {
    pub async fn new(service: Arc<SyncService>) -> RegistryResult<Self> {
        let schedule = service.config().sync_schedule.clone();
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| RegistryError::Scheduler(e.to_string()))?;

        let service_clone = service.clone();
        let job = Job::new_async(schedule.as_str(), move |_uuid, _lock| {
            let service = service_clone.clone();
            Box::pin(async move {
                info!("Starting scheduled registry sync");
                match service.sync_data().await {
                    Ok(report) => info!(
                        run_id = %report.run_id,
                        chains = report.load.loaded,
                        skipped = report.skipped_total(),
                        "Scheduled sync completed"
                    ),
                    Err(RegistryError::SyncInProgress) => {
                        info!("Scheduled sync skipped: a run is already in progress")
                    }
                    Err(e) => error!(error = %e, "Scheduled sync failed")
                }
            })
        })
        .map_err(|e| RegistryError::Scheduler(format!("invalid schedule '{schedule}': {e}")))?;

        scheduler
            .add(job)
            .await
            .map_err(|e| RegistryError::Scheduler(e.to_string()))?;

        Ok(Self {
            scheduler,
            service,
            schedule
        })
    }

    pub fn schedule(&self) -> &str {
        &self.schedule
    }

    pub async fn start(&self) -> RegistryResult<()> {
        self.scheduler
            .start()
            .await
            .map_err(|e| RegistryError::Scheduler(e.to_string()))?;
        info!(schedule = %self.schedule, "Registry sync scheduler started");
        Ok(())
    }

    pub async fn stop(&mut self) -> RegistryResult<()> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| RegistryError::Scheduler(e.to_string()))?;
        info!("Registry sync scheduler stopped");
        Ok(())
    }

    pub async fn run_now(&self) -> RegistryResult<SyncReport> {
        self.service.sync_data().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::fetcher::{FetchedTree, SourceFetcher};
    use crate::layout::{ASSET_LIST_FILE, CHAIN_FILE};
    use async_trait::async_trait;
    use std::path::Path;

    struct OfflineFetcher;

    #[async_trait]
    impl SourceFetcher for OfflineFetcher {
        async fn fetch(&self, _dest: &Path) -> RegistryResult<FetchedTree> {
            Err(RegistryError::FetchFailed {
                url: "https://github.com/cosmos/chain-registry.git".to_string(),
                reason: "offline".to_string()
            })
        }

        fn source(&self) -> &str {
            "offline"
        }
    }

    fn service(schedule: &str) -> Arc<SyncService> {
        let dir = std::env::temp_dir().join("registry-scheduler-test");
        let mut config = RegistryConfig::builder().data_dir(dir).build().unwrap();
        config.sync_schedule = schedule.to_string();
        Arc::new(SyncService::from_config(config))
    }

    #[tokio::test]
    async fn test_default_schedule_is_accepted() {
        let scheduler = SyncScheduler::new(service("0 0 2 * * *")).await.unwrap();
        assert_eq!(scheduler.schedule(), "0 0 2 * * *");
    }

    #[tokio::test]
    async fn test_invalid_schedule_is_rejected() {
        let result = SyncScheduler::new(service("every night")).await;
        assert!(matches!(result, Err(RegistryError::Scheduler(_))));
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let mut scheduler = SyncScheduler::new(service("0 0 2 * * *")).await.unwrap();
        scheduler.start().await.unwrap();
        scheduler.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_run_now_failure_keeps_snapshot() {
        let data = tempfile::tempdir().unwrap();
        let chain = data.path().join("current").join("osmosis");
        std::fs::create_dir_all(&chain).unwrap();
        std::fs::write(chain.join(CHAIN_FILE), r#"{"chain_name": "osmosis"}"#).unwrap();
        std::fs::write(chain.join(ASSET_LIST_FILE), r#"{"assets": [{"base": "uosmo"}]}"#).unwrap();

        let config = RegistryConfig::builder().data_dir(data.path()).build().unwrap();
        let service = Arc::new(SyncService::new(config, Arc::new(OfflineFetcher)));
        service.initialize().await.unwrap();
        let before = service.snapshot();

        let scheduler = SyncScheduler::new(service.clone()).await.unwrap();
        let err = scheduler.run_now().await.unwrap_err();

        assert!(err.is_fetch_failure());
        assert!(Arc::ptr_eq(&before, &service.snapshot()));
        assert_eq!(service.list_chain_names(), vec!["osmosis"]);
    }
}
