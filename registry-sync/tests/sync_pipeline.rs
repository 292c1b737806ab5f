//! End-to-end tests for the fetch → filter → load pipeline.
//!
//! Git-backed tests clone a temporary local repository built with the
//! `testing` fixtures. Failure and concurrency cases use in-file fetchers.

use async_trait::async_trait;
use registry_sync::filter::copy_dir_recursive;
use registry_sync::layout::DENYLIST;
use registry_sync::{
    EndpointKind, FetchedTree, RegistryConfig, RegistryError, RegistryResult, SkipReason,
    SourceFetcher, SyncOutcome, SyncPhase, SyncService, SyncStage, SyncTrigger
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use testing::{ChainFixture, UpstreamRepo, sample_versions};
use tokio::sync::Notify;

fn git_config(data_dir: &Path, upstream: &UpstreamRepo) -> RegistryConfig {
    RegistryConfig::builder()
        .data_dir(data_dir)
        .repository_url(upstream.url())
        .shallow(false)
        .fetch_timeout_secs(60)
        .enable_scheduler(false)
        .build()
        .unwrap()
}

fn local_config(data_dir: &Path) -> RegistryConfig {
    RegistryConfig::builder()
        .data_dir(data_dir)
        .enable_scheduler(false)
        .build()
        .unwrap()
}

fn cosmoshub() -> ChainFixture {
    ChainFixture::new("cosmoshub").with_assets(json!({
        "chain_name": "cosmoshub",
        "assets": [{"base": "uatom", "symbol": "ATOM", "display": "atom"}]
    }))
}

struct FailingFetcher;

#[async_trait]
impl SourceFetcher for FailingFetcher {
    async fn fetch(&self, _dest: &Path) -> RegistryResult<FetchedTree> {
        Err(RegistryError::FetchFailed {
            url: "https://github.com/cosmos/chain-registry.git".to_string(),
            reason: "failed to resolve address for github.com".to_string()
        })
    }

    fn source(&self) -> &str {
        "failing"
    }
}

/// Blocks inside `fetch` until released, then copies `source` into place.
struct GatedFetcher {
    source: PathBuf,
    entered: Notify,
    release: Notify
}

#[async_trait]
impl SourceFetcher for GatedFetcher {
    async fn fetch(&self, dest: &Path) -> RegistryResult<FetchedTree> {
        self.entered.notify_one();
        self.release.notified().await;
        copy_dir_recursive(&self.source, dest)?;
        Ok(FetchedTree::default())
    }

    fn source(&self) -> &str {
        "gated"
    }
}

#[tokio::test]
async fn test_git_sync_end_to_end() {
    let upstream = UpstreamRepo::with_chains(&[
        cosmoshub(),
        ChainFixture::new("osmosis").with_versions(sample_versions("osmosis")),
        ChainFixture::new("brokenchain").without_assets()
    ])
    .unwrap();
    let data = tempfile::tempdir().unwrap();
    let service = SyncService::from_config(git_config(data.path(), &upstream));

    service.initialize().await.unwrap();

    assert!(service.is_ready());
    assert_eq!(service.list_chain_names(), vec!["cosmoshub", "osmosis"]);

    let summary = service.chain_summary("cosmoshub").unwrap();
    assert_eq!(summary.name, "cosmoshub");
    assert_eq!(summary.network_type.as_deref(), Some("mainnet"));
    assert_eq!(summary.denom, "uatom");
    assert_eq!(summary.recommended_version.as_deref(), Some("v1.0.0"));

    assert!(service.chain("brokenchain").is_none());
    assert!(service.chain("osmosis").unwrap().version_info.is_some());
    assert!(service.chain("cosmoshub").unwrap().version_info.is_none());

    let current = data.path().join("current");
    for name in DENYLIST {
        assert!(!current.join(name).exists(), "{name} copied into durable store");
    }
    assert!(!current.join("README.md").exists());
    assert!(!data.path().join("temp").exists());

    match service.status().last_outcome {
        Some(SyncOutcome::Succeeded { report }) => {
            assert_eq!(report.revision.as_ref().map(String::len), Some(40));
            assert_eq!(report.filter.skipped.len(), 1);
            assert_eq!(report.filter.skipped[0].name, "brokenchain");
        }
        other => panic!("Expected successful outcome, got {other:?}")
    }
}

#[tokio::test]
async fn test_incomplete_and_malformed_chains_are_excluded() {
    let upstream = UpstreamRepo::with_chains(&[
        cosmoshub(),
        ChainFixture::new("assetsonly").without_chain(),
        ChainFixture::new("badassets").with_malformed_assets(),
        ChainFixture::new("badversions").with_malformed_versions(),
        ChainFixture::new("loosetypes").with_chain(json!({
            "chain_name": "loosetypes",
            "slip44": "118",
            "apis": { "rpc": "none" }
        })),
    ])
    .unwrap();
    let data = tempfile::tempdir().unwrap();
    let service = SyncService::from_config(git_config(data.path(), &upstream));

    service.initialize().await.unwrap();

    assert_eq!(service.list_chain_names(), vec!["cosmoshub", "loosetypes"]);
    let loose = service.chain("loosetypes").unwrap();
    assert_eq!(loose.chain_info.raw()["slip44"], "118");
    assert_eq!(service.endpoints("loosetypes", EndpointKind::Rpc), Some(Vec::new()));

    let Some(SyncOutcome::Succeeded { report }) = service.status().last_outcome else {
        panic!("Expected successful outcome");
    };
    assert_eq!(
        report.filter.copied,
        vec!["badassets", "badversions", "cosmoshub", "loosetypes"]
    );
    assert_eq!(report.filter.skipped.len(), 1);
    assert_eq!(report.filter.skipped[0].name, "assetsonly");
    assert_eq!(
        report.filter.skipped[0].reason,
        SkipReason::MissingFiles {
            files: vec!["chain.json".to_string()]
        }
    );

    let malformed_file = |name: &str| {
        report
            .load
            .skipped
            .iter()
            .find(|s| s.name == name)
            .and_then(|s| match &s.reason {
                SkipReason::Malformed { file, .. } => Some(file.clone()),
                _ => None
            })
    };
    assert_eq!(report.load.skipped.len(), 2);
    assert_eq!(malformed_file("badassets").as_deref(), Some("assetlist.json"));
    assert_eq!(malformed_file("badversions").as_deref(), Some("versions.json"));
}

#[tokio::test]
async fn test_resync_picks_up_upstream_changes() {
    let upstream =
        UpstreamRepo::with_chains(&[cosmoshub(), ChainFixture::new("juno")]).unwrap();
    let data = tempfile::tempdir().unwrap();
    let service = SyncService::from_config(git_config(data.path(), &upstream));
    service.initialize().await.unwrap();

    upstream
        .add_chain(&cosmoshub().with_chain_field("pretty_name", json!("Cosmos Hub")))
        .unwrap();
    upstream.add_chain(&ChainFixture::new("stargaze")).unwrap();
    upstream.remove_chain("juno").unwrap();
    upstream.commit("Update registry").unwrap();

    let report = service.sync_data().await.unwrap();

    assert_eq!(report.filter.copied, vec!["cosmoshub", "stargaze"]);
    assert!(report.filter.pruned.is_empty());
    assert_eq!(service.list_chain_names(), vec!["cosmoshub", "juno", "stargaze"]);
    assert_eq!(
        service.chain_summary("cosmoshub").unwrap().pretty_name.as_deref(),
        Some("Cosmos Hub")
    );
}

#[tokio::test]
async fn test_resync_prunes_when_enabled() {
    let upstream =
        UpstreamRepo::with_chains(&[cosmoshub(), ChainFixture::new("juno")]).unwrap();
    let data = tempfile::tempdir().unwrap();
    let mut config = git_config(data.path(), &upstream);
    config.prune_stale = true;
    let service = SyncService::from_config(config);
    service.initialize().await.unwrap();

    upstream.remove_chain("juno").unwrap();
    upstream.commit("Retire juno").unwrap();
    let report = service.sync_data().await.unwrap();

    assert_eq!(report.filter.pruned, vec!["juno"]);
    assert_eq!(service.list_chain_names(), vec!["cosmoshub"]);
}

#[tokio::test]
async fn test_fetch_failure_leaves_snapshot_untouched() {
    let data = tempfile::tempdir().unwrap();
    let current = data.path().join("current");
    cosmoshub().write_to(&current).unwrap();
    ChainFixture::new("akash").write_to(&current).unwrap();

    let service = SyncService::new(local_config(data.path()), Arc::new(FailingFetcher));
    service.initialize().await.unwrap();

    let before = service.snapshot();
    let summary_before = service.chain_summary("cosmoshub");
    let rpc_before = service.endpoints("akash", EndpointKind::Rpc);

    let err = service.sync_data().await.unwrap_err();
    assert!(err.is_fetch_failure());
    assert_eq!(err.stage(), Some(SyncStage::Fetching));

    let after = service.snapshot();
    assert!(before.same_contents(&after));
    assert_eq!(before.loaded_at(), after.loaded_at());
    assert_eq!(service.chain_summary("cosmoshub"), summary_before);
    assert_eq!(service.endpoints("akash", EndpointKind::Rpc), rpc_before);
    assert_eq!(service.list_chain_names(), vec!["akash", "cosmoshub"]);

    let status = service.status();
    assert_eq!(status.phase, SyncPhase::Failed);
    assert_eq!(status.consecutive_failures, 1);
    assert!(status.last_success_at.is_none());
    assert!(matches!(
        status.last_outcome,
        Some(SyncOutcome::Failed { stage: SyncStage::Fetching, .. })
    ));
}

#[tokio::test]
async fn test_reload_is_idempotent() {
    let data = tempfile::tempdir().unwrap();
    let current = data.path().join("current");
    cosmoshub().write_to(&current).unwrap();
    ChainFixture::new("osmosis")
        .with_versions(sample_versions("osmosis"))
        .write_to(&current)
        .unwrap();
    ChainFixture::new("garbled").with_malformed_chain().write_to(&current).unwrap();

    let service = SyncService::new(local_config(data.path()), Arc::new(FailingFetcher));
    let first_report = service.reload().await.unwrap();
    let first = service.snapshot();
    let second_report = service.reload().await.unwrap();
    let second = service.snapshot();

    assert_eq!(first_report, second_report);
    assert_eq!(first.chain_names(), second.chain_names());
    assert!(first.same_contents(&second));
    assert_eq!(first_report.skipped[0].name, "garbled");
}

#[tokio::test]
async fn test_denylisted_names_never_served() {
    let data = tempfile::tempdir().unwrap();
    let current = data.path().join("current");
    for name in DENYLIST {
        ChainFixture::new(name).write_to(&current).unwrap();
    }
    cosmoshub().write_to(&current).unwrap();

    let service = SyncService::new(local_config(data.path()), Arc::new(FailingFetcher));
    service.initialize().await.unwrap();

    assert_eq!(service.list_chain_names(), vec!["cosmoshub"]);
    for name in DENYLIST {
        assert!(service.chain(name).is_none());
    }
}

#[tokio::test]
async fn test_concurrent_triggers_are_coalesced() {
    let upstream = tempfile::tempdir().unwrap();
    ChainFixture::new("evmos").write_to(upstream.path()).unwrap();
    let data = tempfile::tempdir().unwrap();
    cosmoshub().write_to(&data.path().join("current")).unwrap();

    let fetcher = Arc::new(GatedFetcher {
        source: upstream.path().to_path_buf(),
        entered: Notify::new(),
        release: Notify::new()
    });
    let service = Arc::new(SyncService::new(local_config(data.path()), fetcher.clone()));
    service.initialize().await.unwrap();

    assert_eq!(service.trigger_sync(), SyncTrigger::Started);
    fetcher.entered.notified().await;

    assert_eq!(service.trigger_sync(), SyncTrigger::AlreadyRunning);
    assert!(matches!(service.sync_data().await, Err(RegistryError::SyncInProgress)));
    assert_eq!(service.status().phase, SyncPhase::Fetching);
    assert_eq!(service.list_chain_names(), vec!["cosmoshub"]);

    fetcher.release.notify_one();
    tokio::time::timeout(Duration::from_secs(10), async {
        while service.status().last_outcome.is_none() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(service.status().phase, SyncPhase::Idle);
    assert_eq!(service.list_chain_names(), vec!["cosmoshub", "evmos"]);
}
