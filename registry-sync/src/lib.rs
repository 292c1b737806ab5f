//! # Registry Sync
//!
//! Mirrors a chain registry repository to local disk and serves it from an
//! in-memory snapshot.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐ fetch ┌─────────────┐ filter ┌──────────────┐ load ┌──────────────┐
//! │ Upstream (git)  │──────►│ data/temp/  │───────►│ data/current │─────►│ SnapshotCache│
//! └─────────────────┘       └─────────────┘        └──────────────┘      └──────────────┘
//!          ▲                                                                    │
//!          │ SyncScheduler (cron) / trigger_sync                                │ reads
//!          └──────────────────────── SyncService ◄──────────────────────────────┘
//! ```
//!
//! A run fetches the upstream tree into a staging directory, copies every
//! qualifying chain into the durable store, rebuilds a [`Snapshot`] from the
//! durable store and publishes it atomically. Readers always see one complete
//! snapshot. A failed run leaves the previous snapshot in place.

pub mod cache;
pub mod config;
pub mod documents;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod layout;
pub mod loader;
pub mod record;
pub mod report;
pub mod scheduler;
pub mod service;
pub mod snapshot;
pub mod telemetry;

pub use cache::SnapshotCache;
pub use config::{RegistryConfig, RegistryConfigBuilder};
pub use documents::{ApiEndpoint, AssetList, ChainInfo, Document, Peer, VersionInfo};
pub use error::{RegistryError, RegistryResult, SyncStage};
pub use fetcher::{FetchedTree, GitFetcher, SourceFetcher};
pub use record::{ChainRecord, ChainSummary, EndpointKind};
pub use report::{FilterReport, LoadReport, SkipReason, SkippedChain, SyncReport};
pub use scheduler::SyncScheduler;
pub use service::{SyncOutcome, SyncPhase, SyncService, SyncStatus, SyncTrigger};
pub use snapshot::Snapshot;
