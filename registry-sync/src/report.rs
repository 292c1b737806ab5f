use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why a chain directory was left out of the durable store or the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    MissingFiles { files: Vec<String> },
    Malformed { file: String, reason: String },
    Unreadable { reason: String }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingFiles { files } => write!(f, "missing required files: {}", files.join(", ")),
            Self::Malformed { file, reason } => write!(f, "malformed {file}: {reason}"),
            Self::Unreadable { reason } => write!(f, "unreadable: {reason}")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedChain {
    pub name: String,
    pub reason: SkipReason
}

/// Outcome of a filter pass over a staged upstream tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterReport {
    /// Chains copied into the durable store, in processing order.
    pub copied: Vec<String>,
    /// Denylisted folders that were present upstream.
    pub denied: Vec<String>,
    pub skipped: Vec<SkippedChain>,
    /// Chains removed from the durable store because they vanished upstream.
    pub pruned: Vec<String>
}

impl FilterReport {
    pub fn skip(&mut self, name: impl Into<String>, reason: SkipReason) {
        self.skipped.push(SkippedChain {
            name: name.into(),
            reason
        });
    }

    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// Outcome of loading the durable store into a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: Vec<SkippedChain>
}

impl LoadReport {
    pub fn skip(&mut self, name: impl Into<String>, reason: SkipReason) {
        self.skipped.push(SkippedChain {
            name: name.into(),
            reason
        });
    }

    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// Summary of one complete fetch → filter → load run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Upstream commit the run synced to, when the fetcher reports one.
    pub revision: Option<String>,
    pub filter: FilterReport,
    pub load: LoadReport
}

impl SyncReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            completed_at: None,
            revision: None,
            filter: FilterReport::default(),
            load: LoadReport::default()
        }
    }

    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    pub fn skipped_total(&self) -> usize {
        self.filter.skipped.len() + self.load.skipped.len()
    }
}

impl Default for SyncReport {
    fn default() -> Self {
        Self::new()
    }
}
