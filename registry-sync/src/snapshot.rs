//! Immutable point-in-time view of the registry.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::documents::{ApiEndpoint, AssetList, Document, Peer};
use crate::record::{ChainRecord, ChainSummary, EndpointKind};

/// Chain name → record. Built once by the loader and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    chains: BTreeMap<String, Arc<ChainRecord>>,
    loaded_at: DateTime<Utc>
}

impl Snapshot {
    pub fn new(chains: BTreeMap<String, Arc<ChainRecord>>) -> Self {
        Self {
            chains,
            loaded_at: Utc::now()
        }
    }

    pub fn empty() -> Self {
        Self::new(BTreeMap::new())
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Chain names in ascending order.
    pub fn chain_names(&self) -> Vec<String> {
        self.chains.keys().cloned().collect()
    }

    pub fn chain(&self, name: &str) -> Option<Arc<ChainRecord>> {
        self.chains.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.chains.contains_key(name)
    }

    pub fn summary(&self, name: &str) -> Option<ChainSummary> {
        self.chains.get(name).map(|record| record.summary())
    }

    pub fn asset_list(&self, name: &str) -> Option<Document<AssetList>> {
        self.chains.get(name).map(|record| record.asset_list.clone())
    }

    pub fn endpoints(&self, name: &str, kind: EndpointKind) -> Option<Vec<ApiEndpoint>> {
        self.chains.get(name).map(|record| record.endpoints(kind))
    }

    pub fn peers(&self, name: &str) -> Option<Vec<Peer>> {
        self.chains.get(name).map(|record| record.persistent_peers())
    }

    pub fn seeds(&self, name: &str) -> Option<Vec<Peer>> {
        self.chains.get(name).map(|record| record.seeds())
    }

    /// Structural equality ignoring `loaded_at`.
    pub fn same_contents(&self, other: &Self) -> bool {
        self.chains == other.chains
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}
