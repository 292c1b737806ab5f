use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::documents::{ApiEndpoint, AssetList, ChainInfo, Document, Peer, VersionInfo};

/// Denom reported when a chain's asset list is empty.
pub const UNKNOWN_DENOM: &str = "unknown";

/// One registered chain as held in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainRecord {
    pub chain_info: Document<ChainInfo>,
    pub asset_list: Document<AssetList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_info: Option<Document<VersionInfo>>,
    /// Modification time of `chain.json` when it was loaded.
    pub last_modified: DateTime<Utc>
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    Rpc,
    Rest,
    Grpc
}

/// Reduced view of a chain for lightweight responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pretty_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daemon_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_home: Option<String>,
    pub denom: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_repo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_version: Option<String>,
    pub last_modified: String
}

impl ChainRecord {
    pub fn summary(&self) -> ChainSummary {
        let info = &self.chain_info;
        let codebase = info.codebase.as_ref();

        ChainSummary {
            name: info.chain_name.clone(),
            pretty_name: info.pretty_name.clone(),
            network_type: info.network_type.clone(),
            website: info.website.clone(),
            daemon_name: info.daemon_name.clone(),
            chain_id: info.chain_id.clone(),
            node_home: info.node_home.clone(),
            denom: self
                .asset_list
                .primary_asset()
                .map(|asset| asset.base.clone())
                .filter(|base| !base.is_empty())
                .unwrap_or_else(|| UNKNOWN_DENOM.to_string()),
            git_repo: codebase.and_then(|c| c.git_repo.clone()),
            recommended_version: codebase.and_then(|c| c.recommended_version.clone()),
            last_modified: self
                .last_modified
                .to_rfc3339_opts(SecondsFormat::Millis, true)
        }
    }

    /// Endpoints of one kind; empty when the chain lists none.
    pub fn endpoints(&self, kind: EndpointKind) -> Vec<ApiEndpoint> {
        let Some(apis) = self.chain_info.apis.as_ref() else {
            return Vec::new();
        };
        let list = match kind {
            EndpointKind::Rpc => &apis.rpc,
            EndpointKind::Rest => &apis.rest,
            EndpointKind::Grpc => &apis.grpc
        };
        list.clone().unwrap_or_default()
    }

    pub fn persistent_peers(&self) -> Vec<Peer> {
        self.chain_info
            .peers
            .as_ref()
            .and_then(|p| p.persistent_peers.clone())
            .unwrap_or_default()
    }

    pub fn seeds(&self) -> Vec<Peer> {
        self.chain_info
            .peers
            .as_ref()
            .and_then(|p| p.seeds.clone())
            .unwrap_or_default()
    }
}
