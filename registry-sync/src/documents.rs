//! Per-chain registry documents.
//!
//! A [`Document`] keeps the JSON exactly as read from disk and serves it back
//! unchanged; alongside it sits a typed view used for summaries and endpoint
//! lookups. The views are lenient: a field whose value does not match the
//! modelled type reads as absent instead of rejecting the document, so any
//! syntactically valid JSON file loads.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::ops::Deref;

/// A registry document: the raw JSON plus a leniently typed view of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Document<T> {
    raw: Value,
    view: T
}

impl<T: DeserializeOwned + Default> Document<T> {
    /// Parses `contents`; fails only on invalid JSON syntax.
    pub fn parse(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<Value>(contents).map(Self::from_value)
    }

    pub fn from_value(raw: Value) -> Self {
        let view = T::deserialize(&raw).unwrap_or_default();
        Self { raw, view }
    }
}

impl<T> Document<T> {
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn view(&self) -> &T {
        &self.view
    }
}

impl<T: Default> Default for Document<T> {
    fn default() -> Self {
        Self {
            raw: Value::Object(Map::new()),
            view: T::default()
        }
    }
}

impl<T> Deref for Document<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.view
    }
}

impl<T> Serialize for Document<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de, T: DeserializeOwned + Default> Deserialize<'de> for Document<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

/// Reads a field as `T`, falling back to `T::default()` on a type mismatch.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(&value).unwrap_or_default())
}

/// Reads a list, dropping elements that do not match `T`.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_array().map(|items| conforming(items)).unwrap_or_default())
}

fn lenient_optional_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_array().map(|items| conforming(items)))
}

fn conforming<T: DeserializeOwned>(items: &[Value]) -> Vec<T> {
    items
        .iter()
        .filter_map(|item| T::deserialize(item).ok())
        .collect()
}

/// Contents of `chain.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainInfo {
    #[serde(rename = "$schema", default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub chain_name: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub chain_type: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub pretty_name: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub network_type: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub bech32_prefix: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub daemon_name: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub node_home: Option<String>,
    #[serde(default, deserialize_with = "lenient_optional_list", skip_serializing_if = "Option::is_none")]
    pub key_algos: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub slip44: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub fees: Option<Value>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub staking: Option<Value>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub codebase: Option<Codebase>,
    #[serde(rename = "logo_URIs", default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub logo_uris: Option<Value>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub peers: Option<Peers>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub apis: Option<Apis>,
    #[serde(default, deserialize_with = "lenient_optional_list", skip_serializing_if = "Option::is_none")]
    pub explorers: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient_optional_list", skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Codebase {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub git_repo: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub recommended_version: Option<String>,
    #[serde(default, deserialize_with = "lenient_optional_list", skip_serializing_if = "Option::is_none")]
    pub compatible_versions: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>
}

/// Seed and persistent peer lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Peers {
    #[serde(default, deserialize_with = "lenient_optional_list", skip_serializing_if = "Option::is_none")]
    pub seeds: Option<Vec<Peer>>,
    #[serde(default, deserialize_with = "lenient_optional_list", skip_serializing_if = "Option::is_none")]
    pub persistent_peers: Option<Vec<Peer>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Peer {
    #[serde(default, deserialize_with = "lenient")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub address: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>
}

/// Public RPC/REST/gRPC endpoint lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Apis {
    #[serde(default, deserialize_with = "lenient_optional_list", skip_serializing_if = "Option::is_none")]
    pub rpc: Option<Vec<ApiEndpoint>>,
    #[serde(default, deserialize_with = "lenient_optional_list", skip_serializing_if = "Option::is_none")]
    pub rest: Option<Vec<ApiEndpoint>>,
    #[serde(default, deserialize_with = "lenient_optional_list", skip_serializing_if = "Option::is_none")]
    pub grpc: Option<Vec<ApiEndpoint>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiEndpoint {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>
}

/// Contents of `assetlist.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetList {
    #[serde(rename = "$schema", default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub chain_name: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub assets: Vec<Asset>,
    #[serde(flatten)]
    pub extra: Map<String, Value>
}

impl AssetList {
    /// The chain's primary asset, by registry convention the first entry.
    pub fn primary_asset(&self) -> Option<&Asset> {
        self.assets.first()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub denom_units: Vec<DenomUnit>,
    #[serde(default, deserialize_with = "lenient")]
    pub base: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub coingecko_id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub type_asset: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DenomUnit {
    #[serde(default, deserialize_with = "lenient")]
    pub denom: String,
    #[serde(default, deserialize_with = "lenient")]
    pub exponent: u32,
    #[serde(default, deserialize_with = "lenient_optional_list", skip_serializing_if = "Option::is_none")]
    pub aliases: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>
}

/// Contents of `versions.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionInfo {
    #[serde(rename = "$schema", default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub chain_name: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub versions: Vec<ChainVersion>,
    #[serde(flatten)]
    pub extra: Map<String, Value>
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainVersion {
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub recommended_version: Option<String>,
    #[serde(default, deserialize_with = "lenient_optional_list", skip_serializing_if = "Option::is_none")]
    pub compatible_versions: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub previous_version_name: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub next_version_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chain_info_keeps_unknown_fields() {
        let raw = json!({
            "$schema": "../chain.schema.json",
            "chain_name": "osmosis",
            "network_type": "mainnet",
            "slip44": 118,
            "logo_URIs": { "png": "https://example.org/osmo.png" },
            "codebase": { "git_repo": "https://github.com/osmosis-labs/osmosis", "cosmwasm_enabled": true },
            "extra_codename": "lab"
        });

        let info: ChainInfo = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(info.chain_name, "osmosis");
        assert_eq!(info.slip44, Some(118));
        assert_eq!(info.extra.get("extra_codename"), Some(&json!("lab")));
        let codebase = info.codebase.as_ref().unwrap();
        assert_eq!(codebase.extra.get("cosmwasm_enabled"), Some(&json!(true)));

        assert_eq!(serde_json::to_value(&info).unwrap(), raw);
    }

    #[test]
    fn test_sparse_chain_info_parses() {
        let info: ChainInfo = serde_json::from_str("{}").unwrap();
        assert!(info.chain_name.is_empty());
        assert!(info.apis.is_none());
        assert!(info.peers.is_none());
    }

    #[test]
    fn test_mistyped_fields_read_as_absent() {
        let doc: Document<ChainInfo> = Document::from_value(json!({
            "chain_name": null,
            "slip44": "118",
            "key_algos": "secp256k1",
            "apis": { "rpc": [{ "address": "https://rpc.juno.example" }, 42] },
            "network_type": "mainnet"
        }));

        assert!(doc.chain_name.is_empty());
        assert_eq!(doc.slip44, None);
        assert_eq!(doc.key_algos, None);
        assert_eq!(doc.network_type.as_deref(), Some("mainnet"));
        let rpc = doc.apis.as_ref().and_then(|apis| apis.rpc.as_ref()).unwrap();
        assert_eq!(rpc.len(), 1);

        assert_eq!(doc.raw()["slip44"], "118");
        assert!(doc.raw()["chain_name"].is_null());
    }

    #[test]
    fn test_document_serializes_raw_json() {
        let raw = json!({ "chain_name": "akash", "slip44": -1, "custom": [1, 2] });
        let doc: Document<ChainInfo> = Document::from_value(raw.clone());
        assert_eq!(serde_json::to_value(&doc).unwrap(), raw);
    }

    #[test]
    fn test_non_object_document_has_default_view() {
        let doc = Document::<ChainInfo>::parse("[1, 2, 3]").unwrap();
        assert_eq!(doc.view(), &ChainInfo::default());
        assert_eq!(doc.raw(), &json!([1, 2, 3]));

        let assets = Document::<AssetList>::parse(r#"{"assets": {"base": "uatom"}}"#).unwrap();
        assert!(assets.primary_asset().is_none());
    }

    #[test]
    fn test_invalid_syntax_is_rejected() {
        assert!(Document::<ChainInfo>::parse("{ \"chain_name\": ").is_err());
        assert!(Document::<VersionInfo>::parse("").is_err());
    }

    #[test]
    fn test_primary_asset_is_first() {
        let list: AssetList = serde_json::from_value(json!({
            "chain_name": "cosmoshub",
            "assets": [
                { "base": "uatom", "denom_units": [{ "denom": "uatom", "exponent": 0 }] },
                { "base": "ibc/27394FB092D2ECCD56123C74F36E4C1F926001CEADA9CA97EA622B25F41E5EB2" }
            ]
        }))
        .unwrap();

        assert_eq!(list.primary_asset().map(|a| a.base.as_str()), Some("uatom"));
        assert_eq!(list.assets[0].denom_units[0].exponent, 0);
    }

    #[test]
    fn test_empty_asset_list_has_no_primary() {
        let list = AssetList::default();
        assert!(list.primary_asset().is_none());
    }
}
