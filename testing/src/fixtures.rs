use anyhow::Context;
use git2::{IndexAddOption, Repository, Signature};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[derive(Debug, Clone)]
enum Document {
    Json(Value),
    Raw(String)
}

impl Document {
    fn render(&self) -> anyhow::Result<String> {
        match self {
            Self::Json(value) => Ok(serde_json::to_string_pretty(value)?),
            Self::Raw(text) => Ok(text.clone())
        }
    }
}

/// A chain directory as it appears in the upstream registry.
#[derive(Debug, Clone)]
pub struct ChainFixture {
    name: String,
    chain: Option<Document>,
    assets: Option<Document>,
    versions: Option<Document>
}

impl ChainFixture {
    /// A mainnet chain with one asset, one endpoint of each kind, a seed and
    /// a persistent peer.
    pub fn new(name: &str) -> Self {
        let chain = json!({
            "$schema": "../chain.schema.json",
            "chain_name": name,
            "status": "live",
            "network_type": "mainnet",
            "website": format!("https://{name}.network"),
            "pretty_name": capitalize(name),
            "chain_id": format!("{name}-1"),
            "bech32_prefix": name,
            "daemon_name": format!("{name}d"),
            "node_home": format!("$HOME/.{name}"),
            "slip44": 118,
            "codebase": {
                "git_repo": format!("https://github.com/{name}/{name}"),
                "recommended_version": "v1.0.0",
                "compatible_versions": ["v1.0.0"]
            },
            "peers": {
                "seeds": [
                    {"id": "ade4d8bc8cbe014af6ebdf3cb7b1e9ad36f412c0", "address": format!("seeds.{name}.network:26656"), "provider": "Polkachu"}
                ],
                "persistent_peers": [
                    {"id": "f1b8b4b0b4d6e5e5c3c0a3ad5a3b4c1e8f9d0e1a", "address": format!("peer.{name}.network:26656")}
                ]
            },
            "apis": {
                "rpc": [{"address": format!("https://rpc.{name}.network"), "provider": "Polkachu"}],
                "rest": [{"address": format!("https://api.{name}.network"), "provider": "Polkachu"}],
                "grpc": [{"address": format!("grpc.{name}.network:9090"), "provider": "Polkachu"}]
            }
        });
        let assets = json!({
            "$schema": "../assetlist.schema.json",
            "chain_name": name,
            "assets": [{
                "description": format!("The native token of {}", capitalize(name)),
                "denom_units": [
                    {"denom": format!("u{name}"), "exponent": 0},
                    {"denom": name, "exponent": 6}
                ],
                "base": format!("u{name}"),
                "name": capitalize(name),
                "display": name,
                "symbol": name.to_uppercase()
            }]
        });

        Self {
            name: name.to_string(),
            chain: Some(Document::Json(chain)),
            assets: Some(Document::Json(assets)),
            versions: None
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_chain(mut self, chain: Value) -> Self {
        self.chain = Some(Document::Json(chain));
        self
    }

    /// Sets a top-level field of `chain.json`.
    pub fn with_chain_field(mut self, key: &str, value: Value) -> Self {
        if let Some(Document::Json(Value::Object(map))) = &mut self.chain {
            map.insert(key.to_string(), value);
        }
        self
    }

    pub fn with_assets(mut self, assets: Value) -> Self {
        self.assets = Some(Document::Json(assets));
        self
    }

    pub fn with_versions(mut self, versions: Value) -> Self {
        self.versions = Some(Document::Json(versions));
        self
    }

    pub fn without_chain(mut self) -> Self {
        self.chain = None;
        self
    }

    pub fn without_assets(mut self) -> Self {
        self.assets = None;
        self
    }

    pub fn with_malformed_chain(mut self) -> Self {
        self.chain = Some(Document::Raw("{ \"chain_name\": ".to_string()));
        self
    }

    pub fn with_malformed_assets(mut self) -> Self {
        self.assets = Some(Document::Raw("[not an asset list".to_string()));
        self
    }

    pub fn with_malformed_versions(mut self) -> Self {
        self.versions = Some(Document::Raw("{ versions: }".to_string()));
        self
    }

    /// Writes the chain directory under `root` and returns its path.
    pub fn write_to(&self, root: &Path) -> anyhow::Result<PathBuf> {
        let dir = root.join(&self.name);
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

        for (file, document) in [
            ("chain.json", &self.chain),
            ("assetlist.json", &self.assets),
            ("versions.json", &self.versions)
        ] {
            if let Some(document) = document {
                fs::write(dir.join(file), document.render()?)
                    .with_context(|| format!("writing {}/{file}", self.name))?;
            }
        }
        Ok(dir)
    }
}

/// Typical `versions.json` content with two upgrades.
pub fn sample_versions(name: &str) -> Value {
    json!({
        "$schema": "../versions.schema.json",
        "chain_name": name,
        "versions": [
            {"name": "v1", "tag": "v1.0.0", "height": 0, "next_version_name": "v2"},
            {"name": "v2", "tag": "v2.0.0", "height": 1_000_000, "proposal": 42, "recommended_version": "v2.0.1"}
        ]
    })
}

/// A temporary non-bare git repository standing in for the upstream registry.
///
/// Clone it by local path; libgit2's local transport does not support
/// shallow fetches, so fetchers pointed at it must use full clones.
pub struct UpstreamRepo {
    dir: TempDir,
    repo: Repository
}

impl UpstreamRepo {
    pub fn new() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let repo = Repository::init(dir.path())?;
        tracing::debug!(path = %dir.path().display(), "Initialized upstream fixture repository");
        Ok(Self { dir, repo })
    }

    /// Repository with the given chains and the usual non-chain folders, in
    /// one commit.
    pub fn with_chains(chains: &[ChainFixture]) -> anyhow::Result<Self> {
        let upstream = Self::new()?;
        for chain in chains {
            upstream.add_chain(chain)?;
        }
        upstream.add_file("README.md", "# Chain Registry\n")?;
        upstream.add_chain(&ChainFixture::new("_template"))?;
        upstream.add_file("_IBC/osmosis-cosmoshub.json", "{}")?;
        upstream.commit("Initial registry contents")?;
        Ok(upstream)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Clone URL (the local path).
    pub fn url(&self) -> String {
        self.dir.path().to_string_lossy().into_owned()
    }

    pub fn add_chain(&self, chain: &ChainFixture) -> anyhow::Result<()> {
        let dir = self.dir.path().join(chain.name());
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        chain.write_to(self.dir.path())?;
        Ok(())
    }

    pub fn add_file(&self, relative: &str, contents: &str) -> anyhow::Result<()> {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents).with_context(|| format!("writing {relative}"))?;
        Ok(())
    }

    pub fn remove_chain(&self, name: &str) -> anyhow::Result<()> {
        fs::remove_dir_all(self.dir.path().join(name))
            .with_context(|| format!("removing chain {name}"))?;
        Ok(())
    }

    /// Stages every change, including deletions, and commits it.
    pub fn commit(&self, message: &str) -> anyhow::Result<String> {
        let mut index = self.repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;

        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let sig = Signature::now("Registry Fixture", "fixtures@registry.invalid")?;

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(_) => None
        };
        let parents: Vec<_> = parent.iter().collect();

        let commit_id = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
        Ok(commit_id.to_string())
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_fixture_writes_documents() {
        let root = tempfile::tempdir().unwrap();
        let dir = ChainFixture::new("osmosis")
            .with_versions(sample_versions("osmosis"))
            .write_to(root.path())
            .unwrap();

        let chain: Value =
            serde_json::from_str(&fs::read_to_string(dir.join("chain.json")).unwrap()).unwrap();
        assert_eq!(chain["chain_id"], "osmosis-1");
        assert_eq!(chain["pretty_name"], "Osmosis");
        assert!(dir.join("assetlist.json").is_file());
        assert!(dir.join("versions.json").is_file());
    }

    #[test]
    fn test_without_assets_omits_file() {
        let root = tempfile::tempdir().unwrap();
        let dir = ChainFixture::new("juno").without_assets().write_to(root.path()).unwrap();
        assert!(dir.join("chain.json").is_file());
        assert!(!dir.join("assetlist.json").exists());
    }

    #[test]
    fn test_upstream_commits_advance_head() {
        let upstream = UpstreamRepo::with_chains(&[ChainFixture::new("akash")]).unwrap();
        let first = upstream.repo.head().unwrap().peel_to_commit().unwrap().id();

        upstream.remove_chain("akash").unwrap();
        let second = upstream.commit("Remove akash").unwrap();

        assert_ne!(first.to_string(), second);
        let tree = upstream.repo.head().unwrap().peel_to_tree().unwrap();
        assert!(tree.get_name("akash").is_none());
        assert!(tree.get_name("_template").is_some());
    }
}
