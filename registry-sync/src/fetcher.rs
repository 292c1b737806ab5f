//! Retrieval of the upstream registry tree into the staging directory.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::RegistryConfig;
use crate::error::{RegistryError, RegistryResult};

/// libgit2 socket limits; a stalled connection fails instead of blocking its
/// thread forever.
const SERVER_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const SERVER_READ_TIMEOUT: Duration = Duration::from_secs(120);

static SOCKET_TIMEOUTS: Once = Once::new();

/// What a successful fetch produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedTree {
    /// Commit the staged tree was checked out at, when known.
    pub revision: Option<String>
}

/// Source of the upstream registry tree.
///
/// Implementations write a complete copy of the tree to `dest` or fail; a
/// partially written `dest` after an error is discarded by the caller.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, dest: &Path) -> RegistryResult<FetchedTree>;

    /// Human-readable upstream location for logs.
    fn source(&self) -> &str;
}

/// Clones the upstream git repository with libgit2.
#[derive(Debug, Clone)]
pub struct GitFetcher {
    url: String,
    branch: Option<String>,
    shallow: bool,
    timeout: Duration
}

impl GitFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            branch: None,
            shallow: true,
            timeout: Duration::from_secs(600)
        }
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        Self {
            url: config.repository_url.clone(),
            branch: config.branch.clone(),
            shallow: config.shallow,
            timeout: config.fetch_timeout()
        }
    }

    #[must_use]
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    #[must_use]
    pub fn with_shallow(mut self, shallow: bool) -> Self {
        self.shallow = shallow;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl SourceFetcher for GitFetcher {
    async fn fetch(&self, dest: &Path) -> RegistryResult<FetchedTree> {
        tracing::info!(url = %self.url, dest = %dest.display(), "Cloning registry repository");

        let cancel = Arc::new(AtomicBool::new(false));
        let mut task = tokio::task::spawn_blocking({
            let url = self.url.clone();
            let branch = self.branch.clone();
            let shallow = self.shallow;
            let dest = dest.to_path_buf();
            let cancel = cancel.clone();
            move || clone_repository(&url, branch.as_deref(), shallow, &dest, &cancel)
        });

        match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(joined) => joined.map_err(|e| RegistryError::FetchFailed {
                url: self.url.clone(),
                reason: format!("clone task failed: {e}")
            })?,
            Err(_) => {
                cancel.store(true, Ordering::Relaxed);
                tracing::warn!(
                    url = %self.url,
                    timeout_secs = self.timeout.as_secs(),
                    "Clone timed out, abandoning it"
                );
                // `dest` is unique to this run; the clone may keep writing there.
                let url = self.url.clone();
                tokio::spawn(async move {
                    match task.await {
                        Ok(Ok(_)) => tracing::debug!(url = %url, "Abandoned clone finished"),
                        Ok(Err(e)) => tracing::debug!(url = %url, error = %e, "Abandoned clone stopped"),
                        Err(e) => tracing::warn!(url = %url, error = %e, "Abandoned clone task failed")
                    }
                });
                Err(RegistryError::FetchTimeout {
                    timeout_secs: self.timeout.as_secs()
                })
            }
        }
    }

    fn source(&self) -> &str {
        &self.url
    }
}

fn clone_repository(
    url: &str,
    branch: Option<&str>,
    shallow: bool,
    dest: &Path,
    cancel: &AtomicBool
) -> RegistryResult<FetchedTree> {
    let fetch_failed = |e: git2::Error| RegistryError::FetchFailed {
        url: url.to_string(),
        reason: e.message().to_string()
    };

    set_socket_timeouts();

    let mut callbacks = git2::RemoteCallbacks::new();
    callbacks.transfer_progress(|_progress| !cancel.load(Ordering::Relaxed));

    let mut fetch_options = git2::FetchOptions::new();
    fetch_options.remote_callbacks(callbacks);
    if shallow {
        fetch_options.depth(1);
    }

    let mut builder = git2::build::RepoBuilder::new();
    builder.fetch_options(fetch_options);
    if let Some(branch) = branch {
        builder.branch(branch);
    }

    let repo = builder.clone(url, dest).map_err(fetch_failed)?;
    let revision = repo
        .head()
        .ok()
        .and_then(|head| head.peel_to_commit().ok())
        .map(|commit| commit.id().to_string());

    tracing::info!(url = %url, revision = ?revision, "Clone completed");
    Ok(FetchedTree { revision })
}

fn set_socket_timeouts() {
    SOCKET_TIMEOUTS.call_once(|| {
        let millis = |d: Duration| i32::try_from(d.as_millis()).unwrap_or(i32::MAX);
        // SAFETY: writes libgit2's global socket options exactly once, before
        // this process starts its first clone.
        let result = unsafe {
            git2::opts::set_server_connect_timeout_in_milliseconds(millis(SERVER_CONNECT_TIMEOUT))
                .and_then(|()| git2::opts::set_server_timeout_in_milliseconds(millis(SERVER_READ_TIMEOUT)))
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to set libgit2 socket timeouts");
        }
    });
}
