//! Shared test fixtures for the registry workspace.
//!
//! Provides on-disk chain registry trees and throwaway git upstreams:
//! - [`ChainFixture`] writes one chain directory (`chain.json`, `assetlist.json`, optional `versions.json`)
//! - [`UpstreamRepo`] is a temporary git repository that sync tests clone from
//!
//! Fixtures live in temporary directories and are removed when dropped.

mod fixtures;

pub use fixtures::*;
