//! The resolver oracle collaborator: narrow interface an embedder implements
//! to map accessions to local/remote locations and to supply cache paths.
//! Deliberately out of scope for this crate (§1) — only the trait boundary
//! and an in-memory test double live here.

use crate::error::ResolveError;
use vfs_path::Path;

/// Remote protocol the facade asks the oracle to resolve against. Only
/// `Http` is produced by [`crate::resolve_path`] today; the enum exists so
/// oracle implementations have a stable match target as more are added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
}

/// External collaborator that maps accessions to `Local`/`Remote` paths and
/// issues cache locations for remote reads (§4.3, §9.1).
pub trait ResolverOracle {
    /// Returns a local Path for `path`, or `None` if no local copy exists
    /// (the facade's one recovered-from "not found" case).
    fn local(&self, path: &Path) -> Result<Option<Path>, ResolveError>;

    /// Returns a remote Path for `path` over `protocol`, or `None` if the
    /// oracle has no remote location either.
    fn remote(&self, path: &Path, protocol: Protocol) -> Result<Option<Path>, ResolveError>;

    /// Returns a local cache file location to tee remote reads into, if the
    /// oracle wants caching for this path.
    fn cache(&self, path: &Path) -> Result<Option<Path>, ResolveError>;
}

/// An in-memory [`ResolverOracle`] double for tests: exercises the open
/// pipeline and the facade without a real network/filesystem collaborator.
pub mod testing {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    pub struct InMemoryOracle {
        local: HashMap<String, String>,
        remote: HashMap<String, String>,
        cache: HashMap<String, String>,
    }

    impl InMemoryOracle {
        pub fn set_local(&mut self, key: &str, path: &str) {
            self.local.insert(key.to_string(), path.to_string());
        }

        pub fn set_remote(&mut self, key: &str, path: &str) {
            self.remote.insert(key.to_string(), path.to_string());
        }

        pub fn set_cache(&mut self, key: &str, path: &str) {
            self.cache.insert(key.to_string(), path.to_string());
        }
    }

    impl ResolverOracle for InMemoryOracle {
        fn local(&self, path: &Path) -> Result<Option<Path>, ResolveError> {
            match self.local.get(path.path()) {
                Some(p) => Ok(Some(Path::parse(p)?)),
                None => Ok(None),
            }
        }

        fn remote(&self, path: &Path, _protocol: Protocol) -> Result<Option<Path>, ResolveError> {
            match self.remote.get(path.path()) {
                Some(p) => Ok(Some(Path::parse(p)?)),
                None => Ok(None),
            }
        }

        fn cache(&self, path: &Path) -> Result<Option<Path>, ResolveError> {
            let key = if self.cache.contains_key(path.path()) {
                path.path().to_string()
            } else {
                path.to_canonical_string()
            };
            match self.cache.get(&key) {
                Some(p) => Ok(Some(Path::parse(p)?)),
                None => Ok(None),
            }
        }
    }
}
