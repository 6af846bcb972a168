//! Persistent cache of compiled route matchers
//!
//! The cache file holds the regex source and placeholder names of every route,
//! keyed by the route table fingerprint. A file whose fingerprint does not
//! match the table being built is discarded and rewritten.
//!
//! ```json
//! {
//!   "fingerprint": "9f2c…",
//!   "routes": [
//!     { "pattern": "/users/{id:numeric}", "regex": "^/users/([0-9]+)$", "params": ["id"] }
//!   ]
//! }
//! ```

use crate::Error;
use crate::routing::RouteTable;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One cached matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedMatcher {
    pub pattern: String,
    pub regex: String,
    pub params: Vec<String>,
}

/// On-disk layout of the cache file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub fingerprint: String,
    pub routes: Vec<CachedMatcher>,
}

impl CacheSnapshot {
    pub fn from_table(table: &RouteTable) -> Self {
        Self {
            fingerprint: table.fingerprint(),
            routes: table
                .routes()
                .iter()
                .map(|route| CachedMatcher {
                    pattern: route.pattern().as_str().to_string(),
                    regex: route.compiled().as_str().to_string(),
                    params: route.compiled().params().to_vec(),
                })
                .collect(),
        }
    }
}

/// A JSON route cache file.
#[derive(Debug, Clone)]
pub struct RouteCache {
    path: PathBuf,
}

impl RouteCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load cached matchers for `fingerprint`.
    ///
    /// Returns `None` when the file is absent, unreadable as a snapshot, or was
    /// written for a different table. The latter two are removed.
    pub fn load(&self, fingerprint: &str) -> Result<Option<Vec<CachedMatcher>>, Error> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No route cache present");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot: CacheSnapshot = match serde_json::from_slice(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Discarding unreadable route cache");
                self.clear()?;
                return Ok(None);
            }
        };

        if snapshot.fingerprint != fingerprint {
            warn!(
                path = %self.path.display(),
                cached = %snapshot.fingerprint,
                expected = fingerprint,
                "Route cache fingerprint mismatch, discarding"
            );
            self.clear()?;
            return Ok(None);
        }

        debug!(path = %self.path.display(), routes = snapshot.routes.len(), "Route cache hit");
        Ok(Some(snapshot.routes))
    }

    /// Write the matchers of `table`, replacing any existing file.
    pub fn store(&self, table: &RouteTable) -> Result<(), Error> {
        let snapshot = CacheSnapshot::from_table(table);
        let json = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| Error::RouteCache(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, json)?;

        debug!(path = %self.path.display(), routes = snapshot.routes.len(), "Route cache written");
        Ok(())
    }

    /// Remove the cache file if present.
    pub fn clear(&self) -> Result<(), Error> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
