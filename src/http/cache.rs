//! Optional HTTP-layer response cache
//!
//! Modeled as a capability trait so the engine never hard-depends on a cache
//! being present: `DiskCache` memoizes successful GET responses on disk with
//! an expiry window, `NoopCache` is the fallback. Cache I/O failures degrade
//! to cache misses; they never fail a fetch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::Duration;

/// A cached response entry, keyed by request signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: DateTime<Utc>,
}

pub trait ResponseCache: Send + Sync {
    /// Returns a fresh entry for the request signature, if any.
    fn lookup(&self, method: &str, url: &str) -> Option<CachedResponse>;

    /// Stores a successful response. Best-effort.
    fn store(&self, method: &str, url: &str, response: &CachedResponse);
}

/// Cache that never hits; selected when no cache directory is configured.
pub struct NoopCache;

impl ResponseCache for NoopCache {
    fn lookup(&self, _method: &str, _url: &str) -> Option<CachedResponse> {
        None
    }

    fn store(&self, _method: &str, _url: &str, _response: &CachedResponse) {}
}

/// On-disk response cache with a configurable expiry window.
pub struct DiskCache {
    dir: PathBuf,
    max_age: Duration,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self {
            dir: dir.into(),
            max_age,
        }
    }

    fn entry_path(&self, method: &str, url: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(method.as_bytes());
        hasher.update(b" ");
        hasher.update(url.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(hasher.finalize())))
    }
}

impl ResponseCache for DiskCache {
    fn lookup(&self, method: &str, url: &str) -> Option<CachedResponse> {
        let path = self.entry_path(method, url);
        let content = std::fs::read_to_string(&path).ok()?;
        let entry: CachedResponse = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Corrupt response-cache entry {}: {}", path.display(), e);
                let _ = std::fs::remove_file(&path);
                return None;
            }
        };

        let age = Utc::now().signed_duration_since(entry.stored_at);
        if age.to_std().map(|a| a <= self.max_age).unwrap_or(false) {
            Some(entry)
        } else {
            let _ = std::fs::remove_file(&path);
            None
        }
    }

    fn store(&self, method: &str, url: &str, response: &CachedResponse) {
        if let Err(e) = std::fs::create_dir_all(&self.dir).and_then(|_| {
            let json = serde_json::to_vec(response)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            std::fs::write(self.entry_path(method, url), json)
        }) {
            tracing::warn!("Failed to store response-cache entry for {}: {}", url, e);
        }
    }
}
