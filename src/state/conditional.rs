//! Persisted conditional-request state
//!
//! For every URL that ever answered with an ETag or Last-Modified validator,
//! the store remembers those validators across runs so the next request can
//! be conditional and the origin can answer 304 instead of resending bytes.
//!
//! The store is a single JSON object mapping URL -> record, rewritten in
//! full (sorted keys, indented) through a temp file + rename on every
//! mutation, so an interrupted run never leaves a half-written state file.

use reqwest::header::{HeaderMap, HeaderValue, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Validators recorded for a single URL.
///
/// A record with neither field is never stored; `update` prunes instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

impl ConditionalRecord {
    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }
}

type RecordMap = BTreeMap<String, ConditionalRecord>;

/// Process-wide conditional-state store.
///
/// All mutation is serialized through one lock; the in-memory map is loaded
/// lazily exactly once and is the source of truth thereafter.
pub struct ConditionalStore {
    path: PathBuf,
    records: Mutex<Option<RecordMap>>,
}

impl ConditionalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Mutex::new(None),
        }
    }

    /// Returns the stored validators for a URL, or an empty record.
    pub fn get(&self, url: &str) -> ConditionalRecord {
        let mut guard = self.lock();
        self.loaded(&mut guard).get(url).cloned().unwrap_or_default()
    }

    /// Builds `If-None-Match`/`If-Modified-Since` headers for a URL.
    ///
    /// URLs never seen before (or seen without validators) yield an empty
    /// map.
    pub fn prepare_headers(&self, url: &str) -> HeaderMap {
        let record = self.get(url);
        let mut headers = HeaderMap::new();
        if let Some(value) = record.etag.as_deref().and_then(valid_header_value) {
            headers.insert(IF_NONE_MATCH, value);
        }
        if let Some(value) = record.last_modified.as_deref().and_then(valid_header_value) {
            headers.insert(IF_MODIFIED_SINCE, value);
        }
        headers
    }

    /// Records the validators carried by a 200 response.
    ///
    /// A response with neither ETag nor Last-Modified is a no-op: an
    /// existing record is left untouched, never cleared.
    pub fn update(&self, url: &str, response_headers: &HeaderMap) -> io::Result<()> {
        let record = ConditionalRecord {
            etag: header_string(response_headers, ETAG.as_str()),
            last_modified: header_string(response_headers, LAST_MODIFIED.as_str()),
        };
        if record.is_empty() {
            return Ok(());
        }

        let mut guard = self.lock();
        self.loaded(&mut guard).insert(url.to_string(), record);
        self.persist(&mut guard)
    }

    /// Removes any record for the URL and persists.
    pub fn clear(&self, url: &str) -> io::Result<()> {
        let mut guard = self.lock();
        if self.loaded(&mut guard).remove(url).is_none() {
            return Ok(());
        }
        self.persist(&mut guard)
    }

    fn lock(&self) -> MutexGuard<'_, Option<RecordMap>> {
        // A poisoned lock means a panic mid-mutation; the persisted file is
        // still whole, so recover the map rather than propagating.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn loaded<'a>(&self, guard: &'a mut MutexGuard<'_, Option<RecordMap>>) -> &'a mut RecordMap {
        guard.get_or_insert_with(|| load_records(&self.path))
    }

    fn persist(&self, guard: &mut MutexGuard<'_, Option<RecordMap>>) -> io::Result<()> {
        let records = self.loaded(guard);
        let json = serde_json::to_vec_pretty(&records)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // Full rewrite through a sibling temp file; rename keeps readers
        // from ever observing a truncated store.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Reads the persisted store; corrupt or unreadable files are treated as an
/// empty store, never as a fatal error.
fn load_records(path: &Path) -> RecordMap {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return RecordMap::new(),
        Err(e) => {
            tracing::warn!("Unreadable conditional-state file {}: {}", path.display(), e);
            return RecordMap::new();
        }
    };

    match serde_json::from_str::<RecordMap>(&content) {
        Ok(mut records) => {
            // Prune any empty records a hand-edited file might carry
            records.retain(|_, record| !record.is_empty());
            records
        }
        Err(e) => {
            tracing::warn!("Corrupt conditional-state file {}: {}", path.display(), e);
            RecordMap::new()
        }
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

fn valid_header_value(value: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(value).ok()
}
