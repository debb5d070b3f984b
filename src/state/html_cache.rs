//! Byte/HTML fallback cache
//!
//! Raw page text keyed by a stable hash of the URL, one file per distinct
//! URL. This is the read-through source for resolving 304 responses: the
//! origin confirms "unchanged", and the body comes from here instead of the
//! wire.

use sha2::{Digest, Sha256};
use std::io;
use std::path::PathBuf;

pub struct HtmlCache {
    dir: PathBuf,
}

impl HtmlCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Content-addressed path for a URL's cache entry.
    pub fn path_for(&self, url: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        self.dir.join(format!("{}.html", hex::encode(hasher.finalize())))
    }

    /// Overwrites the entry for a URL with freshly fetched text.
    pub fn store(&self, url: &str, text: &str) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(url), text)
    }

    /// Loads the cached body for a URL, if one exists and is readable.
    pub fn load(&self, url: &str) -> Option<String> {
        match std::fs::read_to_string(self.path_for(url)) {
            Ok(text) => Some(text),
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!("Unreadable html-cache entry for {}: {}", url, e);
                }
                None
            }
        }
    }
}
