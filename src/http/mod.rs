//! HTTP fetch layer
//!
//! The fetch engine is the core of this crate: connection reuse, bounded
//! retry with backoff, Retry-After handling, conditional revalidation, and
//! 304 reconciliation against the local byte cache.

mod cache;
mod engine;

pub use cache::{CachedResponse, DiskCache, NoopCache, ResponseCache};
pub use engine::{FetchEngine, FetchOptions, FetchResponse, FetchedPage, HttpConfig};
