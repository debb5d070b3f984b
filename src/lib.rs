//! MSE Harvester: a polite financial-report fetcher
//!
//! This crate crawls a stock-exchange listings page, follows each company's
//! navigation to its financials subpage, and downloads the linked PDF
//! reports. Repeated runs revalidate with ETag/Last-Modified conditional
//! requests instead of re-downloading unchanged content, and every network
//! round-trip is paced to stay within the origin's tolerance.

pub mod config;
pub mod crawler;
pub mod http;
pub mod output;
pub mod paths;
pub mod robots;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the HTTP fetch engine
#[derive(Debug, Error)]
pub enum FetchError {
    /// All retries exhausted, or the origin answered with a non-retryable
    /// status (anything outside 2xx other than 304, which callers resolve
    /// against the local byte cache).
    #[error("Request failed for {url}: HTTP {status}")]
    RequestFailed { url: String, status: u16 },

    #[error("Transport error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    /// Conditional-state or byte-cache write failure. Never swallowed:
    /// partial state is worse than a failed request.
    #[error("Persistence error: {0}")]
    Persistence(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment value for {name}: {value}")]
    InvalidVar { name: String, value: String },

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for fetch operations
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Settings;
pub use crawler::{CompanyOutcome, Harvester, SkipReason};
pub use http::FetchEngine;
pub use robots::RobotsPolicy;
pub use state::ConditionalStore;
