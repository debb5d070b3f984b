use std::path::PathBuf;

/// A jitter band: delays are drawn uniformly from `[low, high]` seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayBand {
    pub low: f64,
    pub high: f64,
}

impl DelayBand {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }
}

/// Runtime settings, sourced from the environment.
///
/// Every field has a default suitable for the production origin; tests build
/// a `Settings::default()` and override what they need.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Origin base URL (`BASE_URL`)
    pub base_url: String,

    /// Listings page path relative to the base URL (`LISTINGS_PATH`)
    pub listings_path: String,

    /// User-agent presented to the origin and matched against robots.txt
    /// (`USER_AGENT`)
    pub user_agent: String,

    /// Per-request timeout in seconds (`REQUEST_TIMEOUT`)
    pub timeout_secs: u64,

    /// Maximum transport-level retries for transient failures
    /// (`REQUEST_RETRIES`)
    pub retries: u32,

    /// Exponential backoff multiplier in seconds (`REQUEST_BACKOFF`)
    pub backoff: f64,

    /// Root data directory (`DATA_DIR`)
    pub data_dir: PathBuf,

    /// Directory receiving per-company PDF trees (`FINANCIALS_DIR`)
    pub financials_dir: PathBuf,

    /// Conditional-state JSON file (`HTTP_STATE_PATH`)
    pub http_state_path: PathBuf,

    /// HTTP-layer response cache directory (`HTTP_CACHE_PATH`)
    pub http_cache_dir: PathBuf,

    /// Response cache expiry window in seconds (`HTTP_CACHE_EXPIRE_SECONDS`)
    pub http_cache_expire_secs: u64,

    /// Bound on Retry-After-driven re-issues (`RETRY_AFTER_MAX_ATTEMPTS`)
    pub retry_after_max_attempts: u32,

    /// Minimum sleep when honoring Retry-After, in seconds
    /// (`RETRY_AFTER_FLOOR`)
    pub retry_after_floor_secs: f64,

    /// Jitter band between page fetches, human-navigation pace
    /// (`PAGE_DELAY_LOW`/`PAGE_DELAY_HIGH`)
    pub page_delay: DelayBand,

    /// Jitter band between binary downloads
    /// (`DOWNLOAD_DELAY_LOW`/`DOWNLOAD_DELAY_HIGH`)
    pub download_delay: DelayBand,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "https://mse.co.mw/".to_string(),
            listings_path: "market/mainboard".to_string(),
            user_agent: "MSEHarvester/1.0".to_string(),
            timeout_secs: 20,
            retries: 3,
            backoff: 1.5,
            data_dir: PathBuf::from("./data"),
            financials_dir: PathBuf::from("./data/financials"),
            http_state_path: PathBuf::from("./data/http_state.json"),
            http_cache_dir: PathBuf::from("./data/http_cache"),
            http_cache_expire_secs: 3 * 3600,
            retry_after_max_attempts: 3,
            retry_after_floor_secs: 1.0,
            page_delay: DelayBand::new(8.0, 15.0),
            download_delay: DelayBand::new(5.0, 12.0),
        }
    }
}

impl Settings {
    /// Resolves the absolute listings URL from the base URL and path.
    pub fn listings_url(&self) -> Result<url::Url, url::ParseError> {
        url::Url::parse(&self.base_url)?.join(&self.listings_path)
    }

    /// Directory holding the byte/HTML fallback cache.
    pub fn html_cache_dir(&self) -> PathBuf {
        self.data_dir.join("html-cache")
    }
}
