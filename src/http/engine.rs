//! HTTP fetch engine
//!
//! One logical GET/HEAD against a target URL, with:
//! - a process-wide connection pool, created lazily on first use;
//! - bounded transport retry with capped exponential backoff for network
//!   failures and 5xx responses (idempotent methods only);
//! - a separate bounded Retry-After loop for 429/503;
//! - conditional revalidation headers from the persisted state store;
//! - 304 reconciliation against the local byte/HTML cache;
//! - an optional HTTP-layer response cache, bypassable per request.

use crate::config::Settings;
use crate::http::cache::{CachedResponse, ResponseCache};
use crate::state::{ConditionalStore, HtmlCache};
use crate::{FetchError, FetchResult};
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Transport maximum when backing off; retries never sleep longer than this.
const BACKOFF_CAP_SECS: f64 = 60.0;

/// Statuses retried at the transport level.
const RETRYABLE_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Engine knobs, derived from [`Settings`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub retries: u32,
    pub backoff: f64,
    pub retry_after_max_attempts: u32,
    pub retry_after_floor: Duration,
}

impl From<&Settings> for HttpConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            user_agent: settings.user_agent.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
            retries: settings.retries,
            backoff: settings.backoff,
            retry_after_max_attempts: settings.retry_after_max_attempts,
            retry_after_floor: Duration::from_secs_f64(settings.retry_after_floor_secs),
        }
    }
}

/// Per-call fetch options.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub method: Method,
    /// Attach stored validators (GET/HEAD only).
    pub conditional: bool,
    /// Consult/populate the HTTP-layer response cache. `false` bypasses the
    /// cache for this one request without disabling it process-wide.
    pub cacheable: bool,
    /// Per-request timeout override.
    pub timeout: Option<Duration>,
}

impl FetchOptions {
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            conditional: true,
            cacheable: true,
            timeout: None,
        }
    }

    pub fn head() -> Self {
        Self {
            method: Method::HEAD,
            ..Self::get()
        }
    }

    pub fn unconditional(mut self) -> Self {
        self.conditional = false;
        self
    }

    pub fn uncacheable(mut self) -> Self {
        self.cacheable = false;
        self
    }
}

/// Outcome of a single logical fetch. Transient; consumed immediately.
#[derive(Debug)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    /// Served from the HTTP-layer response cache; no origin round-trip.
    pub from_cache: bool,
}

impl FetchResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_not_modified(&self) -> bool {
        self.status == StatusCode::NOT_MODIFIED.as_u16()
    }
}

/// A page body with provenance, produced by [`FetchEngine::fetch_page`].
#[derive(Debug)]
pub struct FetchedPage {
    pub text: String,
    /// Whether the origin server was actually contacted. Cache hits do not
    /// count against the pacing budget.
    pub origin_touched: bool,
}

/// The core fetch engine. One instance per process; holds the connection
/// pool, the conditional-state store, and both cache layers.
pub struct FetchEngine {
    client: OnceCell<Client>,
    cfg: HttpConfig,
    state: Arc<ConditionalStore>,
    html_cache: HtmlCache,
    response_cache: Box<dyn ResponseCache>,
}

impl FetchEngine {
    pub fn new(
        cfg: HttpConfig,
        state: Arc<ConditionalStore>,
        html_cache: HtmlCache,
        response_cache: Box<dyn ResponseCache>,
    ) -> Self {
        Self {
            client: OnceCell::new(),
            cfg,
            state,
            html_cache,
            response_cache,
        }
    }

    /// The shared connection pool, built on first use.
    async fn client(&self) -> FetchResult<&Client> {
        self.client
            .get_or_try_init(|| async {
                Client::builder()
                    .user_agent(self.cfg.user_agent.clone())
                    .timeout(self.cfg.timeout)
                    .connect_timeout(Duration::from_secs(10))
                    .gzip(true)
                    .brotli(true)
                    .build()
            })
            .await
            .map_err(FetchError::from)
    }

    /// Performs one logical fetch per the engine state machine.
    ///
    /// Returns `Ok` for 2xx and 304 responses; everything else (after the
    /// bounded retry loops) surfaces as [`FetchError::RequestFailed`] with
    /// the final status.
    pub async fn fetch(&self, url: &url::Url, opts: &FetchOptions) -> FetchResult<FetchResponse> {
        let idempotent = opts.method == Method::GET || opts.method == Method::HEAD;

        if opts.cacheable && opts.method == Method::GET {
            if let Some(hit) = self.response_cache.lookup(opts.method.as_str(), url.as_str()) {
                tracing::debug!("Response-cache hit for {}", url);
                return Ok(FetchResponse {
                    status: hit.status,
                    headers: rebuild_headers(&hit.headers),
                    body: hit.body,
                    from_cache: true,
                });
            }
        }

        let client = self.client().await?;
        let conditional_headers = if opts.conditional && idempotent {
            self.state.prepare_headers(url.as_str())
        } else {
            HeaderMap::new()
        };

        let mut transport_attempts: u32 = 0;
        let mut rate_limit_attempts: u32 = 0;

        let response = loop {
            let mut request = client
                .request(opts.method.clone(), url.clone())
                .headers(conditional_headers.clone());
            if let Some(timeout) = opts.timeout {
                request = request.timeout(timeout);
            }

            match request.send().await {
                Err(e) => {
                    if idempotent && transport_attempts < self.cfg.retries {
                        let delay = self.backoff_delay(transport_attempts);
                        tracing::debug!(
                            "Transport failure for {} (attempt {}): {}; retrying in {:?}",
                            url,
                            transport_attempts + 1,
                            e,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        transport_attempts += 1;
                        continue;
                    }
                    return Err(if e.is_timeout() {
                        FetchError::Timeout {
                            url: url.to_string(),
                        }
                    } else {
                        FetchError::Transport {
                            url: url.to_string(),
                            source: e,
                        }
                    });
                }
                Ok(resp) => {
                    let status = resp.status().as_u16();

                    // Rate-limit handling comes first: a 503 carrying
                    // Retry-After is the server telling us exactly how long
                    // to stay away.
                    if status == 429 || status == 503 {
                        if let Some(delay) = retry_after_delay(resp.headers()) {
                            if rate_limit_attempts < self.cfg.retry_after_max_attempts {
                                let sleep_for = delay.max(self.cfg.retry_after_floor);
                                tracing::info!(
                                    "HTTP {} from {}; honoring Retry-After, sleeping {:?}",
                                    status,
                                    url,
                                    sleep_for
                                );
                                tokio::time::sleep(sleep_for).await;
                                rate_limit_attempts += 1;
                                continue;
                            }
                        }
                    }

                    if RETRYABLE_STATUSES.contains(&status)
                        && idempotent
                        && transport_attempts < self.cfg.retries
                    {
                        let delay = self.backoff_delay(transport_attempts);
                        tracing::debug!(
                            "HTTP {} from {} (attempt {}); retrying in {:?}",
                            status,
                            url,
                            transport_attempts + 1,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        transport_attempts += 1;
                        continue;
                    }

                    break resp;
                }
            }
        };

        let status = response.status();
        let headers = response.headers().clone();

        // Any 200 to an idempotent method refreshes the stored validators,
        // including the unconditional re-fetch after a 304 cache miss.
        if status == StatusCode::OK && idempotent {
            self.state.update(url.as_str(), &headers)?;
        }

        if !status.is_success() && status != StatusCode::NOT_MODIFIED {
            return Err(FetchError::RequestFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = if opts.method == Method::HEAD {
            Vec::new()
        } else {
            response
                .bytes()
                .await
                .map_err(|e| FetchError::Transport {
                    url: url.to_string(),
                    source: e,
                })?
                .to_vec()
        };

        if status == StatusCode::OK && opts.cacheable && opts.method == Method::GET {
            self.response_cache.store(
                opts.method.as_str(),
                url.as_str(),
                &CachedResponse {
                    status: status.as_u16(),
                    headers: flatten_headers(&headers),
                    body: body.clone(),
                    stored_at: Utc::now(),
                },
            );
        }

        Ok(FetchResponse {
            status: status.as_u16(),
            headers,
            body,
            from_cache: false,
        })
    }

    /// Fetches a page body with full 304 reconciliation.
    ///
    /// A 304 resolves read-through from the byte/HTML cache; with no entry
    /// there, exactly one unconditional re-fetch refreshes both the cache
    /// and the conditional state as if it were a fresh fetch.
    pub async fn fetch_page(&self, url: &url::Url) -> FetchResult<FetchedPage> {
        let response = self.fetch(url, &FetchOptions::get()).await?;

        if response.is_not_modified() {
            if let Some(text) = self.html_cache.load(url.as_str()) {
                tracing::debug!("304 for {}; serving byte-cache entry", url);
                return Ok(FetchedPage {
                    text,
                    origin_touched: !response.from_cache,
                });
            }

            tracing::debug!("304 for {} with no byte-cache entry; re-fetching", url);
            let fresh = self
                .fetch(url, &FetchOptions::get().unconditional())
                .await?;
            let text = fresh.text();
            self.html_cache.store(url.as_str(), &text)?;
            return Ok(FetchedPage {
                text,
                origin_touched: true,
            });
        }

        let text = response.text();
        self.html_cache.store(url.as_str(), &text)?;
        Ok(FetchedPage {
            text,
            origin_touched: !response.from_cache,
        })
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let secs = (self.cfg.backoff * 2f64.powi(attempt as i32)).min(BACKOFF_CAP_SECS);
        Duration::from_secs_f64(secs.max(0.0))
    }
}

/// Parses a `Retry-After` header into a delay.
///
/// Both forms are accepted: delta-seconds, and an HTTP-date converted to a
/// non-negative offset from now. Unparsable values yield `None` (the caller
/// falls through to normal status handling).
fn retry_after_delay(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if value.is_empty() {
        return None;
    }

    if value.chars().all(|c| c.is_ascii_digit()) {
        return value.parse::<u64>().ok().map(Duration::from_secs);
    }

    let date = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    let delta = date.signed_duration_since(Utc::now());
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}

fn flatten_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

fn rebuild_headers(pairs: &[(String, String)]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.insert(name, value);
        }
    }
    headers
}
