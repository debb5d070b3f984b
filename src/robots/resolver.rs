//! Robots policy resolution
//!
//! The policy is computed once at startup from `<base_url>/robots.txt` and
//! is immutable for the process lifetime. Every failure mode degrades to
//! allow-all with no crawl delay: a site we cannot read robots rules for is
//! still crawled, just at the configured pace.

use crate::http::{FetchEngine, FetchOptions};
use crate::robots::parser::RobotsRules;
use std::time::Duration;
use url::Url;

/// The active robots policy for the origin.
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    rules: Option<RobotsRules>,
    user_agent: String,
    crawl_delay: Option<Duration>,
}

impl RobotsPolicy {
    /// Permissive policy used when robots.txt is unavailable.
    pub fn allow_all(user_agent: &str) -> Self {
        Self {
            rules: None,
            user_agent: user_agent.to_string(),
            crawl_delay: None,
        }
    }

    pub fn from_rules(rules: RobotsRules, user_agent: &str) -> Self {
        let crawl_delay = rules
            .crawl_delay(user_agent)
            .map(Duration::from_secs_f64);
        Self {
            rules: Some(rules),
            user_agent: user_agent.to_string(),
            crawl_delay,
        }
    }

    /// Fetches and parses the origin's robots.txt, once per process.
    ///
    /// The request is unconditional and bypasses the response cache; robots
    /// rules should reflect the origin right now, not a cached view.
    pub async fn resolve(engine: &FetchEngine, base_url: &Url, user_agent: &str) -> Self {
        let robots_url = match base_url.join("robots.txt") {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Cannot derive robots.txt URL from {}: {}", base_url, e);
                return Self::allow_all(user_agent);
            }
        };

        let opts = FetchOptions::get().unconditional().uncacheable();
        match engine.fetch(&robots_url, &opts).await {
            Ok(response) if response.status == 200 => {
                let policy = Self::from_rules(RobotsRules::from_content(&response.text()), user_agent);
                if let Some(delay) = policy.crawl_delay {
                    tracing::info!("robots.txt declares crawl-delay of {:?}", delay);
                }
                policy
            }
            Ok(response) => {
                tracing::warn!(
                    "robots.txt at {} answered HTTP {}; proceeding with allow-all",
                    robots_url,
                    response.status
                );
                Self::allow_all(user_agent)
            }
            Err(e) => {
                tracing::warn!(
                    "Unable to load robots.txt from {}: {}; proceeding with allow-all",
                    robots_url,
                    e
                );
                Self::allow_all(user_agent)
            }
        }
    }

    /// Whether the policy permits fetching a URL. Fail-open: an absent or
    /// unevaluable rule set never blocks a crawl.
    pub fn allow(&self, url: &Url) -> bool {
        match &self.rules {
            Some(rules) => rules.is_allowed(&self.user_agent, url.as_str()),
            None => true,
        }
    }

    /// The crawl-delay floor applied to every jittered wait (zero if the
    /// origin declares none).
    pub fn crawl_delay_floor(&self) -> Duration {
        self.crawl_delay.unwrap_or(Duration::ZERO)
    }
}
