//! robots.txt rules
//!
//! Permission checks go through the robotstxt crate's matcher; Crawl-delay
//! is not part of the original Google spec, so it is parsed here by hand.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt content for one origin.
#[derive(Debug, Clone)]
pub struct RobotsRules {
    content: String,
}

impl RobotsRules {
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Checks whether a URL is allowed for the given user agent.
    ///
    /// Empty content allows everything.
    pub fn is_allowed(&self, user_agent: &str, url: &str) -> bool {
        if self.content.is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Extracts the crawl delay for a user agent.
    ///
    /// The delay declared for the exact agent group wins over the wildcard
    /// (`*`) group. Negative or unparsable values are normalized to no
    /// delay.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        let target = user_agent.to_lowercase();

        let mut group: Vec<String> = Vec::new();
        let mut last_was_agent = false;
        let mut exact: Option<f64> = None;
        let mut wildcard: Option<f64> = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    // Consecutive User-agent lines form one group; a
                    // User-agent line after any other directive starts a
                    // new group.
                    if !last_was_agent {
                        group.clear();
                    }
                    group.push(value.to_lowercase());
                    last_was_agent = true;
                }
                "crawl-delay" => {
                    last_was_agent = false;
                    let delay = value
                        .parse::<f64>()
                        .ok()
                        .filter(|d| d.is_finite() && *d >= 0.0);
                    if let Some(delay) = delay {
                        if group.iter().any(|a| a != "*" && target.contains(a.as_str())) {
                            exact = Some(delay);
                        }
                        if group.iter().any(|a| a == "*") {
                            wildcard = Some(delay);
                        }
                    }
                }
                _ => {
                    last_was_agent = false;
                }
            }
        }

        exact.or(wildcard)
    }
}
