//! robots.txt compliance
//!
//! Loaded once per process; governs both `allow(url)` and the crawl-delay
//! floor for the whole run.

mod parser;
mod resolver;

pub use parser::RobotsRules;
pub use resolver::RobotsPolicy;
