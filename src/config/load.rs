//! Environment-sourced settings loading
//!
//! Every knob is an environment variable with a default; a variable that is
//! set but unparsable is a startup error rather than a silent fallback.

use crate::config::types::{DelayBand, Settings};
use crate::config::validation::validate;
use crate::{ConfigError, ConfigResult};
use std::path::PathBuf;
use std::str::FromStr;

/// Loads settings from the process environment and validates them.
pub fn load_settings() -> ConfigResult<Settings> {
    let defaults = Settings::default();

    let settings = Settings {
        base_url: var_or("BASE_URL", defaults.base_url),
        listings_path: var_or("LISTINGS_PATH", defaults.listings_path),
        user_agent: var_or("USER_AGENT", defaults.user_agent),
        timeout_secs: parsed_var("REQUEST_TIMEOUT", defaults.timeout_secs)?,
        retries: parsed_var("REQUEST_RETRIES", defaults.retries)?,
        backoff: parsed_var("REQUEST_BACKOFF", defaults.backoff)?,
        data_dir: path_var("DATA_DIR", defaults.data_dir),
        financials_dir: path_var("FINANCIALS_DIR", defaults.financials_dir),
        http_state_path: path_var("HTTP_STATE_PATH", defaults.http_state_path),
        http_cache_dir: path_var("HTTP_CACHE_PATH", defaults.http_cache_dir),
        http_cache_expire_secs: parsed_var(
            "HTTP_CACHE_EXPIRE_SECONDS",
            defaults.http_cache_expire_secs,
        )?,
        retry_after_max_attempts: parsed_var(
            "RETRY_AFTER_MAX_ATTEMPTS",
            defaults.retry_after_max_attempts,
        )?,
        retry_after_floor_secs: parsed_var("RETRY_AFTER_FLOOR", defaults.retry_after_floor_secs)?,
        page_delay: DelayBand::new(
            parsed_var("PAGE_DELAY_LOW", defaults.page_delay.low)?,
            parsed_var("PAGE_DELAY_HIGH", defaults.page_delay.high)?,
        ),
        download_delay: DelayBand::new(
            parsed_var("DOWNLOAD_DELAY_LOW", defaults.download_delay.low)?,
            parsed_var("DOWNLOAD_DELAY_HIGH", defaults.download_delay.high)?,
        ),
    };

    validate(&settings)?;
    Ok(settings)
}

fn var_or(name: &str, default: String) -> String {
    std::env::var(name).unwrap_or(default)
}

fn path_var(name: &str, default: PathBuf) -> PathBuf {
    std::env::var(name).map(PathBuf::from).unwrap_or(default)
}

fn parsed_var<T: FromStr>(name: &str, default: T) -> ConfigResult<T> {
    match std::env::var(name) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidVar {
            name: name.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}
