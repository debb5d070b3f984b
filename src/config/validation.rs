use crate::config::types::{DelayBand, Settings};
use crate::ConfigError;
use url::Url;

/// Validates the entire settings object.
///
/// Configuration errors are the only fatal startup errors in this crate
/// (everything downstream degrades per-company instead), so the checks here
/// are deliberately strict.
pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
    let base = Url::parse(&settings.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid BASE_URL: {}", e)))?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "BASE_URL must be http(s), got '{}'",
            settings.base_url
        )));
    }

    base.join(&settings.listings_path)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid LISTINGS_PATH: {}", e)))?;

    if settings.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "USER_AGENT cannot be empty".to_string(),
        ));
    }

    if settings.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "REQUEST_TIMEOUT must be >= 1 second".to_string(),
        ));
    }

    if !settings.backoff.is_finite() || settings.backoff < 0.0 {
        return Err(ConfigError::Validation(format!(
            "REQUEST_BACKOFF must be a non-negative number, got {}",
            settings.backoff
        )));
    }

    if !settings.retry_after_floor_secs.is_finite() || settings.retry_after_floor_secs < 0.0 {
        return Err(ConfigError::Validation(format!(
            "RETRY_AFTER_FLOOR must be a non-negative number, got {}",
            settings.retry_after_floor_secs
        )));
    }

    validate_band("PAGE_DELAY", &settings.page_delay)?;
    validate_band("DOWNLOAD_DELAY", &settings.download_delay)?;

    for (name, path) in [
        ("DATA_DIR", &settings.data_dir),
        ("FINANCIALS_DIR", &settings.financials_dir),
        ("HTTP_STATE_PATH", &settings.http_state_path),
        ("HTTP_CACHE_PATH", &settings.http_cache_dir),
    ] {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

fn validate_band(name: &str, band: &DelayBand) -> Result<(), ConfigError> {
    if !band.low.is_finite() || !band.high.is_finite() || band.low < 0.0 {
        return Err(ConfigError::Validation(format!(
            "{}_LOW/{}_HIGH must be non-negative numbers",
            name, name
        )));
    }

    if band.high < band.low {
        return Err(ConfigError::Validation(format!(
            "{}_HIGH ({}) must be >= {}_LOW ({})",
            name, band.high, name, band.low
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_settings() {
        assert!(validate(&Settings::default()).is_ok());
    }

    #[test]
    fn test_reject_bad_base_url() {
        let settings = Settings {
            base_url: "not a url".to_string(),
            ..Settings::default()
        };
        assert!(matches!(
            validate(&settings),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_reject_non_http_scheme() {
        let settings = Settings {
            base_url: "ftp://mse.co.mw/".to_string(),
            ..Settings::default()
        };
        assert!(matches!(
            validate(&settings),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_reject_empty_user_agent() {
        let settings = Settings {
            user_agent: "  ".to_string(),
            ..Settings::default()
        };
        assert!(validate(&settings).is_err());
    }

    #[test]
    fn test_reject_inverted_band() {
        let settings = Settings {
            page_delay: DelayBand::new(10.0, 2.0),
            ..Settings::default()
        };
        assert!(validate(&settings).is_err());
    }

    #[test]
    fn test_reject_negative_backoff() {
        let settings = Settings {
            backoff: -1.0,
            ..Settings::default()
        };
        assert!(validate(&settings).is_err());
    }

    #[test]
    fn test_zero_bands_allowed() {
        // Tests rely on zeroed jitter bands
        let settings = Settings {
            page_delay: DelayBand::new(0.0, 0.0),
            download_delay: DelayBand::new(0.0, 0.0),
            ..Settings::default()
        };
        assert!(validate(&settings).is_ok());
    }
}
