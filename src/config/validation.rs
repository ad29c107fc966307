use crate::config::types::{Config, DelayRange, HttpConfig, OutputConfig, SearchConfig};
use crate::{ConfigError, ConfigResult};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_search_config(&config.search)?;
    validate_delay_range("page-delay", &config.rate_limit.page_delay)?;
    validate_delay_range("dimension-delay", &config.rate_limit.dimension_delay)?;
    validate_delay_range("detail-delay", &config.rate_limit.detail_delay)?;
    validate_delay_range("backoff-jitter", &config.rate_limit.backoff_jitter)?;
    validate_http_config(&config.http)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates search configuration
fn validate_search_config(config: &SearchConfig) -> ConfigResult<()> {
    if config.location.trim().is_empty() {
        return Err(ConfigError::Validation(
            "location cannot be empty".to_string(),
        ));
    }

    if config.page_size < 1 {
        return Err(ConfigError::Validation(format!(
            "page_size must be >= 1, got {}",
            config.page_size
        )));
    }

    if config.max_empty_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_empty_pages must be >= 1, got {}",
            config.max_empty_pages
        )));
    }

    if config.max_failed_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_failed_pages must be >= 1, got {}",
            config.max_failed_pages
        )));
    }

    Ok(())
}

/// A range must not be inverted
fn validate_delay_range(name: &str, range: &DelayRange) -> ConfigResult<()> {
    if range.min_ms > range.max_ms {
        return Err(ConfigError::Validation(format!(
            "{} min-ms ({}) is greater than max-ms ({})",
            name, range.min_ms, range.max_ms
        )));
    }
    Ok(())
}

/// Validates endpoint URLs and the user-agent pool
fn validate_http_config(config: &HttpConfig) -> ConfigResult<()> {
    for (name, endpoint) in [
        ("listing_endpoint", &config.listing_endpoint),
        ("detail_endpoint", &config.detail_endpoint),
        ("referer", &config.referer),
    ] {
        let url = Url::parse(endpoint)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", name, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "{} must use HTTP or HTTPS, got '{}'",
                name, endpoint
            )));
        }
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.user_agents.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user_agents cannot contain empty entries".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be >= 1, got {}",
            config.batch_size
        )));
    }

    if config.detail_workers < 1 || config.detail_workers > 16 {
        return Err(ConfigError::Validation(format!(
            "detail_workers must be between 1 and 16, got {}",
            config.detail_workers
        )));
    }

    Ok(())
}
