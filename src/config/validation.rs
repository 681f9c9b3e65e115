use crate::config::types::{
    Config, CrawlerConfig, FetchConfig, StoreConfig, SyncConfig, UserAgentConfig,
};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetch_config(&config.fetch)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_store_config(&config.store)?;
    validate_sync_config(&config.sync)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 50 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 50, got {}",
            config.concurrency
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(
            "crawler max_pages must be >= 1".to_string(),
        ));
    }

    validate_exclude_patterns(&config.exclude_patterns)?;

    Ok(())
}

/// Validates that every exclude pattern compiles
pub(crate) fn validate_exclude_patterns(patterns: &[String]) -> Result<(), ConfigError> {
    for pattern in patterns {
        Regex::new(pattern)
            .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)))?;
    }
    Ok(())
}

/// Validates fetch tier configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.request_timeout_secs < 1 || config.request_timeout_secs > 120 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be between 1 and 120, got {}",
            config.request_timeout_secs
        )));
    }

    if config.render_timeout_secs < 1 || config.render_timeout_secs > 120 {
        return Err(ConfigError::Validation(format!(
            "render_timeout_secs must be between 1 and 120, got {}",
            config.render_timeout_secs
        )));
    }

    if config.probe_timeout_secs < 1 || config.probe_timeout_secs > 60 {
        return Err(ConfigError::Validation(format!(
            "probe_timeout_secs must be between 1 and 60, got {}",
            config.probe_timeout_secs
        )));
    }

    if config.pool_size < 1 || config.pool_size > 16 {
        return Err(ConfigError::Validation(format!(
            "pool_size must be between 1 and 16, got {}",
            config.pool_size
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Crawler name is also the robots.txt token: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

/// Validates store configuration
fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates reconciliation configuration
fn validate_sync_config(config: &SyncConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(
            "sync max_pages must be >= 1".to_string(),
        ));
    }

    if config.write_batch_size < 1 || config.write_batch_size > 1000 {
        return Err(ConfigError::Validation(format!(
            "write_batch_size must be between 1 and 1000, got {}",
            config.write_batch_size
        )));
    }

    Ok(())
}
