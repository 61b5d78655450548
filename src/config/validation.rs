use crate::config::types::{
    Config, CrawlerConfig, FallbackConfig, StorageBackend, StorageConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_fallback_config(&config.fallback)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_depth < 1 || config.max_depth > 5 {
        return Err(ConfigError::Validation(format!(
            "max_depth must be between 1 and 5, got {}",
            config.max_depth
        )));
    }

    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_requests must be between 1 and 100, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.expansion_concurrency < 1 {
        return Err(ConfigError::Validation(format!(
            "expansion_concurrency must be >= 1, got {}",
            config.expansion_concurrency
        )));
    }

    if config.page_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "page_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.session_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "session_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.request_delay_ms > 10_000 {
        return Err(ConfigError::Validation(format!(
            "request_delay_ms must be <= 10000ms, got {}ms",
            config.request_delay_ms
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.links_per_page == Some(0) {
        return Err(ConfigError::Validation(
            "links_per_page must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Crawler name: non-empty, alphanumeric + hyphens only
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

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_fallback_config(config: &FallbackConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "fallback user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "fallback timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    match config.backend {
        StorageBackend::Local if config.base_path.is_empty() => Err(ConfigError::Validation(
            "base_path cannot be empty for the local backend".to_string(),
        )),
        StorageBackend::Sqlite if config.database_path.is_empty() => {
            Err(ConfigError::Validation(
                "database_path cannot be empty for the sqlite backend".to_string(),
            ))
        }
        _ => Ok(()),
    }
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Must contain a single @ with text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
