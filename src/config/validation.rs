use crate::config::types::{ApiConfig, CacheConfig, Config, CrawlConfig, FetchConfig, RetryConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_fetch_config(&config.fetch)?;
    validate_retry_config(&config.retry)?;
    validate_cache_config(&config.cache)?;
    validate_crawl_config(&config.crawl)?;
    Ok(())
}

/// Validates upstream API configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            config.base_url
        )));
    }

    if config.accept.trim().is_empty() {
        return Err(ConfigError::Validation("accept cannot be empty".to_string()));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    // GitHub caps page size at 100
    if config.per_page < 1 || config.per_page > 100 {
        return Err(ConfigError::Validation(format!(
            "per_page must be between 1 and 100, got {}",
            config.per_page
        )));
    }

    Ok(())
}

/// Validates concurrency configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.num_workers < 1 || config.num_workers > 100 {
        return Err(ConfigError::Validation(format!(
            "num_workers must be between 1 and 100, got {}",
            config.num_workers
        )));
    }

    Ok(())
}

/// Validates retry configuration
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_backoff_ms < config.backoff_base_ms {
        return Err(ConfigError::Validation(format!(
            "max_backoff_ms ({}) must be >= backoff_base_ms ({})",
            config.max_backoff_ms, config.backoff_base_ms
        )));
    }

    for status in &config.status_forcelist {
        if !(100..=599).contains(status) {
            return Err(ConfigError::Validation(format!(
                "status_forcelist contains invalid HTTP status {}",
                status
            )));
        }
    }

    Ok(())
}

/// Validates the sanitizer denylist
fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    // An empty substring would match every key and wipe the whole payload
    if config.sanitize_contains.iter().any(|s| s.is_empty()) {
        return Err(ConfigError::Validation(
            "sanitize_contains cannot contain an empty string".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawl sequencing configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    for repo in &config.skip_repos {
        validate_repo_name(repo)?;
    }
    Ok(())
}

/// Validates an `owner/name` repository identifier
fn validate_repo_name(repo: &str) -> Result<(), ConfigError> {
    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok(())
        }
        _ => Err(ConfigError::Validation(format!(
            "skip_repos entry '{}' must have the form 'owner/name'",
            repo
        ))),
    }
}
