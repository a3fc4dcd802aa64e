use crate::config::types::{ClientConfig, Config, CrawlerConfig};
use crate::crawler::UrlFilters;
use crate::ConfigError;
use reqwest::header::{HeaderName, HeaderValue};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_client_config(&config.client)?;
    validate_seeds(&config.seeds)?;

    // Compiling the filters checks every pattern entry
    UrlFilters::from_config(&config.filters)?;

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max-pages must be at least 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates HTTP client configuration
fn validate_client_config(config: &ClientConfig) -> Result<(), ConfigError> {
    if config.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.open_timeout == 0 {
        return Err(ConfigError::Validation(
            "open-timeout must be at least 1 second".to_string(),
        ));
    }

    if config.read_timeout == 0 {
        return Err(ConfigError::Validation(
            "read-timeout must be at least 1 second".to_string(),
        ));
    }

    for (name, value) in &config.headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            return Err(ConfigError::InvalidHeader(name.clone()));
        }
        if HeaderValue::from_str(value).is_err() {
            return Err(ConfigError::InvalidHeader(format!("{}: {}", name, value)));
        }
    }

    for rule in &config.host_headers {
        if rule.value.is_empty() {
            return Err(ConfigError::Validation(format!(
                "host-header rule for '{}' has an empty value",
                rule.host
            )));
        }
        if HeaderValue::from_str(&rule.value).is_err() {
            return Err(ConfigError::InvalidHeader(format!(
                "host: {}",
                rule.value
            )));
        }
    }

    if config.proxy.enabled() {
        if config.proxy.port == Some(0) {
            return Err(ConfigError::Validation(
                "proxy port must be nonzero".to_string(),
            ));
        }
    } else {
        // Credentials or a port without a host indicate a truncated proxy table
        if config.proxy.port.is_some()
            || config.proxy.username.is_some()
            || config.proxy.password.is_some()
        {
            return Err(ConfigError::Validation(
                "proxy settings are present but proxy host is missing".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates seed URLs
fn validate_seeds(seeds: &[String]) -> Result<(), ConfigError> {
    for seed in seeds {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "Seed URL '{}' has no host",
                seed
            )));
        }

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use the http or https scheme",
                seed
            )));
        }
    }

    Ok(())
}
