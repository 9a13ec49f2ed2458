use crate::config::types::{Config, RenderConfig, ScraperConfig, SearchConfig};
use crate::search::KNOWN_BACKENDS;
use crate::{ConfigError, ConfigResult};

/// Upper bound on the render settle delay (milliseconds)
const MAX_RENDER_WAIT_MS: u64 = 60_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_scraper_config(&config.scraper)?;
    validate_render_config(&config.render)?;
    validate_search_config(&config.search)?;
    Ok(())
}

/// Validates fetch and crawl limits
fn validate_scraper_config(config: &ScraperConfig) -> ConfigResult<()> {
    if config.max_page_size == 0 {
        return Err(ConfigError::Validation(
            "max_page_size must be positive".to_string(),
        ));
    }

    if config.max_links_per_page == 0 {
        return Err(ConfigError::Validation(
            "max_links_per_page must be positive".to_string(),
        ));
    }

    if config.max_pages == 0 {
        return Err(ConfigError::Validation(
            "max_pages must be positive".to_string(),
        ));
    }

    if config.max_concurrent < 1 || config.max_concurrent > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent must be between 1 and 100, got {}",
            config.max_concurrent
        )));
    }

    if config.request_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_ms must be positive".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.max_text_chars == 0 {
        return Err(ConfigError::Validation(
            "max_text_chars must be positive".to_string(),
        ));
    }

    Ok(())
}

/// Validates render fallback settings
fn validate_render_config(config: &RenderConfig) -> ConfigResult<()> {
    if config.wait_ms > MAX_RENDER_WAIT_MS {
        return Err(ConfigError::Validation(format!(
            "render wait_ms must be <= {}ms, got {}ms",
            MAX_RENDER_WAIT_MS, config.wait_ms
        )));
    }

    if config.markers.iter().any(|m| m.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "render markers cannot contain empty strings".to_string(),
        ));
    }

    Ok(())
}

/// Validates search settings
fn validate_search_config(config: &SearchConfig) -> ConfigResult<()> {
    if config.backends.is_empty() {
        return Err(ConfigError::Validation(
            "at least one search backend is required".to_string(),
        ));
    }

    for backend in &config.backends {
        if !KNOWN_BACKENDS.contains(&backend.as_str()) {
            return Err(ConfigError::Validation(format!(
                "unknown search backend '{}', expected one of: {}",
                backend,
                KNOWN_BACKENDS.join(", ")
            )));
        }
    }

    if config.max_results == 0 {
        return Err(ConfigError::Validation(
            "search max_results must be >= 1".to_string(),
        ));
    }

    if config.timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "search timeout_ms must be positive".to_string(),
        ));
    }

    Ok(())
}
