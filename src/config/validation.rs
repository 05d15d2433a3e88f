use crate::config::types::{
    BrowserConfig, Config, CrawlerConfig, ScreenshotConfig, ServerConfig, TimeoutConfig,
};
use crate::ConfigError;

/// Hard ceiling on pages per crawl
pub const MAX_PAGES_LIMIT: usize = 1000;

/// Hard ceiling on crawl depth
pub const MAX_DEPTH_LIMIT: u32 = 10;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_browser_config(&config.browser)?;
    validate_timeouts(&config.timeouts)?;
    validate_screenshot_config(&config.screenshots)?;
    validate_server_config(&config.server)?;

    if let Some(path) = &config.output.database_path {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "database-path cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates crawler configuration
pub(crate) fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 || config.max_pages > MAX_PAGES_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max-pages must be between 1 and {}, got {}",
            MAX_PAGES_LIMIT, config.max_pages
        )));
    }

    if config.max_depth > MAX_DEPTH_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max-depth must be <= {}, got {}",
            MAX_DEPTH_LIMIT, config.max_depth
        )));
    }

    if config.concurrency < 1 || config.concurrency > 8 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 8, got {}",
            config.concurrency
        )));
    }

    if config.verify_links && config.max_link_checks == 0 {
        return Err(ConfigError::Validation(
            "max-link-checks must be >= 1 when verify-links is enabled".to_string(),
        ));
    }

    Ok(())
}

/// Validates browser configuration
fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("viewport-width", config.viewport_width),
        ("viewport-height", config.viewport_height),
        ("mobile-viewport-width", config.mobile_viewport_width),
        ("mobile-viewport-height", config.mobile_viewport_height),
    ] {
        if !(200..=4096).contains(&value) {
            return Err(ConfigError::Validation(format!(
                "{} must be between 200 and 4096, got {}",
                name, value
            )));
        }
    }

    if config.user_agent.trim().is_empty() || config.mobile_user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user agents cannot be empty".to_string(),
        ));
    }

    if let Some(path) = &config.executable {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "browser executable cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates timeout configuration
fn validate_timeouts(config: &TimeoutConfig) -> Result<(), ConfigError> {
    if config.navigation_ms < 1000 {
        return Err(ConfigError::Validation(format!(
            "navigation-ms must be >= 1000ms, got {}ms",
            config.navigation_ms
        )));
    }

    if config.settle_ms > config.navigation_ms {
        return Err(ConfigError::Validation(format!(
            "settle-ms ({}ms) cannot exceed navigation-ms ({}ms)",
            config.settle_ms, config.navigation_ms
        )));
    }

    if config.screenshot_ms < 1000 {
        return Err(ConfigError::Validation(format!(
            "screenshot-ms must be >= 1000ms, got {}ms",
            config.screenshot_ms
        )));
    }

    if config.link_check_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "link-check-ms must be >= 100ms, got {}ms",
            config.link_check_ms
        )));
    }

    Ok(())
}

fn validate_screenshot_config(config: &ScreenshotConfig) -> Result<(), ConfigError> {
    if config.max_captures > 20 {
        return Err(ConfigError::Validation(format!(
            "max-captures must be <= 20, got {}",
            config.max_captures
        )));
    }
    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    if config.host.trim().is_empty() {
        return Err(ConfigError::Validation(
            "server host cannot be empty".to_string(),
        ));
    }
    Ok(())
}
