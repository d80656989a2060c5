use crate::config::types::{Config, DetailConfig, FetcherConfig, ListingConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetcher_config(&config.fetcher)?;
    validate_listing_config(&config.listing)?;
    validate_detail_config(&config.detail)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "fetcher.user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "fetcher.timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.backoff_base_ms < 1 {
        return Err(ConfigError::Validation(format!(
            "fetcher.backoff-base-ms must be >= 1, got {}",
            config.backoff_base_ms
        )));
    }

    Ok(())
}

/// Validates listing configuration
fn validate_listing_config(config: &ListingConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url).map_err(|e| {
        ConfigError::Validation(format!("listing.base-url is not a valid URL: {}", e))
    })?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "listing.base-url must use http or https, got {}",
            base.scheme()
        )));
    }

    if config.base_url.ends_with('/') {
        return Err(ConfigError::Validation(
            "listing.base-url must not end with a slash".to_string(),
        ));
    }

    if !config.best_list_path.starts_with('/') || !config.detail_path.starts_with('/') {
        return Err(ConfigError::Validation(
            "listing paths must start with a slash".to_string(),
        ));
    }

    if config.page_param.is_empty() {
        return Err(ConfigError::Validation(
            "listing.page-param cannot be empty".to_string(),
        ));
    }

    // Every selector must compile; a bad selector would otherwise surface
    // only mid-crawl
    let selectors = &config.selectors;
    for (name, value) in [
        ("container", &selectors.container),
        ("name", &selectors.name),
        ("brand", &selectors.brand),
        ("price", &selectors.price),
        ("rating", &selectors.rating),
        ("link", &selectors.link),
        ("image", &selectors.image),
    ] {
        if scraper::Selector::parse(value).is_err() {
            return Err(ConfigError::Validation(format!(
                "listing.selectors.{} is not a valid CSS selector: '{}'",
                name, value
            )));
        }
    }

    Ok(())
}

/// Validates detail extraction configuration
fn validate_detail_config(config: &DetailConfig) -> Result<(), ConfigError> {
    if config.max_walk_depth < 1 {
        return Err(ConfigError::Validation(format!(
            "detail.max-walk-depth must be >= 1, got {}",
            config.max_walk_depth
        )));
    }

    if config.max_scroll_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "detail.max-scroll-attempts must be >= 1, got {}",
            config.max_scroll_attempts
        )));
    }

    if config.locator_poll_ms < 1 {
        return Err(ConfigError::Validation(format!(
            "detail.locator-poll-ms must be >= 1, got {}",
            config.locator_poll_ms
        )));
    }

    if config.ingredient_delimiter.is_empty() {
        return Err(ConfigError::Validation(
            "detail.ingredient-delimiter cannot be empty".to_string(),
        ));
    }

    if config.review_item_tag.is_empty() || config.review_list_selector.is_empty() {
        return Err(ConfigError::Validation(
            "detail review selectors cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.dir.is_empty() {
        return Err(ConfigError::Validation(
            "output.dir cannot be empty".to_string(),
        ));
    }

    if config.csv_filename.is_empty() || config.db_filename.is_empty() {
        return Err(ConfigError::Validation(
            "output filenames cannot be empty".to_string(),
        ));
    }

    Ok(())
}
