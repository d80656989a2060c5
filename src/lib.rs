//! Shelfrank: a ranked-listing harvest pipeline
//!
//! This crate crawls a paginated product-ranking catalog, enriches each
//! record from its script-rendered detail page (disclosure table and
//! shadow-DOM review widgets), and exports the results as CSV and SQLite.

pub mod config;
pub mod crawler;
pub mod detail;
pub mod output;
pub mod records;

use thiserror::Error;

/// Main error type for shelfrank operations
#[derive(Debug, Error)]
pub enum ShelfrankError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("Browser launch error: {0}")]
    Browser(String),

    #[error("Browser protocol error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("Failed to decode page data: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for shelfrank operations
pub type Result<T> = std::result::Result<T, ShelfrankError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use records::{DetailInfo, EnrichedRecord, ListingRecord};
