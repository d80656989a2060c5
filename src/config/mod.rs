//! Configuration module for shelfrank
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. Every setting has a default matching the target catalog, so
//! `Config::default()` is a complete, runnable configuration.

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, DetailConfig, FetcherConfig, ListingConfig, ListingSelectors, OutputConfig,
};

// Re-export parser functions
pub use parser::load_config;
pub use validation::validate;
