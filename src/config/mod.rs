//! Configuration module for Site-Harvester
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; omitted keys take the defaults documented on the
//! individual types.
//!
//! # Example
//!
//! ```no_run
//! use site_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, FallbackConfig, LoggingConfig, StorageBackend, StorageConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
