//! Configuration module for Hamster
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! A configuration file is optional: `Config::default()` targets the public
//! GitHub API and command-line flags override individual values.
//!
//! # Example
//!
//! ```no_run
//! use hamster::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("hamster.toml")).unwrap();
//! println!("Workers per query: {}", config.fetch.num_workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{ApiConfig, CacheConfig, Config, CrawlConfig, FetchConfig, RetryConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
