//! Configuration module for Flocrawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every setting has a default, so an empty file (or no file at all) is valid.
//!
//! # Example
//!
//! ```no_run
//! use flocrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("flocrawl.toml")).unwrap();
//! println!("Crawls stop after {} pages", config.scraper.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, RenderConfig, ScraperConfig, SearchConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
