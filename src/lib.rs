//! Spinneret: a rule-driven web spider
//!
//! This crate implements a breadth-first web crawler driven by
//! accept/reject rules over URL schemes, hosts, ports, links, and path
//! extensions, with per-host cookies, Basic auth credentials, cached
//! HTTP sessions, robots.txt support, and sitemap traversal.

pub mod auth;
pub mod config;
pub mod cookies;
pub mod crawler;
pub mod page;
pub mod robots;
pub mod rules;
pub mod session;
mod sitemap;
pub mod url;

use thiserror::Error;

/// Main error type for Spinneret operations
#[derive(Debug, Error)]
pub enum SpinneretError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

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

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid filter pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid header in config: {0}")]
    InvalidHeader(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("URL has no host: {0}")]
    MissingHost(String),
}

/// Result type alias for Spinneret operations
pub type Result<T> = std::result::Result<T, SpinneretError>;

// Re-export commonly used types
pub use auth::{AuthStore, Credential};
pub use config::{load_config, Config};
pub use cookies::CookieJar;
pub use crawler::{Agent, AgentState, Control, CrawlSnapshot, UrlFilters};
pub use page::Page;
pub use robots::{RobotsFile, RobotsPolicy};
pub use rules::{Pattern, RuleSet};
pub use session::SessionCache;
