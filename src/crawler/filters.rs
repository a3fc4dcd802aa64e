//! URL filter dimensions
//!
//! Before a URL may enter the queue it has to pass six independent
//! rule sets, evaluated in a fixed order:
//!
//! - Scheme (accepts `http` and `https` out of the box)
//! - Host name
//! - Port (explicit or the scheme default)
//! - Link, the URL's full string form
//! - URL, the parsed value itself
//! - Path extension, without the dot (empty string when there is none)
//!
//! Config entries wrapped in slashes (`"/…/"`) compile to regular
//! expressions; everything else is an exact match.

use std::path::Path;

use url::Url;

use crate::config::FilterConfig;
use crate::rules::{Pattern, RuleSet};
use crate::ConfigError;

/// Schemes accepted when the configuration names none
const DEFAULT_SCHEMES: &[&str] = &["http", "https"];

/// Per-dimension accept/reject rules for queue admission
#[derive(Debug, Default)]
pub struct UrlFilters {
    /// Rules over the URL scheme
    pub schemes: RuleSet<String>,
    /// Rules over the host name
    pub hosts: RuleSet<String>,
    /// Rules over the port number
    pub ports: RuleSet<u16>,
    /// Rules over the URL's full string form
    pub links: RuleSet<String>,
    /// Rules over the parsed URL
    pub urls: RuleSet<Url>,
    /// Rules over the path extension
    pub extensions: RuleSet<String>,
}

impl UrlFilters {
    /// Creates filters with the default scheme accept list
    pub fn new() -> Self {
        let mut filters = Self::default();

        for scheme in DEFAULT_SCHEMES {
            filters.schemes.accept(Pattern::exact(scheme.to_string()));
        }

        filters
    }

    /// Compiles a configuration's rule lists into filters
    ///
    /// The scheme accept list replaces the default one when non-empty.
    /// Entries that look like regexes but fail to compile are reported
    /// as [`ConfigError::InvalidPattern`].
    pub fn from_config(config: &FilterConfig) -> Result<Self, ConfigError> {
        let mut filters = Self::new();

        if !config.schemes_accept.is_empty() {
            filters.schemes = RuleSet::new();
            for entry in &config.schemes_accept {
                filters.schemes.accept(parse_pattern(entry)?);
            }
        }
        for entry in &config.schemes_reject {
            filters.schemes.reject(parse_pattern(entry)?);
        }

        for entry in &config.hosts_accept {
            filters.hosts.accept(parse_pattern(entry)?);
        }
        for entry in &config.hosts_reject {
            filters.hosts.reject(parse_pattern(entry)?);
        }

        for port in &config.ports_accept {
            filters.ports.accept(Pattern::exact(*port));
        }
        for port in &config.ports_reject {
            filters.ports.reject(Pattern::exact(*port));
        }

        for entry in &config.links_accept {
            filters.links.accept(parse_pattern(entry)?);
        }
        for entry in &config.links_reject {
            filters.links.reject(parse_pattern(entry)?);
        }

        for entry in &config.urls_accept {
            filters.urls.accept(parse_url_pattern(entry)?);
        }
        for entry in &config.urls_reject {
            filters.urls.reject(parse_url_pattern(entry)?);
        }

        for entry in &config.extensions_accept {
            filters.extensions.accept(parse_pattern(entry)?);
        }
        for entry in &config.extensions_reject {
            filters.extensions.reject(parse_pattern(entry)?);
        }

        Ok(filters)
    }

    /// Runs every dimension against a URL, in order
    pub fn accepts(&self, url: &Url) -> bool {
        let scheme = url.scheme().to_string();
        if !self.schemes.accepts(&scheme) {
            return false;
        }

        let host = url.host_str().unwrap_or_default().to_string();
        if !self.hosts.accepts(&host) {
            return false;
        }

        let port = url.port_or_known_default().unwrap_or(0);
        if !self.ports.accepts(&port) {
            return false;
        }

        let link = url.to_string();
        if !self.links.accepts(&link) {
            return false;
        }

        if !self.urls.accepts(url) {
            return false;
        }

        let extension = path_extension(url.path());
        self.extensions.accepts(&extension)
    }
}

/// Parses a string rule entry, slash-wrapped meaning regex
pub(crate) fn parse_pattern(entry: &str) -> Result<Pattern<String>, ConfigError> {
    match regex_source(entry) {
        Some(source) => Pattern::regex(source)
            .map_err(|err| ConfigError::InvalidPattern(format!("{}: {}", entry, err))),
        None => Ok(Pattern::exact(entry.to_string())),
    }
}

/// Parses a URL rule entry, slash-wrapped meaning regex over the
/// URL's string form
fn parse_url_pattern(entry: &str) -> Result<Pattern<Url>, ConfigError> {
    match regex_source(entry) {
        Some(source) => Pattern::regex(source)
            .map_err(|err| ConfigError::InvalidPattern(format!("{}: {}", entry, err))),
        None => {
            let url = Url::parse(entry)
                .map_err(|err| ConfigError::InvalidPattern(format!("{}: {}", entry, err)))?;
            Ok(Pattern::exact(url))
        }
    }
}

fn regex_source(entry: &str) -> Option<&str> {
    if entry.len() >= 2 && entry.starts_with('/') && entry.ends_with('/') {
        Some(&entry[1..entry.len() - 1])
    } else {
        None
    }
}

/// Extracts the extension of the final path segment, without the dot
fn path_extension(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(input: &str) -> Url {
        Url::parse(input).unwrap()
    }

    #[test]
    fn test_default_schemes_accept_http_and_https() {
        let filters = UrlFilters::new();

        assert!(filters.accepts(&url("http://example.com/")));
        assert!(filters.accepts(&url("https://example.com/")));
        assert!(!filters.accepts(&url("ftp://example.com/")));
    }

    #[test]
    fn test_host_reject_rule() {
        let mut filters = UrlFilters::new();
        filters
            .hosts
            .reject(Pattern::exact("ads.example.com".to_string()));

        assert!(filters.accepts(&url("http://example.com/")));
        assert!(!filters.accepts(&url("http://ads.example.com/")));
    }

    #[test]
    fn test_host_regex_rule() {
        let mut filters = UrlFilters::new();
        filters
            .hosts
            .accept(Pattern::regex(r"\.example\.com$").unwrap());

        assert!(filters.accepts(&url("http://www.example.com/")));
        assert!(!filters.accepts(&url("http://example.org/")));
    }

    #[test]
    fn test_port_uses_scheme_default() {
        let mut filters = UrlFilters::new();
        filters.ports.accept(Pattern::exact(443u16));

        assert!(filters.accepts(&url("https://example.com/")));
        assert!(!filters.accepts(&url("http://example.com/")));
        assert!(!filters.accepts(&url("http://example.com:8080/")));
    }

    #[test]
    fn test_extension_reject_rule() {
        let mut filters = UrlFilters::new();
        filters.extensions.reject(Pattern::exact("pdf".to_string()));

        assert!(filters.accepts(&url("http://example.com/page.html")));
        assert!(filters.accepts(&url("http://example.com/")));
        assert!(!filters.accepts(&url("http://example.com/report.pdf")));
    }

    #[test]
    fn test_extensionless_path_yields_empty_string() {
        let mut filters = UrlFilters::new();
        filters.extensions.accept(Pattern::exact(String::new()));

        assert!(filters.accepts(&url("http://example.com/docs")));
        assert!(!filters.accepts(&url("http://example.com/docs/index.html")));
    }

    #[test]
    fn test_link_regex_rule() {
        let mut filters = UrlFilters::new();
        filters.links.reject(Pattern::regex(r"\?page=\d+").unwrap());

        assert!(filters.accepts(&url("http://example.com/list")));
        assert!(!filters.accepts(&url("http://example.com/list?page=2")));
    }

    #[test]
    fn test_from_config_compiles_slash_wrapped_regexes() {
        let config = FilterConfig {
            hosts_accept: vec!["/\\.example\\.com$/".to_string()],
            ..FilterConfig::default()
        };
        let filters = UrlFilters::from_config(&config).unwrap();

        assert!(filters.accepts(&url("http://www.example.com/")));
        assert!(!filters.accepts(&url("http://example.org/")));
    }

    #[test]
    fn test_from_config_plain_entries_are_exact() {
        let config = FilterConfig {
            hosts_accept: vec!["example.com".to_string()],
            ..FilterConfig::default()
        };
        let filters = UrlFilters::from_config(&config).unwrap();

        assert!(filters.accepts(&url("http://example.com/")));
        // An exact host rule does not cover subdomains
        assert!(!filters.accepts(&url("http://www.example.com/")));
    }

    #[test]
    fn test_from_config_scheme_accept_replaces_default() {
        let config = FilterConfig {
            schemes_accept: vec!["https".to_string()],
            ..FilterConfig::default()
        };
        let filters = UrlFilters::from_config(&config).unwrap();

        assert!(filters.accepts(&url("https://example.com/")));
        assert!(!filters.accepts(&url("http://example.com/")));
    }

    #[test]
    fn test_from_config_invalid_regex_is_rejected() {
        let config = FilterConfig {
            links_reject: vec!["/[unclosed/".to_string()],
            ..FilterConfig::default()
        };

        let result = UrlFilters::from_config(&config);
        assert!(matches!(result, Err(ConfigError::InvalidPattern(_))));
    }

    #[test]
    fn test_from_config_url_entries_parse_as_urls() {
        let config = FilterConfig {
            urls_reject: vec!["http://example.com/private".to_string()],
            ..FilterConfig::default()
        };
        let filters = UrlFilters::from_config(&config).unwrap();

        assert!(!filters.accepts(&url("http://example.com/private")));
        assert!(filters.accepts(&url("http://example.com/public")));
    }

    #[test]
    fn test_from_config_invalid_url_entry_is_rejected() {
        let config = FilterConfig {
            urls_accept: vec!["not a url".to_string()],
            ..FilterConfig::default()
        };

        let result = UrlFilters::from_config(&config);
        assert!(matches!(result, Err(ConfigError::InvalidPattern(_))));
    }

    #[test]
    fn test_port_config_rules() {
        let config = FilterConfig {
            ports_reject: vec![8080],
            ..FilterConfig::default()
        };
        let filters = UrlFilters::from_config(&config).unwrap();

        assert!(filters.accepts(&url("http://example.com/")));
        assert!(!filters.accepts(&url("http://example.com:8080/")));
    }
}
