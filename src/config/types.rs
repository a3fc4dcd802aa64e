use std::collections::HashMap;

use serde::Deserialize;

/// Main configuration structure for Spinneret
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Seed URLs to start crawling from
    #[serde(default)]
    pub seeds: Vec<String>,

    /// Crawl behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// HTTP client settings
    #[serde(default)]
    pub client: ClientConfig,

    /// Accept/reject rule lists
    #[serde(default)]
    pub filters: FilterConfig,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum link depth from the seeds; absent means unlimited
    #[serde(rename = "max-depth")]
    pub max_depth: Option<u32>,

    /// Maximum number of pages to visit; absent means unlimited
    #[serde(rename = "max-pages")]
    pub max_pages: Option<usize>,

    /// Pause before each fetch (milliseconds)
    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,

    /// Drop `#fragment` components when queueing URLs
    #[serde(rename = "strip-fragments")]
    pub strip_fragments: bool,

    /// Drop `?query` components when queueing URLs
    #[serde(rename = "strip-query")]
    pub strip_query: bool,

    /// Consult robots.txt before visiting a URL
    #[serde(rename = "respect-robots")]
    pub respect_robots: bool,

    /// Seed the queue from sitemaps before crawling
    pub sitemap: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            max_pages: None,
            delay_ms: 0,
            strip_fragments: true,
            strip_query: false,
            respect_robots: true,
            sitemap: false,
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Referer header sent with every request
    pub referer: Option<String>,

    /// Global Host header override; per-host rules take precedence
    #[serde(rename = "host-header")]
    pub host_header: Option<String>,

    /// Connect timeout (seconds)
    #[serde(rename = "open-timeout")]
    pub open_timeout: u64,

    /// Total per-request timeout (seconds)
    #[serde(rename = "read-timeout")]
    pub read_timeout: u64,

    /// Idle keep-alive timeout for pooled connections (seconds)
    #[serde(rename = "keep-alive-timeout")]
    pub keep_alive_timeout: u64,

    /// Default headers added to every request
    pub headers: HashMap<String, String>,

    /// Per-host Host header overrides; the first matching rule wins
    #[serde(rename = "host-headers")]
    pub host_headers: Vec<HostHeaderRule>,

    /// Proxy settings
    pub proxy: ProxyConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("spinneret/{}", env!("CARGO_PKG_VERSION")),
            referer: None,
            host_header: None,
            open_timeout: 10,
            read_timeout: 30,
            keep_alive_timeout: 90,
            headers: HashMap::new(),
            host_headers: Vec::new(),
            proxy: ProxyConfig::default(),
        }
    }
}

/// A per-host Host header override
#[derive(Debug, Clone, Deserialize)]
pub struct HostHeaderRule {
    /// Host pattern: an exact host name, or a regex when wrapped in
    /// slashes (e.g. `"/\\.cdn\\.example\\.com$/"`)
    pub host: String,

    /// Host header value to send for matching hosts
    pub value: String,
}

/// Proxy configuration
///
/// The proxy is enabled exactly when a host is present; everything else
/// falls back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Proxy host; absent disables the proxy
    pub host: Option<String>,

    /// Proxy port; absent uses [`ProxyConfig::DEFAULT_PORT`]
    pub port: Option<u16>,

    /// Proxy username for basic auth
    pub username: Option<String>,

    /// Proxy password for basic auth
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Port assumed when none is configured
    pub const DEFAULT_PORT: u16 = 8080;

    /// Returns true when a proxy host is configured
    pub fn enabled(&self) -> bool {
        self.host.is_some()
    }

    /// Formats the proxy URL for the HTTP client, if enabled
    pub fn url(&self) -> Option<String> {
        let host = self.host.as_deref()?;
        let port = self.port.unwrap_or(Self::DEFAULT_PORT);
        Some(format!("http://{}:{}", host, port))
    }
}

/// Accept/reject rule lists applied before a URL may be queued
///
/// Each string entry is an exact value, or a regular expression when
/// wrapped in slashes (`"/…/"`). Port entries are plain integers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Scheme accept list; empty keeps the built-in http/https default
    #[serde(rename = "schemes-accept")]
    pub schemes_accept: Vec<String>,

    /// Scheme reject list
    #[serde(rename = "schemes-reject")]
    pub schemes_reject: Vec<String>,

    /// Host accept list
    #[serde(rename = "hosts-accept")]
    pub hosts_accept: Vec<String>,

    /// Host reject list
    #[serde(rename = "hosts-reject")]
    pub hosts_reject: Vec<String>,

    /// Port accept list
    #[serde(rename = "ports-accept")]
    pub ports_accept: Vec<u16>,

    /// Port reject list
    #[serde(rename = "ports-reject")]
    pub ports_reject: Vec<u16>,

    /// Link-string accept list (matched against the full URL text)
    #[serde(rename = "links-accept")]
    pub links_accept: Vec<String>,

    /// Link-string reject list
    #[serde(rename = "links-reject")]
    pub links_reject: Vec<String>,

    /// URL accept list (matched against the parsed URL)
    #[serde(rename = "urls-accept")]
    pub urls_accept: Vec<String>,

    /// URL reject list
    #[serde(rename = "urls-reject")]
    pub urls_reject: Vec<String>,

    /// Path extension accept list (extension without the dot)
    #[serde(rename = "extensions-accept")]
    pub extensions_accept: Vec<String>,

    /// Path extension reject list
    #[serde(rename = "extensions-reject")]
    pub extensions_reject: Vec<String>,
}
