//! Robots.txt handling module
//!
//! This module fetches, caches, and evaluates robots.txt files:
//! - One fetch per origin (scheme://host:port), cached for the run
//! - Allow-all fallback when the file is missing or unfetchable
//! - Access to non-standard directives, which is where `Sitemap:`
//!   advertisements surface

use std::collections::HashMap;

use reqwest::Client;
use robotstxt::DefaultMatcher;
use url::Url;

use crate::config::ClientConfig;
use crate::session::build_client;
use crate::SpinneretError;

/// A fetched robots.txt file
///
/// Matching is delegated to the robotstxt crate on demand; an empty or
/// allow-all file permits everything.
#[derive(Debug, Clone)]
pub struct RobotsFile {
    /// Raw robots.txt content (empty string means allow all)
    content: String,
    /// Whether to skip matching and allow everything
    allow_all: bool,
}

impl RobotsFile {
    /// Creates a robots file from raw content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: false,
        }
    }

    /// Creates a permissive file that allows everything
    ///
    /// Used whenever a robots.txt cannot be fetched.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    /// The raw robots.txt content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Checks if a URL is allowed for the given user agent
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.allow_all || self.content.is_empty() {
            return true;
        }

        // Parse and check on demand
        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Collects directives other than the access-control ones
    ///
    /// `User-agent`, `Allow`, `Disallow`, and `Crawl-delay` lines are
    /// skipped; everything else is collected with lowercased keys and
    /// values in file order.
    pub fn other_directives(&self) -> HashMap<String, Vec<String>> {
        let mut directives: HashMap<String, Vec<String>> = HashMap::new();

        for line in self.content.lines() {
            let trimmed = line.trim();

            // Skip comments and empty lines
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = trimmed.split_once(':') {
                let key = key.trim().to_lowercase();
                let value = value.trim();

                match key.as_str() {
                    "user-agent" | "allow" | "disallow" | "crawl-delay" => {}
                    _ if !value.is_empty() => {
                        directives.entry(key).or_default().push(value.to_string());
                    }
                    _ => {}
                }
            }
        }

        directives
    }

    /// The absolute sitemap URLs advertised by this file
    pub fn sitemaps(&self) -> Vec<Url> {
        self.other_directives()
            .get("sitemap")
            .map(|values| {
                values
                    .iter()
                    .filter_map(|value| Url::parse(value).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Per-origin robots.txt policy with its own fetch client
#[derive(Debug)]
pub struct RobotsPolicy {
    client: Client,
    user_agent: String,
    cache: HashMap<String, RobotsFile>,
}

impl RobotsPolicy {
    /// Creates a policy that fetches robots.txt with the given client
    /// settings
    ///
    /// # Arguments
    ///
    /// * `config` - Client configuration (user agent, timeouts, proxy)
    ///
    /// # Returns
    ///
    /// * `Ok(RobotsPolicy)` - Ready to consult
    /// * `Err(SpinneretError)` - The fetch client could not be built
    pub fn new(config: &ClientConfig) -> Result<Self, SpinneretError> {
        Ok(Self {
            client: build_client(config)?,
            user_agent: config.user_agent.clone(),
            cache: HashMap::new(),
        })
    }

    /// Checks whether robots.txt allows fetching a URL
    ///
    /// The origin's file is fetched and cached on first use; fetch
    /// failures allow everything.
    pub async fn allowed(&mut self, url: &Url) -> bool {
        let user_agent = self.user_agent.clone();
        let robots = self.for_origin(url).await;
        robots.is_allowed(url.as_str(), &user_agent)
    }

    /// Returns the non-standard directives of a URL's robots.txt
    pub async fn other_directives(&mut self, url: &Url) -> HashMap<String, Vec<String>> {
        self.for_origin(url).await.other_directives()
    }

    /// Returns the sitemap URLs advertised for a URL's origin
    pub async fn sitemaps(&mut self, url: &Url) -> Vec<Url> {
        self.for_origin(url).await.sitemaps()
    }

    /// Number of origins with a cached robots.txt
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns true if no robots.txt has been fetched yet
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Fetches and caches the robots.txt file for a URL's origin
    async fn for_origin(&mut self, url: &Url) -> &RobotsFile {
        let origin = origin_key(url);

        if !self.cache.contains_key(&origin) {
            let file = self.fetch(&origin).await;
            self.cache.insert(origin.clone(), file);
        }

        &self.cache[&origin]
    }

    async fn fetch(&self, origin: &str) -> RobotsFile {
        let robots_url = format!("{}/robots.txt", origin);

        match self.client.get(&robots_url).send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(content) => {
                    tracing::debug!("Fetched robots.txt for {}", origin);
                    RobotsFile::from_content(&content)
                }
                Err(err) => {
                    tracing::warn!("Failed to read robots.txt for {}: {}", origin, err);
                    RobotsFile::allow_all()
                }
            },
            Ok(response) => {
                tracing::debug!(
                    "No robots.txt for {} (status {}), allowing all",
                    origin,
                    response.status()
                );
                RobotsFile::allow_all()
            }
            Err(err) => {
                tracing::warn!("Failed to fetch robots.txt for {}: {}", origin, err);
                RobotsFile::allow_all()
            }
        }
    }
}

/// Builds the cache key and robots.txt base for a URL's origin
fn origin_key(url: &Url) -> String {
    format!(
        "{}://{}:{}",
        url.scheme(),
        url.host_str().unwrap_or_default(),
        url.port_or_known_default().unwrap_or(0)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_all() {
        let robots = RobotsFile::allow_all();
        assert!(robots.is_allowed("https://example.com/any/path", "TestBot"));
        assert!(robots.is_allowed("https://example.com/admin", "TestBot"));
    }

    #[test]
    fn test_empty_content_allows_all() {
        let robots = RobotsFile::from_content("");
        assert!(robots.is_allowed("https://example.com/any", "TestBot"));
    }

    #[test]
    fn test_disallow_all() {
        let robots = RobotsFile::from_content("User-agent: *\nDisallow: /");
        assert!(!robots.is_allowed("https://example.com/", "TestBot"));
        assert!(!robots.is_allowed("https://example.com/page", "TestBot"));
    }

    #[test]
    fn test_disallow_specific_path() {
        let robots = RobotsFile::from_content("User-agent: *\nDisallow: /admin");
        assert!(robots.is_allowed("https://example.com/page", "TestBot"));
        assert!(!robots.is_allowed("https://example.com/admin", "TestBot"));
        assert!(!robots.is_allowed("https://example.com/admin/users", "TestBot"));
    }

    #[test]
    fn test_specific_user_agent() {
        let content = "User-agent: BadBot\nDisallow: /\n\nUser-agent: *\nAllow: /";
        let robots = RobotsFile::from_content(content);
        assert!(robots.is_allowed("https://example.com/page", "GoodBot"));
        assert!(!robots.is_allowed("https://example.com/page", "BadBot"));
    }

    #[test]
    fn test_garbage_content_allows_all() {
        let robots = RobotsFile::from_content("This is not valid robots.txt {{{");
        assert!(robots.is_allowed("https://example.com/any", "TestBot"));
    }

    #[test]
    fn test_other_directives_collects_sitemaps() {
        let content = "User-agent: *\n\
                       Disallow: /admin\n\
                       Sitemap: https://example.com/sitemap.xml\n\
                       Sitemap: https://example.com/sitemap-news.xml\n";
        let robots = RobotsFile::from_content(content);

        let directives = robots.other_directives();
        assert_eq!(
            directives.get("sitemap"),
            Some(&vec![
                "https://example.com/sitemap.xml".to_string(),
                "https://example.com/sitemap-news.xml".to_string(),
            ])
        );
    }

    #[test]
    fn test_other_directives_skips_access_directives() {
        let content =
            "User-agent: *\nAllow: /public\nDisallow: /private\nCrawl-delay: 5\nHost: example.com";
        let robots = RobotsFile::from_content(content);

        let directives = robots.other_directives();
        assert!(!directives.contains_key("user-agent"));
        assert!(!directives.contains_key("allow"));
        assert!(!directives.contains_key("disallow"));
        assert!(!directives.contains_key("crawl-delay"));
        assert_eq!(
            directives.get("host"),
            Some(&vec!["example.com".to_string()])
        );
    }

    #[test]
    fn test_other_directives_lowercases_keys() {
        let robots = RobotsFile::from_content("SITEMAP: https://example.com/sitemap.xml");

        let directives = robots.other_directives();
        assert!(directives.contains_key("sitemap"));
    }

    #[test]
    fn test_other_directives_skips_comments() {
        let robots = RobotsFile::from_content("# Sitemap: https://example.com/ignored.xml");
        assert!(robots.other_directives().is_empty());
    }

    #[test]
    fn test_sitemaps_parses_absolute_urls() {
        let content = "Sitemap: https://example.com/sitemap.xml\nSitemap: not a url\n";
        let robots = RobotsFile::from_content(content);

        let sitemaps = robots.sitemaps();
        assert_eq!(sitemaps.len(), 1);
        assert_eq!(sitemaps[0].as_str(), "https://example.com/sitemap.xml");
    }

    #[test]
    fn test_origin_key_includes_default_port() {
        let url = Url::parse("https://example.com/deep/page").unwrap();
        assert_eq!(origin_key(&url), "https://example.com:443");

        let url = Url::parse("http://example.com:8080/x").unwrap();
        assert_eq!(origin_key(&url), "http://example.com:8080");
    }

    #[test]
    fn test_policy_builds_from_config() {
        let policy = RobotsPolicy::new(&ClientConfig::default());
        assert!(policy.is_ok());
        assert!(policy.unwrap().is_empty());
    }
}
