//! Per-origin HTTP session cache
//!
//! This module keeps one configured HTTP client per (scheme, host,
//! port) so connection pools, TLS state, and proxy settings are reused
//! across requests to the same origin:
//! - Clients are built lazily on first request to an origin
//! - A failed fetch kills only that origin's session
//! - Changing the proxy invalidates every session

use std::collections::HashMap;
use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::{Client, Proxy};
use url::Url;

use crate::config::{ClientConfig, ProxyConfig};
use crate::{SpinneretError, UrlError};

/// Identity of an HTTP session: scheme, host, and effective port
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl SessionKey {
    /// Derives the session key for a URL
    ///
    /// The port is the explicit port when given, otherwise the scheme's
    /// well-known default.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to derive the key from
    ///
    /// # Returns
    ///
    /// * `Ok(SessionKey)` - The origin identity
    /// * `Err(UrlError)` - The URL has no host
    pub fn from_url(url: &Url) -> Result<Self, UrlError> {
        let host = url
            .host_str()
            .ok_or_else(|| UrlError::MissingHost(url.to_string()))?;

        Ok(Self {
            scheme: url.scheme().to_string(),
            host: host.to_string(),
            port: url.port_or_known_default().unwrap_or(0),
        })
    }
}

/// Cache of one HTTP client per origin
#[derive(Debug)]
pub struct SessionCache {
    config: ClientConfig,
    clients: HashMap<SessionKey, Client>,
}

impl SessionCache {
    /// Creates an empty cache that builds clients from the given config
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            clients: HashMap::new(),
        }
    }

    /// Returns the client for a URL's origin, building it on first use
    ///
    /// # Arguments
    ///
    /// * `url` - The URL about to be requested
    ///
    /// # Returns
    ///
    /// * `Ok(&Client)` - A client configured for this crawl
    /// * `Err(SpinneretError)` - The URL has no host or the client
    ///   could not be built
    pub fn client_for(&mut self, url: &Url) -> Result<&Client, SpinneretError> {
        let key = SessionKey::from_url(url)?;

        if !self.clients.contains_key(&key) {
            tracing::debug!(
                "Opening session for {}://{}:{}",
                key.scheme,
                key.host,
                key.port
            );
            let client = build_client(&self.config)?;
            self.clients.insert(key.clone(), client);
        }

        Ok(&self.clients[&key])
    }

    /// Drops the session for a URL's origin, if one exists
    pub fn kill(&mut self, url: &Url) {
        if let Ok(key) = SessionKey::from_url(url) {
            if self.clients.remove(&key).is_some() {
                tracing::debug!(
                    "Killed session for {}://{}:{}",
                    key.scheme,
                    key.host,
                    key.port
                );
            }
        }
    }

    /// Drops every cached session
    pub fn clear(&mut self) {
        self.clients.clear();
    }

    /// Replaces the proxy settings and invalidates every session
    ///
    /// Existing clients were built against the old proxy, so they are
    /// all dropped; new sessions pick up the replacement lazily.
    pub fn set_proxy(&mut self, proxy: ProxyConfig) {
        self.config.proxy = proxy;
        self.clear();
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no session is open
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

/// Builds an HTTP client per the client configuration
///
/// Redirects are never followed automatically: the crawl engine treats
/// a redirect response as a page whose only link is its target, so the
/// usual filter rules apply to it.
///
/// # Arguments
///
/// * `config` - The client configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(SpinneretError)` - Failed to build the client or the proxy
pub fn build_client(config: &ClientConfig) -> Result<Client, SpinneretError> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.read_timeout))
        .connect_timeout(Duration::from_secs(config.open_timeout))
        .pool_idle_timeout(Duration::from_secs(config.keep_alive_timeout))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true);

    if let Some(proxy_url) = config.proxy.url() {
        let mut proxy = Proxy::all(&proxy_url)?;
        if let Some(username) = &config.proxy.username {
            let password = config.proxy.password.as_deref().unwrap_or("");
            proxy = proxy.basic_auth(username, password);
        }
        builder = builder.proxy(proxy);
    }

    Ok(builder.build()?)
}
