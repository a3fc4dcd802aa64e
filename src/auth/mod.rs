//! HTTP Basic credentials scoped to URL path prefixes
//!
//! Credentials are stored per host under a normalized path scope and
//! looked up by longest matching prefix, so a credential added for
//! `/members` covers everything beneath it while a more specific one
//! for `/members/admin` takes precedence there.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use url::Url;

use crate::url::expand_path;

/// A username/password pair for HTTP Basic authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    /// Creates a credential
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Encodes the credential for an `Authorization: Basic` header
    pub fn encode(&self) -> String {
        STANDARD.encode(format!("{}:{}", self.username, self.password))
    }
}

/// Credentials keyed by host, then by normalized path scope
#[derive(Debug, Clone, Default)]
pub struct AuthStore {
    credentials: HashMap<String, HashMap<String, Credential>>,
}

impl AuthStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a credential for the URL's host and path scope
    ///
    /// The scope is the expanded path with a trailing `/`, so the
    /// credential applies to the whole subtree under that path.
    pub fn set(&mut self, url: &Url, credential: Credential) {
        let Some(host) = url.host_str() else {
            tracing::warn!("Ignoring credential for hostless URL {}", url);
            return;
        };

        let scope = scope_for(url.path());
        self.credentials
            .entry(host.to_string())
            .or_default()
            .insert(scope, credential);
    }

    /// Finds the credential covering a URL, if any
    ///
    /// Among the scopes registered for the URL's host, the longest one
    /// that prefixes the request path wins.
    pub fn get(&self, url: &Url) -> Option<&Credential> {
        let scopes = self.credentials.get(url.host_str()?)?;
        let path = url.path();

        let mut ordered: Vec<&String> = scopes.keys().collect();
        ordered.sort_by(|a, b| b.len().cmp(&a.len()));

        ordered
            .into_iter()
            .find(|scope| path.starts_with(scope.as_str()))
            .and_then(|scope| scopes.get(scope))
    }

    /// Returns the encoded `Authorization: Basic` value for a URL
    pub fn for_url(&self, url: &Url) -> Option<String> {
        self.get(url).map(Credential::encode)
    }

    /// Number of hosts with registered credentials
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Returns true if no credential is registered
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Drops all registered credentials
    pub fn clear(&mut self) {
        self.credentials.clear();
    }
}

/// Normalizes a path into a credential scope
fn scope_for(path: &str) -> String {
    let mut scope = expand_path(path);
    if !scope.ends_with('/') {
        scope.push('/');
    }
    scope
}
