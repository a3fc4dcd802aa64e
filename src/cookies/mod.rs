//! Cookie jar for per-host request cookies
//!
//! This module stores cookie name/value pairs keyed by host and renders
//! them into `Cookie` header strings on demand:
//! - Additive merges: new responses update or add names, never wipe the
//!   host's existing cookies
//! - A per-host dirty flag so the encoded header string is recomputed
//!   only after a real change
//! - Ancestor-domain inheritance: a request to a sub-domain carries the
//!   parent domain's cookies for names the sub-domain does not set
//!
//! Cookie attributes (expiry, `Secure`, paths) are not interpreted; the
//! jar holds plain name/value pairs for the duration of a crawl.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::page::Page;

/// In-memory cookie storage keyed by host
#[derive(Debug, Default)]
pub struct CookieJar {
    /// Cookie name/value pairs per host
    params: HashMap<String, HashMap<String, String>>,
    /// Hosts whose encoded header string is stale
    dirty: HashSet<String>,
    /// Cached encoded `Cookie` header strings per host
    cache: HashMap<String, String>,
}

impl CookieJar {
    /// Creates an empty cookie jar
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a single cookie value for a host
    pub fn get(&self, host: &str, name: &str) -> Option<&str> {
        self.params.get(host)?.get(name).map(String::as_str)
    }

    /// Merges cookie params into a host's entry
    ///
    /// If any incoming pair is new or differs from the stored value, all
    /// incoming pairs are merged in (overwriting only those names) and
    /// the host is marked dirty. Re-setting identical pairs changes
    /// nothing and keeps the cached header string valid.
    ///
    /// # Arguments
    ///
    /// * `host` - The host the cookies were set by
    /// * `cookies` - Name/value pairs to merge
    pub fn set(&mut self, host: &str, cookies: &HashMap<String, String>) {
        if cookies.is_empty() {
            return;
        }

        let collected = self.params.entry(host.to_string()).or_default();

        let changed = cookies
            .iter()
            .any(|(name, value)| collected.get(name) != Some(value));

        if changed {
            for (name, value) in cookies {
                collected.insert(name.clone(), value.clone());
            }
            self.dirty.insert(host.to_string());
        }
    }

    /// Absorbs the `Set-Cookie` params carried by a fetched page
    pub fn from_page(&mut self, page: &Page) {
        let params = page.cookie_params();
        if params.is_empty() {
            return;
        }

        if let Some(host) = page.url().host_str() {
            tracing::debug!("Collected {} cookie(s) from {}", params.len(), host);
            self.set(host, &params);
        }
    }

    /// Returns the encoded `Cookie` header string for a host
    ///
    /// Recomputes the string from [`CookieJar::cookies_for_host`] when
    /// the host is dirty, otherwise returns the cached value. `None`
    /// for hosts the jar knows nothing about.
    pub fn for_host(&mut self, host: &str) -> Option<&str> {
        if self.dirty.remove(host) {
            let merged = self.cookies_for_host(host);
            let encoded = merged
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; ");
            self.cache.insert(host.to_string(), encoded);
        }

        self.cache.get(host).map(String::as_str)
    }

    /// Collects the effective cookies for a host, ancestors included
    ///
    /// Starts from the host's own pairs, then repeatedly strips the
    /// leftmost label while more than two labels remain, pulling in
    /// parent-domain pairs for names not already present. The more
    /// specific host always wins on conflict.
    pub fn cookies_for_host(&self, host: &str) -> BTreeMap<String, String> {
        let mut merged: BTreeMap<String, String> = BTreeMap::new();

        if let Some(own) = self.params.get(host) {
            for (name, value) in own {
                merged.insert(name.clone(), value.clone());
            }
        }

        let mut labels: Vec<&str> = host.split('.').collect();
        while labels.len() > 2 {
            labels.remove(0);
            let parent = labels.join(".");

            if let Some(inherited) = self.params.get(&parent) {
                for (name, value) in inherited {
                    if !merged.contains_key(name) {
                        merged.insert(name.clone(), value.clone());
                    }
                }
            }
        }

        merged
    }

    /// Returns the hosts the jar holds cookies for
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    /// Returns true if no host holds any cookies
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Number of hosts with stored cookies
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Drops all cookies, caches, and dirty flags
    pub fn clear(&mut self) {
        self.params.clear();
        self.dirty.clear();
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn test_set_and_get() {
        let mut jar = CookieJar::new();
        jar.set("example.com", &params(&[("session", "abc123")]));

        assert_eq!(jar.get("example.com", "session"), Some("abc123"));
        assert_eq!(jar.get("example.com", "missing"), None);
        assert_eq!(jar.get("other.com", "session"), None);
    }

    #[test]
    fn test_for_host_encodes_sorted_pairs() {
        let mut jar = CookieJar::new();
        jar.set("example.com", &params(&[("b", "2"), ("a", "1")]));

        assert_eq!(jar.for_host("example.com"), Some("a=1; b=2"));
    }

    #[test]
    fn test_for_host_unknown_host_is_none() {
        let mut jar = CookieJar::new();
        assert_eq!(jar.for_host("example.com"), None);
    }

    #[test]
    fn test_merge_is_additive() {
        let mut jar = CookieJar::new();
        jar.set("example.com", &params(&[("a", "1")]));
        jar.set("example.com", &params(&[("b", "2")]));

        assert_eq!(jar.get("example.com", "a"), Some("1"));
        assert_eq!(jar.get("example.com", "b"), Some("2"));
        assert_eq!(jar.for_host("example.com"), Some("a=1; b=2"));
    }

    #[test]
    fn test_merge_overwrites_only_incoming_names() {
        let mut jar = CookieJar::new();
        jar.set("example.com", &params(&[("a", "1"), ("b", "2")]));
        jar.set("example.com", &params(&[("a", "9")]));

        assert_eq!(jar.get("example.com", "a"), Some("9"));
        assert_eq!(jar.get("example.com", "b"), Some("2"));
    }

    #[test]
    fn test_identical_set_keeps_cache_valid() {
        let mut jar = CookieJar::new();
        jar.set("sub.example.com", &params(&[("a", "1")]));
        assert_eq!(jar.for_host("sub.example.com"), Some("a=1"));

        // A parent-domain cookie arrives, then an identical re-set of the
        // sub-domain. The re-set must not mark the sub-domain dirty, so
        // the cached string stays as computed.
        jar.set("example.com", &params(&[("tracker", "x")]));
        jar.set("sub.example.com", &params(&[("a", "1")]));
        assert_eq!(jar.for_host("sub.example.com"), Some("a=1"));

        // A real change recomputes and now picks up the inherited pair
        jar.set("sub.example.com", &params(&[("a", "2")]));
        assert_eq!(jar.for_host("sub.example.com"), Some("a=2; tracker=x"));
    }

    #[test]
    fn test_sub_domain_inherits_parent_cookies() {
        let mut jar = CookieJar::new();
        jar.set("example.com", &params(&[("session", "parent")]));

        let merged = jar.cookies_for_host("sub.example.com");
        assert_eq!(merged.get("session").map(String::as_str), Some("parent"));
    }

    #[test]
    fn test_sub_domain_own_cookie_wins() {
        let mut jar = CookieJar::new();
        jar.set("example.com", &params(&[("session", "parent")]));
        jar.set("sub.example.com", &params(&[("session", "child")]));

        let merged = jar.cookies_for_host("sub.example.com");
        assert_eq!(merged.get("session").map(String::as_str), Some("child"));
    }

    #[test]
    fn test_closest_ancestor_wins() {
        let mut jar = CookieJar::new();
        jar.set("example.com", &params(&[("k", "far")]));
        jar.set("b.example.com", &params(&[("k", "near")]));

        let merged = jar.cookies_for_host("a.b.example.com");
        assert_eq!(merged.get("k").map(String::as_str), Some("near"));
    }

    #[test]
    fn test_deep_host_walks_all_ancestors() {
        let mut jar = CookieJar::new();
        jar.set("example.com", &params(&[("base", "1")]));
        jar.set("b.example.com", &params(&[("mid", "2")]));
        jar.set("a.b.example.com", &params(&[("own", "3")]));

        let merged = jar.cookies_for_host("a.b.example.com");
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get("base").map(String::as_str), Some("1"));
        assert_eq!(merged.get("mid").map(String::as_str), Some("2"));
        assert_eq!(merged.get("own").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_bare_domain_has_no_ancestors() {
        let mut jar = CookieJar::new();
        jar.set("example.com", &params(&[("a", "1")]));

        // Stripping would leave fewer than two labels, so nothing is
        // consulted beyond the host itself
        let merged = jar.cookies_for_host("example.com");
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_inheritance_does_not_leak_across_domains() {
        let mut jar = CookieJar::new();
        jar.set("example.com", &params(&[("a", "1")]));

        assert!(jar.cookies_for_host("sub.other.com").is_empty());
    }

    #[test]
    fn test_clear() {
        let mut jar = CookieJar::new();
        jar.set("example.com", &params(&[("a", "1")]));
        assert!(!jar.is_empty());

        jar.clear();
        assert!(jar.is_empty());
        assert_eq!(jar.for_host("example.com"), None);
    }

    #[test]
    fn test_empty_set_is_ignored() {
        let mut jar = CookieJar::new();
        jar.set("example.com", &HashMap::new());

        assert!(jar.is_empty());
        assert_eq!(jar.for_host("example.com"), None);
    }
}
