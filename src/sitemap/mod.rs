//! Sitemap discovery and traversal
//!
//! Extends the [`Agent`] with sitemap support:
//! - Discovery through robots-advertised locations, falling back to a
//!   fixed list of well-known paths at the origin root
//! - Sitemap index documents expanded recursively, with a visited set
//!   and a fetch budget guarding against cycles
//! - Gzip-compressed bodies decompressed before parsing
//! - Plain-text sitemaps read as one URL per line

use std::collections::{HashSet, VecDeque};
use std::io::Read;

use flate2::read::GzDecoder;
use url::Url;

use crate::crawler::Agent;
use crate::page::Page;
use crate::url::to_absolute;

/// Well-known sitemap locations probed at the origin root, in order
const COMMON_SITEMAP_PATHS: [&str; 7] = [
    "sitemap.xml",
    "sitemap.xml.gz",
    "sitemap.gz",
    "sitemap_index.xml",
    "sitemap-index.xml",
    "sitemap_index.xml.gz",
    "sitemap-index.xml.gz",
];

/// Upper bound on sitemap documents fetched per site
///
/// Sitemap indexes may reference each other in a cycle; the budget and
/// the visited set together keep the expansion finite.
const SITEMAP_FETCH_BUDGET: usize = 50;

/// What a single sitemap document contained
enum SitemapContent {
    /// A sitemap index referencing further sitemap documents
    Index(Vec<Url>),
    /// A URL set (or plain-text list) of page URLs
    Urls(Vec<Url>),
}

impl Agent {
    /// Collects every page URL advertised by a site's sitemaps
    ///
    /// Returns an empty list when sitemap support is disabled in the
    /// configuration. Otherwise the sitemap locations advertised by
    /// robots.txt are used when present, falling back to probing the
    /// well-known paths at the origin root and keeping the first that
    /// answers with a success status.
    ///
    /// # Arguments
    ///
    /// * `url` - Any URL on the target site; only its origin is used
    pub async fn sitemap_urls(&mut self, url: &Url) -> Vec<Url> {
        if !self.config().crawler.sitemap {
            return Vec::new();
        }

        let roots = self.sitemap_roots(url).await;
        if roots.is_empty() {
            tracing::debug!("No sitemap found for {}", url);
            return Vec::new();
        }

        self.gather_sitemap_urls(roots).await
    }

    /// Collects a site's sitemap URLs and queues each at depth zero
    ///
    /// # Returns
    ///
    /// The number of URLs actually queued.
    pub async fn seed_from_sitemaps(&mut self, url: &Url) -> usize {
        let mut queued = 0;

        for found in self.sitemap_urls(url).await {
            if self.enqueue(found, 0).await {
                queued += 1;
            }
        }

        tracing::info!("Queued {} sitemap URL(s) for {}", queued, url);
        queued
    }

    /// Finds the sitemap documents to start from
    async fn sitemap_roots(&mut self, url: &Url) -> Vec<Url> {
        if let Some(robots) = self.robots_mut() {
            let advertised = robots.sitemaps(url).await;
            if !advertised.is_empty() {
                tracing::debug!(
                    "robots.txt advertises {} sitemap(s) for {}",
                    advertised.len(),
                    url
                );
                return advertised;
            }
        }

        let Some(base) = origin_root(url) else {
            return Vec::new();
        };

        for path in COMMON_SITEMAP_PATHS {
            let Ok(candidate) = base.join(path) else {
                continue;
            };

            match self.get_page(&candidate).await {
                Ok(page) if page.is_ok() => {
                    tracing::debug!("Found sitemap at {}", candidate);
                    return vec![candidate];
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!("Sitemap probe {} failed: {}", candidate, err);
                }
            }
        }

        Vec::new()
    }

    /// Expands sitemap documents breadth-first, flattening URL sets
    async fn gather_sitemap_urls(&mut self, roots: Vec<Url>) -> Vec<Url> {
        let mut found = Vec::new();
        let mut seen: HashSet<Url> = HashSet::new();
        let mut pending: VecDeque<Url> = roots.into();
        let mut fetched = 0;

        while let Some(sitemap_url) = pending.pop_front() {
            if !seen.insert(sitemap_url.clone()) {
                continue;
            }

            if fetched >= SITEMAP_FETCH_BUDGET {
                tracing::warn!(
                    "Sitemap fetch budget of {} exhausted, {} document(s) unread",
                    SITEMAP_FETCH_BUDGET,
                    pending.len() + 1
                );
                break;
            }
            fetched += 1;

            let page = match self.get_page(&sitemap_url).await {
                Ok(page) => page,
                Err(err) => {
                    tracing::warn!("Failed to fetch sitemap {}: {}", sitemap_url, err);
                    continue;
                }
            };

            if !page.is_ok() {
                tracing::debug!("Sitemap {} answered {}", sitemap_url, page.code());
                continue;
            }

            match parse_sitemap(&page) {
                SitemapContent::Index(children) => pending.extend(children),
                SitemapContent::Urls(urls) => found.extend(urls),
            }
        }

        tracing::info!(
            "Collected {} URL(s) from {} sitemap document(s)",
            found.len(),
            fetched
        );
        found
    }
}

/// Reduces a URL to its origin root (path `/`, no query or fragment)
fn origin_root(url: &Url) -> Option<Url> {
    if url.cannot_be_a_base() {
        return None;
    }

    let mut base = url.clone();
    base.set_path("/");
    base.set_query(None);
    base.set_fragment(None);
    Some(base)
}

/// Classifies and parses one sitemap document
fn parse_sitemap(page: &Page) -> SitemapContent {
    let body = decode_body(page);
    let text = String::from_utf8_lossy(&body);

    if text.contains("<sitemapindex") {
        SitemapContent::Index(resolve_locs(&text, page.url()))
    } else if text.contains("<urlset") {
        SitemapContent::Urls(resolve_locs(&text, page.url()))
    } else {
        // Plain-text sitemap: one absolute URL per line
        let urls = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| Url::parse(line).ok())
            .collect();
        SitemapContent::Urls(urls)
    }
}

/// Returns the page body, decompressed when it carries a gzip payload
///
/// Transfer-level gzip is already undone by the HTTP client; this
/// handles `.xml.gz` files served as opaque gzip bodies, recognized by
/// their magic bytes.
fn decode_body(page: &Page) -> Vec<u8> {
    let body = page.body();

    if body.starts_with(&[0x1f, 0x8b]) {
        let mut decoder = GzDecoder::new(body);
        let mut decoded = Vec::new();

        match decoder.read_to_end(&mut decoded) {
            Ok(_) => return decoded,
            Err(err) => {
                tracing::warn!("Failed to decompress sitemap {}: {}", page.url(), err);
            }
        }
    }

    body.to_vec()
}

/// Extracts `<loc>` values and resolves them against the document URL
fn resolve_locs(text: &str, base: &Url) -> Vec<Url> {
    extract_locs(text)
        .into_iter()
        .filter_map(|loc| to_absolute(base, &unescape(&loc)))
        .collect()
}

/// Scans out the text content of every `<loc>` element
fn extract_locs(text: &str) -> Vec<String> {
    let mut locs = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("<loc>") {
        rest = &rest[start + "<loc>".len()..];

        let Some(end) = rest.find("</loc>") else {
            break;
        };

        let loc = rest[..end].trim();
        if !loc.is_empty() {
            locs.push(loc.to_string());
        }

        rest = &rest[end + "</loc>".len()..];
    }

    locs
}

/// Undoes the XML escaping required inside `<loc>` values
fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
