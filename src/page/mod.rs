//! Fetched page representation
//!
//! This module wraps a fetched HTTP response as an immutable snapshot:
//! - Final URL, status code, headers, and raw body bytes
//! - Explicit header lookup and content-type/status predicates
//! - Link, title, and cookie extraction on demand
//!
//! The parsed HTML document is never stored on the page; it is rebuilt
//! per call so pages stay cheap to move across await points.

mod links;

use std::borrow::Cow;
use std::collections::HashMap;

use reqwest::header::{HeaderMap, SET_COOKIE};
use scraper::{Html, Selector};
use url::Url;

/// Set-Cookie attribute names that are not cookie params
const RESERVED_COOKIE_ATTRS: &[&str] = &["path", "expires", "domain"];

/// A fetched page: URL, status code, headers, and raw body
#[derive(Debug, Clone)]
pub struct Page {
    url: Url,
    code: u16,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Page {
    /// Creates a page from response parts
    pub fn new(url: Url, code: u16, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            url,
            code,
            headers,
            body,
        }
    }

    /// The URL this page was fetched from
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The HTTP status code
    pub fn code(&self) -> u16 {
        self.code
    }

    /// The response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The raw body bytes
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Lossy UTF-8 view of the body
    pub fn body_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Looks up a header value by name, case-insensitively
    ///
    /// Values that are not valid UTF-8 come back as `None`. Multi-value
    /// headers yield their first value; use [`Page::headers`] for the
    /// rest.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// The media type of the body, parameters stripped
    pub fn content_type(&self) -> &str {
        let value = self.header("content-type").unwrap_or("");
        value.split(';').next().unwrap_or("").trim()
    }

    /// Tests the media type, ignoring parameters and letter case
    pub fn is_content_type(&self, media_type: &str) -> bool {
        self.content_type().eq_ignore_ascii_case(media_type)
    }

    /// Returns true for `text/html` bodies
    pub fn is_html(&self) -> bool {
        self.is_content_type("text/html")
    }

    /// Returns true for XML bodies
    pub fn is_xml(&self) -> bool {
        self.is_content_type("text/xml") || self.is_content_type("application/xml")
    }

    /// Returns true for plain-text bodies
    pub fn is_txt(&self) -> bool {
        self.is_content_type("text/plain")
    }

    /// Returns true for JSON bodies
    pub fn is_json(&self) -> bool {
        self.is_content_type("application/json")
    }

    /// Returns true for JavaScript bodies
    pub fn is_javascript(&self) -> bool {
        self.is_content_type("text/javascript") || self.is_content_type("application/javascript")
    }

    /// Returns true for CSS bodies
    pub fn is_css(&self) -> bool {
        self.is_content_type("text/css")
    }

    /// Returns true for PDF bodies
    pub fn is_pdf(&self) -> bool {
        self.is_content_type("application/pdf")
    }

    /// Returns true for ZIP bodies
    pub fn is_zip(&self) -> bool {
        self.is_content_type("application/zip")
    }

    /// Returns true for gzip bodies
    pub fn is_gzip(&self) -> bool {
        self.is_content_type("application/gzip") || self.is_content_type("application/x-gzip")
    }

    /// 200 OK
    pub fn is_ok(&self) -> bool {
        self.code == 200
    }

    /// A redirect status carrying a target to follow
    pub fn is_redirect(&self) -> bool {
        matches!(self.code, 300..=303 | 307 | 308)
    }

    /// 400 Bad Request
    pub fn is_bad_request(&self) -> bool {
        self.code == 400
    }

    /// 401 Unauthorized
    pub fn is_unauthorized(&self) -> bool {
        self.code == 401
    }

    /// 403 Forbidden
    pub fn is_forbidden(&self) -> bool {
        self.code == 403
    }

    /// 404 Not Found
    pub fn is_missing(&self) -> bool {
        self.code == 404
    }

    /// 408 Request Timeout
    pub fn is_timed_out(&self) -> bool {
        self.code == 408
    }

    /// The Location header, if any
    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }

    /// Parses the body as an HTML document
    ///
    /// `None` unless the content type is HTML.
    pub fn doc(&self) -> Option<Html> {
        if !self.is_html() {
            return None;
        }
        Some(Html::parse_document(&self.body_str()))
    }

    /// Extracts the page title
    pub fn title(&self) -> Option<String> {
        let doc = self.doc()?;
        let selector = Selector::parse("title").ok()?;

        doc.select(&selector)
            .next()
            .map(|element| element.text().collect::<String>().trim().to_string())
            .filter(|title| !title.is_empty())
    }

    /// Collects the raw outgoing links of this page
    ///
    /// Redirect responses contribute their `Location` targets (or meta
    /// refresh targets when no `Location` header exists); HTML bodies
    /// contribute anchor, frame, iframe, link, and script references.
    /// Nothing is filtered here: scheme and host rules apply at queue
    /// admission.
    pub fn links(&self) -> Vec<String> {
        links::extract_links(self)
    }

    /// The outgoing links resolved to absolute URLs
    pub fn urls(&self) -> Vec<Url> {
        self.links()
            .iter()
            .filter_map(|link| self.to_absolute(link))
            .collect()
    }

    /// Resolves a raw link against this page's URL
    pub fn to_absolute(&self, link: &str) -> Option<Url> {
        crate::url::to_absolute(&self.url, link)
    }

    /// Extracts cookie name/value params from `Set-Cookie` headers
    ///
    /// Each header value is split on `;`; pieces naming the reserved
    /// attributes (path, expires, domain) are skipped, and a piece
    /// without `=` keeps an empty value.
    pub fn cookie_params(&self) -> HashMap<String, String> {
        let mut params = HashMap::new();

        for header_value in self.headers.get_all(SET_COOKIE) {
            let Ok(raw) = header_value.to_str() else {
                continue;
            };

            for piece in raw.split(';') {
                let piece = piece.trim();
                if piece.is_empty() {
                    continue;
                }

                let (name, value) = match piece.split_once('=') {
                    Some((name, value)) => (name.trim(), value.trim()),
                    None => (piece, ""),
                };

                if name.is_empty() {
                    continue;
                }
                if RESERVED_COOKIE_ATTRS
                    .iter()
                    .any(|reserved| name.eq_ignore_ascii_case(reserved))
                {
                    continue;
                }

                params.insert(name.to_string(), value.to_string());
            }
        }

        params
    }
}
