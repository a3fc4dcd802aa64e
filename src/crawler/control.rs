//! Control signals and handler registries
//!
//! Handlers communicate with the engine through ordinary return
//! values: every handler returns a [`Control`] telling the engine
//! whether to proceed, skip the current link or page, or pause the
//! whole crawl. Nothing unwinds the stack.

use std::fmt;

use url::Url;

use crate::page::Page;
use crate::rules::Pattern;

/// What a handler asks the engine to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Control {
    /// Proceed normally
    #[default]
    Continue,
    /// Stop processing the current link
    SkipLink,
    /// Stop processing the current page, remaining links included
    SkipPage,
    /// Pause the crawl, leaving the queue and sessions intact
    Pause,
}

/// Handler over fetched pages
pub type PageHandler = Box<dyn FnMut(&Page) -> Control + Send>;

/// Handler over discovered links: origin page URL, destination URL
pub type LinkHandler = Box<dyn FnMut(&Url, &Url) -> Control + Send>;

/// Handler over URLs about to be queued
pub type UrlHandler = Box<dyn FnMut(&Url) -> Control + Send>;

/// Handler over URLs whose fetch failed
pub type FailureHandler = Box<dyn FnMut(&Url) -> Control + Send>;

/// The registered crawl handlers, in registration order
#[derive(Default)]
pub(crate) struct Handlers {
    pub(crate) page: Vec<PageHandler>,
    pub(crate) link: Vec<LinkHandler>,
    pub(crate) link_matching: Vec<(Pattern<Url>, LinkHandler)>,
    pub(crate) url: Vec<UrlHandler>,
    pub(crate) url_matching: Vec<(Pattern<Url>, UrlHandler)>,
    pub(crate) failure: Vec<FailureHandler>,
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("page", &self.page.len())
            .field("link", &self.link.len())
            .field("link_matching", &self.link_matching.len())
            .field("url", &self.url.len())
            .field("url_matching", &self.url_matching.len())
            .field("failure", &self.failure.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_control_is_continue() {
        assert_eq!(Control::default(), Control::Continue);
    }

    #[test]
    fn test_handlers_start_empty() {
        let handlers = Handlers::default();

        assert!(handlers.page.is_empty());
        assert!(handlers.link.is_empty());
        assert!(handlers.url.is_empty());
        assert!(handlers.failure.is_empty());
    }
}
