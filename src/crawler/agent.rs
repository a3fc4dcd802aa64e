//! Crawl engine
//!
//! The [`Agent`] owns the whole crawl: a FIFO frontier queue with a
//! membership mirror, the visit history, the failure set, a per-URL
//! depth map, and the supporting components (URL filters, cookie jar,
//! credential store, session cache, robots policy). Pages are fetched
//! strictly one at a time, in breadth-first order.
//!
//! Handlers registered on the agent observe pages, links, queued URLs,
//! and failures, and steer the crawl through their [`Control`] return
//! values.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, COOKIE, HOST, REFERER, USER_AGENT,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::AuthStore;
use crate::config::{Config, HostHeaderRule, ProxyConfig};
use crate::cookies::CookieJar;
use crate::crawler::control::{Control, Handlers};
use crate::crawler::filters::{parse_pattern, UrlFilters};
use crate::page::Page;
use crate::robots::RobotsPolicy;
use crate::rules::Pattern;
use crate::session::SessionCache;
use crate::url::sanitize;
use crate::{ConfigError, SpinneretError};

/// Lifecycle state of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentState {
    /// Constructed but not yet run
    #[default]
    Idle,
    /// Inside the run loop
    Running,
    /// Paused by a handler, queue and sessions intact
    Paused,
    /// Queue drained or page limit reached
    Done,
}

/// Serializable crawl state: the visit history and the pending queue
///
/// Captured with [`Agent::snapshot`] and applied with
/// [`Agent::restore`]. History order is not meaningful and is stored
/// sorted; queue order is preserved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlSnapshot {
    /// URLs already visited
    #[serde(default)]
    pub history: Vec<String>,
    /// URLs waiting to be visited, front first
    #[serde(default)]
    pub queue: Vec<String>,
}

/// The breadth-first crawl engine
pub struct Agent {
    config: Config,
    state: AgentState,
    queue: VecDeque<Url>,
    queued: HashSet<Url>,
    history: HashSet<Url>,
    failures: HashSet<Url>,
    depths: HashMap<Url, u32>,
    filters: UrlFilters,
    handlers: Handlers,
    cookies: CookieJar,
    auth: AuthStore,
    sessions: SessionCache,
    robots: Option<RobotsPolicy>,
    default_headers: HeaderMap,
    host_header_rules: Vec<(Pattern<String>, HeaderValue)>,
    host_header: Option<HeaderValue>,
    user_agent: HeaderValue,
    referer: Option<HeaderValue>,
}

impl Agent {
    /// Creates an agent from a configuration
    ///
    /// Filter patterns and header values are compiled up front so that
    /// a bad configuration fails here instead of mid-crawl.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawl configuration
    ///
    /// # Returns
    ///
    /// The agent, or a [`ConfigError`] wrapped in [`SpinneretError`]
    /// when a pattern or header cannot be compiled.
    pub fn new(config: Config) -> Result<Self, SpinneretError> {
        let filters = UrlFilters::from_config(&config.filters)?;

        let robots = if config.crawler.respect_robots {
            Some(RobotsPolicy::new(&config.client)?)
        } else {
            None
        };

        let default_headers = build_default_headers(&config.client.headers)?;
        let host_header_rules = build_host_header_rules(&config.client.host_headers)?;
        let user_agent = header_value("user-agent", &config.client.user_agent)?;
        let referer = optional_header_value("referer", config.client.referer.as_deref())?;
        let host_header = optional_header_value("host", config.client.host_header.as_deref())?;

        let sessions = SessionCache::new(config.client.clone());

        Ok(Self {
            config,
            state: AgentState::Idle,
            queue: VecDeque::new(),
            queued: HashSet::new(),
            history: HashSet::new(),
            failures: HashSet::new(),
            depths: HashMap::new(),
            filters,
            handlers: Handlers::default(),
            cookies: CookieJar::new(),
            auth: AuthStore::new(),
            sessions,
            robots,
            default_headers,
            host_header_rules,
            host_header,
            user_agent,
            referer,
        })
    }

    // ============ Handler registration ============

    /// Registers a handler over every fetched page
    pub fn on_page<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&Page) -> Control + Send + 'static,
    {
        self.handlers.page.push(Box::new(handler));
        self
    }

    /// Registers a handler over every discovered link
    ///
    /// The handler receives the origin page URL and the destination
    /// URL, before any queue admission decision is made.
    pub fn on_link<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&Url, &Url) -> Control + Send + 'static,
    {
        self.handlers.link.push(Box::new(handler));
        self
    }

    /// Registers a link handler that only fires when the destination
    /// matches the pattern
    pub fn on_link_matching<F>(&mut self, pattern: Pattern<Url>, handler: F) -> &mut Self
    where
        F: FnMut(&Url, &Url) -> Control + Send + 'static,
    {
        self.handlers.link_matching.push((pattern, Box::new(handler)));
        self
    }

    /// Registers a handler over every URL about to be queued
    pub fn on_url<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&Url) -> Control + Send + 'static,
    {
        self.handlers.url.push(Box::new(handler));
        self
    }

    /// Registers a URL handler that only fires when the URL matches
    /// the pattern
    pub fn on_url_matching<F>(&mut self, pattern: Pattern<Url>, handler: F) -> &mut Self
    where
        F: FnMut(&Url) -> Control + Send + 'static,
    {
        self.handlers.url_matching.push((pattern, Box::new(handler)));
        self
    }

    /// Registers a handler over every URL whose fetch failed
    pub fn on_failure<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&Url) -> Control + Send + 'static,
    {
        self.handlers.failure.push(Box::new(handler));
        self
    }

    // ============ Crawl loop ============

    /// Queues a URL at depth zero and runs the crawl
    pub async fn start_at(&mut self, url: Url) {
        self.enqueue(url, 0).await;
        self.run().await;
    }

    /// Re-enters the crawl loop after a pause
    pub async fn resume(&mut self) {
        self.run().await;
    }

    /// Runs the crawl until the queue drains, the page limit is
    /// reached, or a handler pauses
    ///
    /// Finishing tears down the session cache; pausing leaves both the
    /// queue and the sessions intact for [`Agent::resume`].
    pub async fn run(&mut self) {
        self.state = AgentState::Running;
        tracing::info!("Starting crawl with {} queued URL(s)", self.queue.len());

        let started = Instant::now();

        loop {
            if self.state != AgentState::Running {
                tracing::info!("Crawl paused with {} URL(s) still queued", self.queue.len());
                return;
            }

            if self.limit_reached() {
                tracing::info!("Page limit of {:?} reached", self.config.crawler.max_pages);
                break;
            }

            let Some(url) = self.dequeue() else {
                break;
            };

            self.visit_page(url).await;
        }

        self.state = AgentState::Done;
        self.sessions.clear();

        tracing::info!(
            "Crawl finished: {} visited, {} failed in {:.2?}",
            self.history.len(),
            self.failures.len(),
            started.elapsed()
        );
    }

    /// Offers a URL to the queue at the given depth
    ///
    /// The URL is sanitized, checked against queue membership and the
    /// visit rules, then run past the URL handlers. The recorded depth
    /// never changes once set.
    ///
    /// # Returns
    ///
    /// True only if the URL was actually queued.
    pub async fn enqueue(&mut self, url: Url, depth: u32) -> bool {
        let url = self.sanitized(url);

        if self.queued.contains(&url) {
            return false;
        }

        if !self.may_visit(&url).await {
            return false;
        }

        match self.run_url_handlers(&url) {
            Control::Continue | Control::SkipPage => {}
            Control::SkipLink => return false,
            Control::Pause => {
                self.state = AgentState::Paused;
                return false;
            }
        }

        tracing::debug!("Queueing {} at depth {}", url, depth);
        self.queued.insert(url.clone());
        self.queue.push_back(url.clone());
        self.depths.entry(url).or_insert(depth);
        true
    }

    /// Fetches a single page through the session cache
    ///
    /// The configured politeness delay is applied before the request.
    /// Response cookies are absorbed into the jar before the page is
    /// returned. Any HTTP status yields a page; only transport errors
    /// fail.
    pub async fn get_page(&mut self, url: &Url) -> Result<Page, SpinneretError> {
        if self.config.crawler.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.crawler.delay_ms)).await;
        }

        let headers = self.prepared_headers(url);
        let client = self.sessions.client_for(url)?.clone();

        let response = client
            .get(url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|source| SpinneretError::Http {
                url: url.to_string(),
                source,
            })?;

        let code = response.status().as_u16();
        let response_headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|source| SpinneretError::Http {
                url: url.to_string(),
                source,
            })?
            .to_vec();

        tracing::debug!("Fetched {} ({}, {} bytes)", url, code, body.len());

        let page = Page::new(url.clone(), code, response_headers, body);
        self.cookies.from_page(&page);

        Ok(page)
    }

    /// Assembles the request headers for a URL
    ///
    /// Configured default headers come first, then the Host override
    /// (the first matching per-host rule wins over the global one), the
    /// User-Agent and Referer, a Basic Authorization when a stored
    /// credential scope covers the URL, and the host's cookie string.
    pub fn prepared_headers(&mut self, url: &Url) -> HeaderMap {
        let mut headers = self.default_headers.clone();
        let host = url.host_str().unwrap_or_default().to_string();

        let mut host_value = self.host_header.as_ref();
        for (pattern, value) in &self.host_header_rules {
            if pattern.matches(&host) {
                host_value = Some(value);
                break;
            }
        }
        if let Some(value) = host_value {
            headers.insert(HOST, value.clone());
        }

        headers.insert(USER_AGENT, self.user_agent.clone());

        if let Some(referer) = &self.referer {
            headers.insert(REFERER, referer.clone());
        }

        if let Some(credentials) = self.auth.for_url(url) {
            if let Ok(value) = HeaderValue::from_str(&format!("Basic {}", credentials)) {
                headers.insert(AUTHORIZATION, value);
            }
        }

        if let Some(cookie) = self.cookies.for_host(&host) {
            match HeaderValue::from_str(cookie) {
                Ok(value) => {
                    headers.insert(COOKIE, value);
                }
                Err(_) => {
                    tracing::warn!("Dropping unencodable cookie string for {}", host);
                }
            }
        }

        headers
    }

    /// Fetches and processes one dequeued URL
    async fn visit_page(&mut self, url: Url) {
        let page = match self.get_page(&url).await {
            Ok(page) => page,
            Err(err) => {
                tracing::debug!("Fetch error for {}: {}", url, err);
                self.failed(url);
                return;
            }
        };

        // The page counts as visited before any handler sees it
        self.history.insert(url.clone());

        match self.run_page_handlers(&page) {
            Control::Continue | Control::SkipLink => {}
            Control::SkipPage => return,
            Control::Pause => {
                self.state = AgentState::Paused;
                return;
            }
        }

        self.process_links(&page).await;
    }

    /// Resolves every outgoing link of a page and offers it to the
    /// queue one depth level down
    async fn process_links(&mut self, page: &Page) {
        let depth = self.depths.get(page.url()).copied().unwrap_or(0);
        let within_depth = self
            .config
            .crawler
            .max_depth
            .map_or(true, |max_depth| depth < max_depth);

        for link in page.links() {
            let Some(dest) = page.to_absolute(&link) else {
                continue;
            };

            match self.run_link_handlers(page.url(), &dest) {
                Control::Continue => {}
                Control::SkipLink => continue,
                Control::SkipPage => return,
                Control::Pause => {
                    self.state = AgentState::Paused;
                    return;
                }
            }

            // Link handlers observe every link, even past the depth limit
            if within_depth {
                self.enqueue(dest, depth + 1).await;
                if self.state == AgentState::Paused {
                    return;
                }
            }
        }
    }

    /// Records a fetch failure, drops the origin's session, and
    /// notifies the failure handlers
    fn failed(&mut self, url: Url) {
        tracing::warn!("Marking {} as failed", url);
        self.sessions.kill(&url);
        self.failures.insert(url.clone());

        for handler in self.handlers.failure.iter_mut() {
            if handler(&url) == Control::Pause {
                self.state = AgentState::Paused;
                return;
            }
        }
    }

    /// Decides whether a URL may be visited at all
    ///
    /// Already-visited and already-failed URLs are refused, then the
    /// filter dimensions run in order, then the robots policy when one
    /// is active.
    async fn may_visit(&mut self, url: &Url) -> bool {
        if self.history.contains(url) {
            return false;
        }

        if self.failures.contains(url) {
            return false;
        }

        if !self.filters.accepts(url) {
            return false;
        }

        match &mut self.robots {
            Some(robots) => robots.allowed(url).await,
            None => true,
        }
    }

    /// Runs the page handlers in registration order
    ///
    /// Only `SkipPage` and `Pause` are meaningful from a page handler;
    /// any other signal is ignored and the remaining handlers run.
    fn run_page_handlers(&mut self, page: &Page) -> Control {
        for handler in self.handlers.page.iter_mut() {
            match handler(page) {
                Control::SkipPage => return Control::SkipPage,
                Control::Pause => return Control::Pause,
                _ => {}
            }
        }

        Control::Continue
    }

    fn run_link_handlers(&mut self, origin: &Url, dest: &Url) -> Control {
        for handler in self.handlers.link.iter_mut() {
            match handler(origin, dest) {
                Control::Continue => {}
                signal => return signal,
            }
        }

        for (pattern, handler) in self.handlers.link_matching.iter_mut() {
            if pattern.matches(dest) {
                match handler(origin, dest) {
                    Control::Continue => {}
                    signal => return signal,
                }
            }
        }

        Control::Continue
    }

    /// Runs the URL handlers, general first, then pattern-scoped
    ///
    /// Only `SkipLink` and `Pause` are meaningful from a URL handler;
    /// any other signal is ignored and the remaining handlers run.
    fn run_url_handlers(&mut self, url: &Url) -> Control {
        for handler in self.handlers.url.iter_mut() {
            match handler(url) {
                Control::SkipLink => return Control::SkipLink,
                Control::Pause => return Control::Pause,
                _ => {}
            }
        }

        for (pattern, handler) in self.handlers.url_matching.iter_mut() {
            if pattern.matches(url) {
                match handler(url) {
                    Control::SkipLink => return Control::SkipLink,
                    Control::Pause => return Control::Pause,
                    _ => {}
                }
            }
        }

        Control::Continue
    }

    fn dequeue(&mut self) -> Option<Url> {
        let url = self.queue.pop_front()?;
        self.queued.remove(&url);
        Some(url)
    }

    fn limit_reached(&self) -> bool {
        self.config
            .crawler
            .max_pages
            .map_or(false, |limit| self.history.len() >= limit)
    }

    /// Applies the configured fragment and query stripping to a URL
    fn sanitized(&self, mut url: Url) -> Url {
        sanitize(
            &mut url,
            self.config.crawler.strip_fragments,
            self.config.crawler.strip_query,
        );
        url
    }

    // ============ State access ============

    /// The agent's lifecycle state
    pub fn state(&self) -> AgentState {
        self.state
    }

    /// The crawl configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// URLs visited so far
    pub fn history(&self) -> &HashSet<Url> {
        &self.history
    }

    /// URLs whose fetch failed
    pub fn failures(&self) -> &HashSet<Url> {
        &self.failures
    }

    /// URLs waiting in the queue, front first
    pub fn queue(&self) -> impl Iterator<Item = &Url> {
        self.queue.iter()
    }

    /// Number of URLs waiting in the queue
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Whether a URL has been visited
    pub fn visited(&self, url: &Url) -> bool {
        self.history.contains(url)
    }

    /// Whether a URL's fetch has failed
    pub fn failed_url(&self, url: &Url) -> bool {
        self.failures.contains(url)
    }

    /// Whether a URL is currently queued
    pub fn queued(&self, url: &Url) -> bool {
        self.queued.contains(url)
    }

    /// The depth a URL was first queued at, zero when unknown
    pub fn depth_of(&self, url: &Url) -> u32 {
        self.depths.get(url).copied().unwrap_or(0)
    }

    /// Removes a URL from the failure set so it may be retried
    ///
    /// # Returns
    ///
    /// True if the URL had been marked as failed.
    pub fn forget_failure(&mut self, url: &Url) -> bool {
        let url = self.sanitized(url.clone());
        self.failures.remove(&url)
    }

    /// The URL filters, for programmatic rule registration
    pub fn filters_mut(&mut self) -> &mut UrlFilters {
        &mut self.filters
    }

    /// The cookie jar
    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    /// The cookie jar, mutably
    pub fn cookies_mut(&mut self) -> &mut CookieJar {
        &mut self.cookies
    }

    /// The credential store, for registering Basic auth credentials
    pub fn auth_mut(&mut self) -> &mut AuthStore {
        &mut self.auth
    }

    /// Replaces the proxy and drops every cached session
    pub fn set_proxy(&mut self, proxy: ProxyConfig) {
        self.sessions.set_proxy(proxy);
    }

    /// The robots policy, when robots handling is active
    pub(crate) fn robots_mut(&mut self) -> Option<&mut RobotsPolicy> {
        self.robots.as_mut()
    }

    /// Empties the queue, history, failure set, and depth map
    pub fn clear(&mut self) {
        self.queue.clear();
        self.queued.clear();
        self.history.clear();
        self.failures.clear();
        self.depths.clear();
        self.state = AgentState::Idle;
    }

    // ============ Snapshots ============

    /// Captures the visit history and the pending queue
    pub fn snapshot(&self) -> CrawlSnapshot {
        let mut history: Vec<String> = self.history.iter().map(Url::to_string).collect();
        history.sort();

        CrawlSnapshot {
            history,
            queue: self.queue.iter().map(Url::to_string).collect(),
        }
    }

    /// Replaces the crawl state with a snapshot's history and queue
    ///
    /// URLs are sanitized on the way in so later membership checks
    /// behave exactly as during the original run. Recorded depths are
    /// reset.
    pub fn restore(&mut self, snapshot: &CrawlSnapshot) -> Result<(), SpinneretError> {
        let mut history = HashSet::new();
        for raw in &snapshot.history {
            let url = Url::parse(raw)?;
            history.insert(self.sanitized(url));
        }

        let mut queue = VecDeque::new();
        let mut queued = HashSet::new();
        for raw in &snapshot.queue {
            let url = self.sanitized(Url::parse(raw)?);
            if queued.insert(url.clone()) {
                queue.push_back(url);
            }
        }

        tracing::info!(
            "Restored {} visited and {} queued URL(s)",
            history.len(),
            queue.len()
        );

        self.history = history;
        self.queue = queue;
        self.queued = queued;
        self.depths.clear();
        Ok(())
    }
}

/// Compiles the configured default headers into a header map
fn build_default_headers(headers: &HashMap<String, String>) -> Result<HeaderMap, ConfigError> {
    let mut map = HeaderMap::new();

    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::InvalidHeader(name.clone()))?;
        let value = header_value(name.as_str(), value)?;
        map.insert(name, value);
    }

    Ok(map)
}

/// Compiles the per-host Host override rules
fn build_host_header_rules(
    rules: &[HostHeaderRule],
) -> Result<Vec<(Pattern<String>, HeaderValue)>, ConfigError> {
    let mut compiled = Vec::new();

    for rule in rules {
        let pattern = parse_pattern(&rule.host)?;
        let value = header_value("host", &rule.value)?;
        compiled.push((pattern, value));
    }

    Ok(compiled)
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value)
        .map_err(|_| ConfigError::InvalidHeader(format!("{}: {}", name, value)))
}

fn optional_header_value(
    name: &str,
    value: Option<&str>,
) -> Result<Option<HeaderValue>, ConfigError> {
    match value {
        Some(value) if !value.is_empty() => Ok(Some(header_value(name, value)?)),
        _ => Ok(None),
    }
}
