//! Crawler module for queue-driven page visiting
//!
//! This module contains the crawl engine, including:
//! - The breadth-first agent with its queue, history, and depth map
//! - Control signals returned by handlers to steer the crawl
//! - The per-dimension URL filters applied before queueing

mod agent;
mod control;
mod filters;

pub use agent::{Agent, AgentState, CrawlSnapshot};
pub use control::{Control, FailureHandler, LinkHandler, PageHandler, UrlHandler};
pub use filters::UrlFilters;
