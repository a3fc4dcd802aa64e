//! Spinneret main entry point
//!
//! This is the command-line interface for the Spinneret web spider.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use spinneret::config::{load_config_with_hash, Config};
use spinneret::crawler::{Agent, AgentState, Control, CrawlSnapshot};
use spinneret::rules::Pattern;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Spinneret: a rule-driven web spider
///
/// Spinneret crawls websites breadth-first, filtering URLs through
/// configurable accept/reject rules and respecting robots.txt. Every
/// visited page is printed with its status code.
#[derive(Parser, Debug)]
#[command(name = "spinneret")]
#[command(version = "1.0.0")]
#[command(about = "A rule-driven web spider", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Additional seed URL, added to the configured seeds (repeatable)
    #[arg(short, long, value_name = "URL")]
    seed: Vec<String>,

    /// Restrict the crawl to the hosts of the seed URLs
    #[arg(long)]
    same_host: bool,

    /// Load crawl state from a TOML file before running
    #[arg(long, value_name = "FILE")]
    load_state: Option<PathBuf>,

    /// Save crawl state to a TOML file when the run stops
    #[arg(long, value_name = "FILE")]
    save_state: Option<PathBuf>,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Command-line seeds extend the configured ones
    config.seeds.extend(cli.seed.iter().cloned());
    let seeds = parse_seeds(&config.seeds)?;

    if cli.dry_run {
        return handle_dry_run(&config, &seeds);
    }

    handle_crawl(config, seeds, &cli).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("spinneret=info,warn"),
            1 => EnvFilter::new("spinneret=debug,info"),
            2 => EnvFilter::new("spinneret=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Parses each seed string into a URL
fn parse_seeds(seeds: &[String]) -> anyhow::Result<Vec<Url>> {
    let mut parsed = Vec::new();

    for seed in seeds {
        let url = Url::parse(seed).with_context(|| format!("invalid seed URL '{}'", seed))?;
        parsed.push(url);
    }

    Ok(parsed)
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, seeds: &[Url]) -> anyhow::Result<()> {
    println!("=== Spinneret Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", limit_text(config.crawler.max_depth));
    println!("  Max pages: {}", limit_text(config.crawler.max_pages));
    println!("  Delay: {}ms", config.crawler.delay_ms);
    println!("  Strip fragments: {}", config.crawler.strip_fragments);
    println!("  Strip query: {}", config.crawler.strip_query);
    println!("  Respect robots.txt: {}", config.crawler.respect_robots);
    println!("  Sitemap seeding: {}", config.crawler.sitemap);

    println!("\nHTTP Client:");
    println!("  User-Agent: {}", config.client.user_agent);
    println!("  Open timeout: {}s", config.client.open_timeout);
    println!("  Read timeout: {}s", config.client.read_timeout);
    println!("  Default headers: {}", config.client.headers.len());
    println!("  Host header rules: {}", config.client.host_headers.len());
    if let Some(proxy_url) = config.client.proxy.url() {
        println!("  Proxy: {}", proxy_url);
    }

    let filters = &config.filters;
    println!("\nFilter Rules:");
    println!(
        "  Accept: {} scheme, {} host, {} port, {} link, {} url, {} extension",
        filters.schemes_accept.len(),
        filters.hosts_accept.len(),
        filters.ports_accept.len(),
        filters.links_accept.len(),
        filters.urls_accept.len(),
        filters.extensions_accept.len()
    );
    println!(
        "  Reject: {} scheme, {} host, {} port, {} link, {} url, {} extension",
        filters.schemes_reject.len(),
        filters.hosts_reject.len(),
        filters.ports_reject.len(),
        filters.links_reject.len(),
        filters.urls_reject.len(),
        filters.extensions_reject.len()
    );

    println!("\nSeed URLs ({}):", seeds.len());
    for seed in seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling with {} seed URL(s)", seeds.len());

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, seeds: Vec<Url>, cli: &Cli) -> anyhow::Result<()> {
    let sitemap_enabled = config.crawler.sitemap;
    let mut agent = Agent::new(config).context("failed to build the crawl agent")?;

    if cli.same_host {
        restrict_to_seed_hosts(&mut agent, &seeds);
    }

    if let Some(path) = &cli.load_state {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read state file {}", path.display()))?;
        let snapshot: CrawlSnapshot = toml::from_str(&content)
            .with_context(|| format!("failed to parse state file {}", path.display()))?;
        agent.restore(&snapshot)?;
    }

    agent.on_page(|page| {
        println!("{} {}", page.code(), page.url());
        Control::Continue
    });

    let started = Instant::now();

    for seed in &seeds {
        agent.enqueue(seed.clone(), 0).await;
    }

    if sitemap_enabled {
        for seed in &seeds {
            agent.seed_from_sitemaps(seed).await;
        }
    }

    agent.run().await;

    if agent.state() == AgentState::Paused {
        tracing::warn!("Crawl paused by a handler; save the state to resume later");
    }

    if let Some(path) = &cli.save_state {
        let snapshot = agent.snapshot();
        let content =
            toml::to_string_pretty(&snapshot).context("failed to encode crawl state")?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write state file {}", path.display()))?;
        tracing::info!("Saved crawl state to {}", path.display());
    }

    println!(
        "Visited {} page(s), {} failure(s), {} still queued in {:.2?}",
        agent.history().len(),
        agent.failures().len(),
        agent.queue_len(),
        started.elapsed()
    );

    Ok(())
}

/// Adds accept rules so only the seed URLs' hosts are crawled
fn restrict_to_seed_hosts(agent: &mut Agent, seeds: &[Url]) {
    let hosts: HashSet<String> = seeds
        .iter()
        .filter_map(|seed| seed.host_str().map(str::to_string))
        .collect();

    for host in hosts {
        tracing::info!("Restricting crawl to host {}", host);
        agent.filters_mut().hosts.accept(Pattern::exact(host));
    }
}

fn limit_text<T: std::fmt::Display>(limit: Option<T>) -> String {
    match limit {
        Some(value) => value.to_string(),
        None => "unlimited".to_string(),
    }
}
