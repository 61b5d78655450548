//! Site-Harvester main entry point
//!
//! This is the command-line interface for the Site-Harvester crawler.

use anyhow::Context;
use clap::Parser;
use site_harvester::config::{load_config_with_hash, Config};
use site_harvester::output::print_coverage;
use site_harvester::{ScrapeRequest, ScrapeService};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Site-Harvester: a domain-bounded site crawler and fact extractor
///
/// Site-Harvester crawls one website within its own domain, extracts text,
/// images, contacts, products, social links and page metadata, and stores
/// one JSON document per data type.
#[derive(Parser, Debug)]
#[command(name = "site-harvester")]
#[command(version)]
#[command(about = "A domain-bounded site crawler and fact extractor", long_about = None)]
struct Cli {
    /// Website URL to scrape
    #[arg(value_name = "URL")]
    url: String,

    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Company name (derived from the URL when omitted)
    #[arg(long)]
    company_name: Option<String>,

    /// Maximum crawl depth, 1-5 (overrides config)
    #[arg(long)]
    max_depth: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and request, show what would be crawled, then exit
    #[arg(long, conflicts_with = "summary")]
    dry_run: bool,

    /// Print a coverage report after the JSON response
    #[arg(long)]
    summary: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, config_hash) = match &cli.config {
        Some(path) => load_config_with_hash(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => (Config::default(), "defaults".to_string()),
    };

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet, &config.logging.level);
    tracing::info!("Configuration loaded (hash: {})", config_hash);

    let request = ScrapeRequest {
        url: cli.url.clone(),
        company_name: cli.company_name.clone(),
        max_depth: cli.max_depth,
    };

    if cli.dry_run {
        return handle_dry_run(&config, &request);
    }

    let service = ScrapeService::from_config(config).context("Failed to start scrape service")?;
    let (response, result) = service.scrape_with_result(&request).await;

    println!("{}", serde_json::to_string_pretty(&response)?);

    if cli.summary {
        if let Some(result) = &result {
            println!();
            print_coverage(result);
        }
    }

    if !response.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool, configured: &str) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new(format!("site_harvester={},warn", configured))
            }),
            1 => EnvFilter::new("site_harvester=debug,info"),
            2 => EnvFilter::new("site_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles the --dry-run mode: validates the request and shows the settings
fn handle_dry_run(config: &Config, request: &ScrapeRequest) -> anyhow::Result<()> {
    let validated = request
        .validate(config.crawler.max_depth)
        .context("Invalid scrape request")?;

    println!("=== Site-Harvester Dry Run ===\n");

    println!("Request:");
    println!("  URL: {}", validated.url);
    println!("  Company: {}", validated.company_name);
    println!("  Max depth: {}", validated.max_depth);

    println!("\nCrawler Configuration:");
    println!(
        "  Concurrency: {} (max requests {}, expansion {})",
        config.crawler.effective_concurrency(),
        config.crawler.max_concurrent_requests,
        config.crawler.expansion_concurrency
    );
    println!("  Page timeout: {}s", config.crawler.page_timeout_secs);
    println!("  Session timeout: {}s", config.crawler.session_timeout_secs);
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!("  Max pages: {}", config.crawler.max_pages);
    match config.crawler.links_per_page {
        Some(n) => println!("  Links per page: {}", n),
        None => println!("  Links per page: unlimited"),
    }

    println!("\nUser Agent:");
    println!("  Primary: {}", config.user_agent.header_value());
    println!("  Fallback: {}", config.fallback.user_agent);
    println!("  Fallback timeout: {}s", config.fallback.timeout_secs);

    println!("\nStorage:");
    println!("  Backend: {:?}", config.storage.backend);
    println!("  Base path: {}", config.storage.base_path);
    println!("  Database: {}", config.storage.database_path);

    println!("\n✓ Configuration is valid");
    Ok(())
}
