//! Dragnet main entry point
//!
//! Command-line interface for the dragnet web scraper.

use clap::Parser;
use dragnet::sink::{ConsoleSink, CsvFileSink};
use dragnet::{crawler, CrawlConfig, ResultSink};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Dragnet: a regex-driven concurrent web scraper
///
/// Dragnet crawls a website from a seed address, extracts data matching the
/// target pattern's `target` capture group from every page, and optionally
/// follows discovered links up to a maximum depth. Results stream to stdout
/// as CSV, or to a file.
#[derive(Parser, Debug)]
#[command(name = "dragnet")]
#[command(version)]
#[command(about = "A regex-driven concurrent web scraper", long_about = None)]
struct Cli {
    /// Address of the webpage to start scraping from
    #[arg(short = 'w', long = "web-addr", value_name = "ADDRESS")]
    web_addr: String,

    /// Regex pattern with a `target` named capture group selecting the data
    /// to extract
    #[arg(short = 'r', long = "regex", value_name = "PATTERN")]
    target_regex: String,

    /// Proxy server address to route requests through (repeatable)
    #[arg(short = 'p', long = "proxy", value_name = "ADDRESS")]
    proxy: Vec<String>,

    /// User agent string to rotate through (repeatable)
    #[arg(short = 'a', long = "user-agent", value_name = "AGENT")]
    user_agent: Vec<String>,

    /// Do not send requests through the host's own connection
    #[arg(long)]
    no_direct: bool,

    /// Write results to a CSV file instead of stdout
    #[arg(short = 'f', long = "output-file", value_name = "FILE")]
    output_file: Option<PathBuf>,

    /// Maximum depth of link following; 0 scrapes only the starting page
    #[arg(short = 'd', long = "max-depth", default_value_t = 0)]
    max_depth: u32,

    /// Only follow links staying on the starting address's domain
    #[arg(long)]
    same_domain: bool,

    /// Skip addresses that were already scheduled once
    #[arg(long)]
    dedup: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let sink: Box<dyn ResultSink> = match &cli.output_file {
        Some(path) => {
            tracing::info!("Writing results to {}", path.display());
            Box::new(CsvFileSink::new(path)?)
        }
        None => Box::new(ConsoleSink::new()),
    };

    let mut config = CrawlConfig::new(&cli.web_addr, &cli.target_regex, sink);
    config.proxy_addresses = cli.proxy;
    config.use_host_transport = !cli.no_direct;
    config.max_depth = cli.max_depth;
    config.stay_on_domain = cli.same_domain;
    config.dedup_links = cli.dedup;
    if !cli.user_agent.is_empty() {
        config.user_agents = Some(cli.user_agent);
    }

    match crawler::crawl(config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Sets up the tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("dragnet=info,warn"),
            1 => EnvFilter::new("dragnet=debug,info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
