//! Likes-Harvester main entry point
//!
//! This is the command-line interface for the Likes-Harvester media downloader.

use clap::{CommandFactory, Parser};
use likes_harvester::config::{load_config_with_hash, validate, Config};
use likes_harvester::crawler::crawl;
use likes_harvester::output::print_summary;
use likes_harvester::session::Credentials;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Name of the default download folder
const DEFAULT_FOLDER: &str = "tumblr-downloads";

/// Likes-Harvester: downloads every photo and video from your liked posts
///
/// Logs into the account, walks the likes feed page by page with a pool of
/// workers and saves each media file once into the destination folder.
#[derive(Parser, Debug)]
#[command(name = "likes-harvester")]
#[command(version)]
#[command(about = "Download all media from your liked posts", long_about = None)]
struct Cli {
    /// Account email
    #[arg(value_name = "EMAIL")]
    email: Option<String>,

    /// Account password
    #[arg(value_name = "PASSWORD")]
    password: Option<String>,

    /// Page to start from
    #[arg(short, long, value_name = "N")]
    page: Option<u64>,

    /// Folder media is saved into
    #[arg(short, long, value_name = "DIR")]
    dest: Option<PathBuf>,

    /// Feed URL to crawl
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Number of pages crawled in parallel
    #[arg(short, long, value_name = "N")]
    concurrency: Option<u32>,

    /// Number of downloads running at once
    #[arg(long, value_name = "N")]
    download_concurrency: Option<u32>,

    /// Path to TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Validate config and show what would be crawled without logging in
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
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((cfg, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    cfg
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => Config::default(),
    };

    apply_overrides(&mut config, &cli);
    validate(&config)?;

    let destination = resolve_destination(&config);

    if cli.dry_run {
        handle_dry_run(&config, &destination);
        return Ok(());
    }

    let credentials = match (cli.email.as_deref(), cli.password.as_deref()) {
        (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
            Credentials::new(email, password)
        }
        _ => {
            Cli::command().print_help()?;
            std::process::exit(1);
        }
    };

    handle_harvest(config, credentials, destination).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("likes_harvester=info,warn"),
            1 => EnvFilter::new("likes_harvester=debug,info"),
            2 => EnvFilter::new("likes_harvester=trace,debug"),
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

/// Command-line flags win over the config file
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(page) = cli.page {
        config.crawler.start_page = page;
    }
    if let Some(url) = &cli.url {
        config.crawler.base_url = url.clone();
    }
    if let Some(concurrency) = cli.concurrency {
        config.crawler.concurrency = concurrency;
    }
    if let Some(limit) = cli.download_concurrency {
        config.download.concurrency = limit;
    }
    if let Some(dest) = &cli.dest {
        config.download.destination = Some(dest.clone());
    }
}

/// Configured folder, else `<downloads>/tumblr-downloads`, else the
/// working directory
fn resolve_destination(config: &Config) -> PathBuf {
    if let Some(dest) = &config.download.destination {
        return dest.clone();
    }
    match dirs::download_dir() {
        Some(dir) => dir.join(DEFAULT_FOLDER),
        None => PathBuf::from(DEFAULT_FOLDER),
    }
}

/// Handles the --dry-run mode: shows the resolved settings
fn handle_dry_run(config: &Config, destination: &Path) {
    println!("=== Likes-Harvester Dry Run ===\n");

    println!("Crawler:");
    println!("  Feed URL: {}", config.crawler.base_url);
    println!("  Start page: {}", config.crawler.start_page);
    println!("  Workers: {}", config.crawler.concurrency);
    println!(
        "  Stop after {} empty pages per worker",
        config.crawler.empty_page_limit
    );
    println!(
        "  Navigation attempts: {}",
        config.crawler.navigation_attempts
    );

    println!("\nDownloads:");
    println!("  Destination: {}", destination.display());
    println!("  Concurrent downloads: {}", config.download.concurrency);
    println!("  Attempts per file: {}", config.download.max_attempts);

    println!("\nSession:");
    println!("  Login URL: {}", config.session.login_url);
    println!("  Dashboard URL: {}", config.session.dashboard_url);
    println!("  User agent: {}", config.session.user_agent);

    println!("\nRequest filter:");
    println!("  Content domain: {}", config.filter.content_domain);
    for fragment in &config.filter.blocked_fragments {
        println!("  - blocks URLs containing {}", fragment);
    }
    for url in &config.filter.blocked_urls {
        println!("  - blocks {}", url);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main harvest operation
async fn handle_harvest(
    config: Config,
    credentials: Credentials,
    destination: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    tokio::fs::create_dir_all(&destination).await?;

    println!(
        "Downloading likes to {} (starting at page {}, {} workers, {} parallel downloads)",
        destination.display(),
        config.crawler.start_page,
        config.crawler.concurrency,
        config.download.concurrency
    );

    let start = Instant::now();
    match crawl(&config, &credentials, destination).await {
        Ok(summary) => {
            println!();
            print_summary(&summary);
            tracing::info!("Harvest finished in {:.1}s", start.elapsed().as_secs_f64());
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
