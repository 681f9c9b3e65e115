//! Site-Sync main entry point
//!
//! This is the command-line interface for discovering, crawling and syncing
//! tracked sites.

use anyhow::Context;
use clap::{Parser, Subcommand};
use site_sync::config::{load_config_with_hash, Config};
use site_sync::crawler::{Coordinator, CrawlOptions};
use site_sync::storage::{BatchWriter, CrawlSummary, PageStore, RunStatus, SqliteStore};
use site_sync::sync::{spawn_sync_job, Reconciler, SyncJobRequest};
use site_sync::url::SiteRoot;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Site-Sync: keeps a stored page inventory in step with live websites
///
/// Site-Sync discovers a site's URLs from robots.txt and sitemaps, crawls
/// it with a static fetch tier and a headless fallback, and reconciles the
/// result against previously stored pages.
#[derive(Parser, Debug)]
#[command(name = "site-sync")]
#[command(version = "1.0.0")]
#[command(about = "Site discovery and crawl synchronization", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run discovery only and list the seed URLs
    Discover {
        /// Bare host (example.com) or origin (http://127.0.0.1:8080)
        domain: String,
    },

    /// Crawl a site and store every page for a user
    Crawl {
        domain: String,

        #[arg(short, long, value_name = "ID")]
        user: String,

        /// Override the configured page cap
        #[arg(long, value_name = "N")]
        max_pages: Option<usize>,
    },

    /// Crawl a site and reconcile it with the user's stored pages
    Sync {
        domain: String,

        #[arg(short, long, value_name = "ID")]
        user: String,
    },

    /// Submit a JSON sync request as a background job
    Submit {
        /// e.g. {"domain":"example.com","userId":"u1","maxPages":50}
        #[arg(value_name = "JSON")]
        request: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::debug!("No configuration file given, using defaults");
            Config::default()
        }
    };

    match cli.command {
        Command::Discover { domain } => handle_discover(&config, &domain).await,
        Command::Crawl {
            domain,
            user,
            max_pages,
        } => handle_crawl(&config, &domain, &user, max_pages).await,
        Command::Sync { domain, user } => handle_sync(&config, &domain, &user).await,
        Command::Submit { request } => handle_submit(&config, &request).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_sync=info,warn"),
            1 => EnvFilter::new("site_sync=debug,info"),
            2 => EnvFilter::new("site_sync=trace,debug"),
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

fn open_store(config: &Config) -> anyhow::Result<Arc<SqliteStore>> {
    let path = Path::new(&config.store.database_path);
    let store = SqliteStore::open(path)
        .with_context(|| format!("failed to open database {}", path.display()))?;
    Ok(Arc::new(store))
}

/// Handles `discover`: prints what the site declares about itself
async fn handle_discover(config: &Config, domain: &str) -> anyhow::Result<()> {
    let site = SiteRoot::parse(domain)?;
    let coordinator = Coordinator::new(config)?.without_renderer();
    let options = CrawlOptions::from_config(&config.crawler);

    let discovery = coordinator.discover(&site, &options).await;

    println!("Site: {}", site.root_url());
    println!("Sitemap valid: {}", discovery.sitemap_valid);
    println!("Robots.txt: {}", if discovery.robots.is_some() { "found" } else { "none" });
    println!("Seed URLs ({}):", discovery.seed_urls.len());
    for url in &discovery.seed_urls {
        println!("  {}", url);
    }

    Ok(())
}

/// Handles `crawl`: stores every collected page without reconciling
async fn handle_crawl(
    config: &Config,
    domain: &str,
    user_id: &str,
    max_pages: Option<usize>,
) -> anyhow::Result<()> {
    let site = SiteRoot::parse(domain)?;
    let store = open_store(config)?;
    let coordinator = Coordinator::new(config)?;

    let mut options = CrawlOptions::from_config(&config.crawler);
    if let Some(max_pages) = max_pages {
        options = options.with_max_pages(max_pages);
    }

    let report = match coordinator.crawl(&site, &options).await {
        Ok(report) => report,
        Err(e) => {
            store
                .update_crawl_summary(user_id, site.host(), &CrawlSummary::failed())
                .await?;
            return Err(e.into());
        }
    };

    let writer = BatchWriter::new(store.clone(), config.sync.write_batch_size);
    let written = writer.store_batch(user_id, &report.pages).await;
    store
        .update_crawl_summary(
            user_id,
            site.host(),
            &CrawlSummary {
                page_count: report.pages.len(),
                sitemap_valid: report.sitemap_valid,
                status: RunStatus::Completed,
            },
        )
        .await?;

    for page in &report.pages {
        println!("{}", serde_json::to_string(page)?);
    }
    tracing::info!(
        "Stored {} of {} pages ({} failed URLs, {} skipped)",
        written.written(),
        report.pages.len(),
        report.failed.len(),
        report.skipped
    );
    for error in &written.errors {
        tracing::error!("{}", error);
    }

    Ok(())
}

/// Handles `sync`: full reconciliation, result printed as JSON
async fn handle_sync(config: &Config, domain: &str, user_id: &str) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let reconciler = Reconciler::new(config, store)?;

    let result = reconciler.sync(domain, user_id).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

/// Handles `submit`: acknowledges at once, then waits for the job
async fn handle_submit(config: &Config, request: &str) -> anyhow::Result<()> {
    let request: SyncJobRequest =
        serde_json::from_str(request).context("invalid sync request")?;
    let store = open_store(config)?;
    let reconciler = Arc::new(Reconciler::new(config, store)?);

    let (ack, handle) = spawn_sync_job(reconciler, request)?;
    println!("{}", serde_json::to_string(&ack)?);

    handle.await.context("sync job panicked")?;
    Ok(())
}
