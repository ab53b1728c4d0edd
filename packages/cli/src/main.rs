//! Spider invocation CLI.
//!
//! One retailer by slug, or `all` / `rendered-only` / `except-rendered`.
//! A single retailer failing never stops the others; the process exits
//! non-zero only when every selected retailer failed.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use compat::{CompatStore, PostgresCompatStore};
use crawler::{
    fetch_robots, CrawlEngine, CrawlOptions, CrawlReport, HttpFetcher, ItemPipeline, PageFetcher,
    PostgresProductRepository, ProductRepository, RenderFetcher, RetailerFilter, RetailerId,
    ScrapeError, USER_AGENT,
};

#[derive(Parser)]
#[command(
    name = "partscout",
    about = "PC-part retailer crawler and compatibility extractor",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl retailers: a slug, `all`, `rendered-only` or `except-rendered`
    Crawl {
        target: String,

        /// Restrict the run to one category (processor, motherboard, ram)
        #[arg(long)]
        category: Option<String>,

        /// Stop after this many items per retailer
        #[arg(long)]
        limit: Option<usize>,

        /// Persist products, prices and compatibility records
        #[arg(long)]
        save: bool,

        /// Write the collected items as JSON to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

type Sinks = (Arc<dyn ProductRepository>, Arc<dyn CompatStore>);

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Crawl {
            target,
            category,
            limit,
            save,
            output,
        } => crawl(&target, category, limit, save, output).await,
    }
}

async fn crawl(
    target: &str,
    category: Option<String>,
    limit: Option<usize>,
    save: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let filter = RetailerFilter::parse(target)?;
    let retailers = filter.resolve();
    if retailers.is_empty() {
        bail!("no enabled retailers match {target:?}");
    }

    let http: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new()?);
    let robots_client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("building robots.txt client")?;

    let sinks: Option<Sinks> = if save {
        let url = std::env::var("DATABASE_URL").context("--save requires DATABASE_URL")?;
        let repo = PostgresProductRepository::new(&url).await?;
        let store = PostgresCompatStore::new(&url).await?;
        Some((Arc::new(repo), Arc::new(store)))
    } else {
        None
    };

    let mut dumps = Vec::new();
    let mut succeeded = 0usize;
    let mut failed = 0usize;

    for retailer in retailers {
        let run = run_retailer(
            retailer,
            http.clone(),
            &robots_client,
            sinks.clone(),
            CrawlOptions {
                category: category.clone(),
                limit,
            },
        )
        .await;

        match run {
            Ok(report) => {
                succeeded += 1;
                info!(
                    retailer = %retailer,
                    items = report.items.len(),
                    pages = report.pages_fetched,
                    saved = report.saved,
                    failed = report.failed,
                    dropped = report.dropped,
                    "retailer run complete"
                );
                if output.is_some() {
                    dumps.push(serde_json::to_value(report.dump())?);
                }
            }
            Err(e) => {
                failed += 1;
                error!(retailer = %retailer, error = %e, "retailer run failed");
            }
        }
    }

    if let Some(path) = output {
        let payload = if dumps.len() == 1 {
            dumps.remove(0)
        } else {
            serde_json::Value::Array(std::mem::take(&mut dumps))
        };
        std::fs::write(&path, serde_json::to_string_pretty(&payload)?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "wrote output dump");
    }

    if succeeded == 0 && failed > 0 {
        bail!("all {failed} retailer runs failed");
    }
    Ok(())
}

async fn run_retailer(
    retailer: RetailerId,
    http: Arc<dyn PageFetcher>,
    robots_client: &reqwest::Client,
    sinks: Option<Sinks>,
    options: CrawlOptions,
) -> Result<CrawlReport, ScrapeError> {
    let config = retailer.config();
    let robots = fetch_robots(robots_client, config.base_url, USER_AGENT).await;

    let render: Option<Arc<dyn PageFetcher>> = if config.requires_rendering {
        let selector = config.next_page_selector.unwrap_or("a.next");
        Some(Arc::new(RenderFetcher::from_env(selector)?))
    } else {
        None
    };

    let pipeline = match sinks {
        Some((repo, store)) => ItemPipeline::with_persistence(config.base_url, repo, store),
        None => ItemPipeline::new(config.base_url),
    };

    CrawlEngine::new(retailer, http, render, pipeline)
        .with_robots(robots)
        .run(options)
        .await
}
