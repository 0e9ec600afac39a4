//! hsfb-scrape: High-school football scraper
//!
//! What it does:
//!   1. Fetches each state's score listing for the given date (sequentially, with a pause)
//!   2. Resolves every game detail page in parallel (bounded pool)
//!   3. Fills missing fields from team pages (cached per run)
//!   4. Drops empty records and writes the JSON document to --outdir
//!
//! Run:
//!   cargo run --bin hsfb-scrape -- --date 9/26/2025 --states tx,ok

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use logger::{EventLogger, RegionScrapedEvent, RunSummaryEvent, now_iso};
use maxpreps_scraper::{
    BatchScraper, ChromeRenderer, FetchClient, ImageRenderer, NoRenderer, Region, RunDate, ScrapeConfig,
};
use std::env;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(name = "hsfb-scrape", about = "Scrape MaxPreps football scores into a JSON document")]
struct Args {
    /// Listing date, M/D/YYYY as used in MaxPreps URLs
    #[arg(long, default_value = "9/26/2025")]
    date: String,

    /// Comma separated state codes (e.g. tx,ca,fl). Empty = all states
    #[arg(long, default_value = "")]
    states: String,

    /// Output folder for the JSON document
    #[arg(long, default_value = "data")]
    outdir: PathBuf,

    /// Folder for the JSONL run log
    #[arg(long, default_value = "logs", env = "HSFB_LOG_DIR")]
    log_dir: PathBuf,

    /// Keep empty entries (no informativeness filter)
    #[arg(long)]
    no_drop_empty: bool,

    /// Stricter filter: require at least 2 informative fields
    #[arg(long)]
    strict: bool,

    /// Process at most N game links per state
    #[arg(long)]
    max_links: Option<usize>,

    /// Parallel game page workers per state
    #[arg(long)]
    workers: Option<usize>,

    /// Use headless Chrome when logos / mascot images stay empty
    #[arg(long)]
    render_fallback: bool,
}

impl Args {
    fn apply(&self, config: &mut ScrapeConfig) {
        config.drop_empty = !self.no_drop_empty;
        config.strict = self.strict;
        if self.max_links.is_some() {
            config.max_links = self.max_links;
        }
        if let Some(workers) = self.workers {
            config.workers = workers.max(1);
        }
        config.render_fallback |= self.render_fallback;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let args = Args::parse();
    let run_date = RunDate::parse(&args.date)?;
    let regions = Region::parse_list(&args.states)?;

    let mut config = ScrapeConfig::from_env();
    args.apply(&mut config);

    // Single instance lock: two runs would race on the same output file
    let lock_file_path = env::temp_dir().join("hsfb_scrape.lock");
    let lock_file = File::create(&lock_file_path)
        .with_context(|| format!("Failed to create lock file at {:?}", lock_file_path))?;
    let mut lock = fd_lock::RwLock::new(lock_file);
    let _write_guard = match lock.try_write() {
        Ok(guard) => guard,
        Err(_) => {
            warn!("Another hsfb-scrape run is already in progress! Exiting.");
            return Ok(());
        }
    };

    info!("=== hsfb-scrape {} ===", run_date.listing_param());
    info!(
        "States: {} | workers: {} | strict: {} | drop empty: {} | render fallback: {}",
        regions.len(),
        config.workers,
        config.strict,
        config.drop_empty,
        config.render_fallback
    );

    let client = FetchClient::from_config(&config).context("HTTP client setup failed")?;
    let renderer: Arc<dyn ImageRenderer> = if config.render_fallback {
        Arc::new(ChromeRenderer::new(config.user_agent.clone()))
    } else {
        Arc::new(NoRenderer)
    };

    let strict = config.strict;
    let batch = BatchScraper::new(Arc::new(client), renderer, config);
    let outcome = batch.run(&regions, &run_date).await;

    let events = EventLogger::new(&args.log_dir);
    for report in &outcome.regions {
        let ev = RegionScrapedEvent {
            ts:       now_iso(),
            event:    "REGION_SCRAPED",
            region:   report.region.code().to_string(),
            date:     run_date.listing_param().to_string(),
            links:    report.links,
            resolved: report.resolved,
            kept:     report.kept,
            failed:   report.failures.len(),
            error:    report.error.clone(),
        };
        if let Err(e) = events.log(&ev) {
            warn!("Log write failed: {e}");
        }
    }

    let out_path = logger::write_json_array(&args.outdir, &run_date.output_file_name(), &outcome.records)?;

    let summary = RunSummaryEvent {
        ts:             now_iso(),
        event:          "RUN_SUMMARY",
        date:           run_date.listing_param().to_string(),
        regions:        outcome.regions.len(),
        regions_failed: outcome.failed_regions(),
        links_failed:   outcome.failed_links(),
        records:        outcome.records.len(),
        strict,
        output:         out_path.display().to_string(),
    };
    if let Err(e) = events.log(&summary) {
        warn!("Log write failed: {e}");
    }

    info!("Saved {} items → {}", outcome.records.len(), out_path.display());
    Ok(())
}
