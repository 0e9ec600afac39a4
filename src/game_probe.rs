//! Resolves a single MaxPreps game page and prints the record
//! Run: cargo run --bin game-probe -- <game-url> --date 9/26/2025 --state tx

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use maxpreps_scraper::{
    is_informative, informativeness, ChromeRenderer, FetchClient, GameResolver, ImageRenderer, NoRenderer, Region,
    RunDate, ScrapeConfig, TeamEnrichmentCache,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(name = "game-probe", about = "Resolve one game detail page and print it as JSON")]
struct Args {
    /// Absolute game detail URL
    url: String,

    /// Listing date the game belongs to (M/D/YYYY)
    #[arg(long, default_value = "9/26/2025")]
    date: String,

    /// State code used as the last-resort location hint
    #[arg(long)]
    state: Option<String>,

    /// Use headless Chrome for missing logos / mascot images
    #[arg(long)]
    render_fallback: bool,
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
    let region = args.state.as_deref().map(Region::parse).transpose()?;

    let mut config = ScrapeConfig::from_env();
    config.render_fallback |= args.render_fallback;

    info!("🩺 Probing {}", args.url);

    let source = Arc::new(FetchClient::from_config(&config).context("HTTP client setup failed")?);
    let renderer: Arc<dyn ImageRenderer> = if config.render_fallback {
        Arc::new(ChromeRenderer::new(config.user_agent.clone()))
    } else {
        Arc::new(NoRenderer)
    };
    let teams = Arc::new(TeamEnrichmentCache::new(source.clone(), renderer.clone()));
    let resolver = GameResolver::new(source, teams, renderer, &config);

    let record = resolver.resolve(&args.url, &run_date, region.as_ref()).await?;

    let signals = informativeness(&record);
    if is_informative(&record, config.strict) {
        info!("Resolved {} vs {} ({} signals)", record.team_a, record.team_b, signals);
    } else {
        warn!("Record would be dropped by the filter ({} signals)", signals);
    }
    info!("Team pages fetched: {}", resolver.team_cache().len());

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
