use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::fetch::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://www.maxpreps.com";
pub const DEFAULT_SPORT: &str = "football";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Tunables for one scrape run.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub base_url: String,
    pub sport: String,
    pub user_agent: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    /// Width of the per-region resolution pool.
    pub workers: usize,
    /// Process at most this many detail links per region.
    pub max_links: Option<usize>,
    pub drop_empty: bool,
    pub strict: bool,
    /// Fixed part of the pause between regions.
    pub region_delay: Duration,
    /// Upper bound of the random part added to `region_delay`.
    pub region_jitter: Duration,
    pub render_fallback: bool,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            sport: DEFAULT_SPORT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            workers: 4,
            max_links: None,
            drop_empty: true,
            strict: false,
            region_delay: Duration::from_millis(400),
            region_jitter: Duration::from_millis(600),
            render_fallback: false,
        }
    }
}

impl ScrapeConfig {
    /// Defaults overridden by `HSFB_*` environment variables (call `dotenv()` first).
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(base) = env::var("HSFB_BASE_URL") {
            if !base.trim().is_empty() {
                config.base_url = base.trim().trim_end_matches('/').to_string();
            }
        }
        if let Some(attempts) = env_parse::<u32>("HSFB_RETRIES") {
            config.retry.attempts = attempts.max(1);
        }
        if let Some(base) = env_parse::<f64>("HSFB_BACKOFF_BASE") {
            config.retry.backoff_base = base;
        }
        if let Some(secs) = env_parse::<u64>("HSFB_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(workers) = env_parse::<usize>("HSFB_WORKERS") {
            config.workers = workers.max(1);
        }
        config.max_links = env_parse::<usize>("HSFB_MAX_LINKS");
        if let Some(render) = env_parse::<bool>("HSFB_RENDER_FALLBACK") {
            config.render_fallback = render;
        }

        config
    }

    pub fn listing_url(&self, region: &str, date: &str) -> String {
        format!("{}/{}/{}/scores/?date={}", self.base_url, region, self.sport, date)
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}
