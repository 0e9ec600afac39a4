//! One region's listing page fanned out over a bounded pool of resolver tasks.

use futures_util::stream::{self, StreamExt};
use reqwest::Url;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ScrapeConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::fetch::PageSource;
use crate::game::GameResolver;
use crate::record::{EventRecord, Region, RunDate};

const GAME_LINKS: &str = r#"a[href*="/game/"]"#;
const LOOSE_LINKS: &str = ".c a";

/// A detail link that could not be resolved. Recorded, then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFailure {
    pub url: String,
    pub error: ScrapeError,
}

#[derive(Debug, Clone, Default)]
pub struct RegionOutcome {
    /// Distinct detail links discovered (after the optional cap).
    pub links: Vec<String>,
    /// Resolved records in completion order.
    pub records: Vec<EventRecord>,
    pub failures: Vec<LinkFailure>,
}

fn join_all_hrefs(doc: &Html, css: &str, base: &Url, require_game: bool) -> Vec<String> {
    let Ok(sel) = Selector::parse(css) else {
        return Vec::new();
    };
    doc.select(&sel)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| !require_game || href.contains("/game/"))
        .filter_map(|href| base.join(href.trim()).ok())
        .map(String::from)
        .collect()
}

/// Detail links on a listing page: absolute, deduplicated and sorted.
pub fn discover_game_links(html: &str, base_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        warn!("Base URL {:?} is not absolute; no links discovered", base_url);
        return Vec::new();
    };
    let doc = Html::parse_document(html);
    let mut links = join_all_hrefs(&doc, GAME_LINKS, &base, true);
    if links.is_empty() {
        debug!("No /game/ links, trying loose selector {}", LOOSE_LINKS);
        links = join_all_hrefs(&doc, LOOSE_LINKS, &base, false);
    }
    links.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

pub struct RegionScraper {
    source: Arc<dyn PageSource>,
    resolver: Arc<GameResolver>,
    config: ScrapeConfig,
}

impl RegionScraper {
    pub fn new(source: Arc<dyn PageSource>, resolver: Arc<GameResolver>, config: ScrapeConfig) -> Self {
        Self {
            source,
            resolver,
            config,
        }
    }

    /// Fails only when the listing page itself cannot be fetched.
    pub async fn scrape_region(&self, region: &Region, run_date: &RunDate) -> ScrapeResult<RegionOutcome> {
        let url = self
            .config
            .listing_url(region.code(), run_date.listing_param());
        let html = self.source.fetch_page(&url).await?;

        let mut links = discover_game_links(&html, &self.config.base_url);
        if let Some(cap) = self.config.max_links {
            links.truncate(cap);
        }
        info!("[{}] {} game links from {}", region, links.len(), url);

        let workers = self.config.workers.max(1);
        let mut completed = stream::iter(links.clone())
            .map(|link| {
                let resolver = Arc::clone(&self.resolver);
                let run_date = run_date.clone();
                let region = region.clone();
                async move {
                    let handle = tokio::spawn({
                        let link = link.clone();
                        async move { resolver.resolve(&link, &run_date, Some(&region)).await }
                    });
                    let result = handle
                        .await
                        .unwrap_or_else(|e| Err(ScrapeError::Worker(e.to_string())));
                    (link, result)
                }
            })
            .buffer_unordered(workers);

        let mut outcome = RegionOutcome {
            links,
            ..RegionOutcome::default()
        };
        while let Some((link, result)) = completed.next().await {
            match result {
                Ok(record) => outcome.records.push(record),
                Err(error) => {
                    warn!("[{}] dropping {}: {}", region, link, error);
                    outcome.failures.push(LinkFailure { url: link, error });
                }
            }
        }

        info!(
            "[{}] resolved {} / {} ({} failed)",
            region,
            outcome.records.len(),
            outcome.links.len(),
            outcome.failures.len()
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::TeamEnrichmentCache;
    use crate::error::FetchError;
    use crate::render::NoRenderer;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const BASE: &str = "https://www.maxpreps.com";

    struct FakeSite {
        pages: HashMap<String, String>,
        fetches: Mutex<Vec<String>>,
    }

    impl FakeSite {
        fn new(pages: Vec<(String, String)>) -> Arc<Self> {
            Arc::new(Self {
                pages: pages.into_iter().collect(),
                fetches: Mutex::new(Vec::new()),
            })
        }

        fn fetch_count(&self, url: &str) -> usize {
            self.fetches
                .lock()
                .unwrap()
                .iter()
                .filter(|u| *u == url)
                .count()
        }
    }

    #[async_trait]
    impl PageSource for FakeSite {
        async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
            self.fetches.lock().unwrap().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::status(404, url))
        }
    }

    fn game(a: &str, b: &str) -> String {
        format!(
            r#"<html><body>
            <div class="team-overview__team"><div class="team-overview__team-name">{a}</div></div>
            <div class="team-overview__team"><div class="team-overview__team-name">{b}</div></div>
            <p class="contest-location">Home Field, TX</p>
            </body></html>"#
        )
    }

    fn scraper(site: Arc<FakeSite>, config: ScrapeConfig) -> RegionScraper {
        let renderer = Arc::new(NoRenderer);
        let teams = Arc::new(TeamEnrichmentCache::new(site.clone(), renderer.clone()));
        let resolver = Arc::new(GameResolver::new(site.clone(), teams, renderer, &config));
        RegionScraper::new(site, resolver, config)
    }

    fn listing_url() -> String {
        ScrapeConfig::default().listing_url("tx", "9/26/2025")
    }

    #[test]
    fn links_are_absolute_deduplicated_and_sorted() {
        let html = r#"<a href="/tx/b/game/2">b</a><a href="https://www.maxpreps.com/tx/a/game/1">a</a>
            <a href="/tx/b/game/2">again</a><a href="/tx/team/">team</a>"#;
        assert_eq!(
            discover_game_links(html, BASE),
            vec![
                "https://www.maxpreps.com/tx/a/game/1".to_string(),
                "https://www.maxpreps.com/tx/b/game/2".to_string(),
            ]
        );
    }

    #[test]
    fn loose_selector_only_when_no_game_links() {
        let html = r#"<div class="c"><a href="/games/x.htm">x</a></div>"#;
        assert_eq!(
            discover_game_links(html, BASE),
            vec!["https://www.maxpreps.com/games/x.htm".to_string()]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn duplicate_links_resolve_once_and_failures_are_dropped() {
        let listing = r#"<a href="/tx/game/1">1</a><a href="/tx/game/2">2</a>
            <a href="/tx/game/1">1 again</a><a href="/tx/game/missing">gone</a>"#;
        let site = FakeSite::new(vec![
            (listing_url(), listing.to_string()),
            (format!("{BASE}/tx/game/1"), game("Lincoln", "Eastside")),
            (format!("{BASE}/tx/game/2"), game("Austin", "Bowie")),
        ]);
        let scraper = scraper(site.clone(), ScrapeConfig::default());
        let region = Region::parse("tx").unwrap();

        let outcome = scraper
            .scrape_region(&region, &RunDate::parse("9/26/2025").unwrap())
            .await
            .unwrap();

        assert_eq!(outcome.links.len(), 3);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].url, format!("{BASE}/tx/game/missing"));
        assert_eq!(site.fetch_count(&format!("{BASE}/tx/game/1")), 1);
        assert_eq!(site.fetch_count(&format!("{BASE}/tx/game/2")), 1);

        let mut names: Vec<_> = outcome.records.iter().map(|r| r.team_a.clone()).collect();
        names.sort();
        assert_eq!(names, ["Austin", "Lincoln"]);
    }

    #[tokio::test]
    async fn link_cap_limits_work() {
        let listing = r#"<a href="/tx/game/1">1</a><a href="/tx/game/2">2</a>"#;
        let site = FakeSite::new(vec![
            (listing_url(), listing.to_string()),
            (format!("{BASE}/tx/game/1"), game("Lincoln", "Eastside")),
            (format!("{BASE}/tx/game/2"), game("Austin", "Bowie")),
        ]);
        let config = ScrapeConfig {
            max_links: Some(1),
            ..ScrapeConfig::default()
        };
        let outcome = scraper(site.clone(), config)
            .scrape_region(&Region::parse("tx").unwrap(), &RunDate::parse("9/26/2025").unwrap())
            .await
            .unwrap();

        assert_eq!(outcome.links, vec![format!("{BASE}/tx/game/1")]);
        assert_eq!(site.fetch_count(&format!("{BASE}/tx/game/2")), 0);
    }

    #[tokio::test]
    async fn missing_listing_fails_the_region() {
        let site = FakeSite::new(vec![]);
        let err = scraper(site, ScrapeConfig::default())
            .scrape_region(&Region::parse("tx").unwrap(), &RunDate::parse("9/26/2025").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Fetch(FetchError::Status { status: 404, .. })));
    }
}
