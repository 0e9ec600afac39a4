//! Sequential multi-region runs and the informativeness filter.

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ScrapeConfig;
use crate::enrichment::TeamEnrichmentCache;
use crate::fetch::{Pacer, PageSource, TokioPacer};
use crate::game::GameResolver;
use crate::record::{EventRecord, Region, RunDate};
use crate::region::{LinkFailure, RegionScraper};
use crate::render::ImageRenderer;

/// Number of secondary signals a record carries. Paired A/B fields count once;
/// a state taken from the region hint does not count.
pub fn informativeness(record: &EventRecord) -> usize {
    let filled = |v: &str| !v.trim().is_empty();
    [
        filled(&record.kick),
        filled(&record.description),
        filled(&record.city),
        filled(&record.state) && !record.state_hinted,
        filled(&record.venue),
        filled(&record.mascot_a) || filled(&record.mascot_b),
        filled(&record.mascot_img_a) || filled(&record.mascot_img_b),
        filled(&record.logo_a) || filled(&record.logo_b),
    ]
    .into_iter()
    .filter(|hit| *hit)
    .count()
}

/// Resolved team identity plus at least one (lenient) or two (strict) signals.
pub fn is_informative(record: &EventRecord, strict: bool) -> bool {
    if !record.is_resolved() {
        return false;
    }
    informativeness(record) >= if strict { 2 } else { 1 }
}

#[derive(Debug, Clone)]
pub struct RegionReport {
    pub region: Region,
    pub links: usize,
    pub resolved: usize,
    pub kept: usize,
    pub failures: Vec<LinkFailure>,
    /// Set when the whole region was skipped.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub records: Vec<EventRecord>,
    pub regions: Vec<RegionReport>,
}

impl BatchOutcome {
    pub fn failed_regions(&self) -> usize {
        self.regions.iter().filter(|r| r.error.is_some()).count()
    }

    pub fn failed_links(&self) -> usize {
        self.regions.iter().map(|r| r.failures.len()).sum()
    }
}

pub struct BatchScraper {
    regions: RegionScraper,
    teams: Arc<TeamEnrichmentCache>,
    pacer: Arc<dyn Pacer>,
    config: ScrapeConfig,
}

impl BatchScraper {
    pub fn new(source: Arc<dyn PageSource>, renderer: Arc<dyn ImageRenderer>, config: ScrapeConfig) -> Self {
        Self::with_pacer(source, renderer, Arc::new(TokioPacer), config)
    }

    pub fn with_pacer(
        source: Arc<dyn PageSource>,
        renderer: Arc<dyn ImageRenderer>,
        pacer: Arc<dyn Pacer>,
        config: ScrapeConfig,
    ) -> Self {
        let teams = Arc::new(TeamEnrichmentCache::new(source.clone(), renderer.clone()));
        let resolver = Arc::new(GameResolver::new(source.clone(), teams.clone(), renderer, &config));
        Self {
            regions: RegionScraper::new(source, resolver, config.clone()),
            teams,
            pacer,
            config,
        }
    }

    pub fn team_cache(&self) -> &TeamEnrichmentCache {
        &self.teams
    }

    /// Scrapes `regions` one after another, pausing politely in between.
    pub async fn run(&self, regions: &[Region], run_date: &RunDate) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for (i, region) in regions.iter().enumerate() {
            if i > 0 {
                let pause = self.config.region_delay + self.pacer.jitter(self.config.region_jitter);
                self.pacer.pause(pause).await;
            }

            let report = match self.regions.scrape_region(region, run_date).await {
                Ok(scraped) => {
                    let resolved = scraped.records.len();
                    let mut kept: Vec<EventRecord> = if self.config.drop_empty {
                        scraped
                            .records
                            .into_iter()
                            .filter(|r| is_informative(r, self.config.strict))
                            .collect()
                    } else {
                        scraped.records
                    };
                    let report = RegionReport {
                        region: region.clone(),
                        links: scraped.links.len(),
                        resolved,
                        kept: kept.len(),
                        failures: scraped.failures,
                        error: None,
                    };
                    outcome.records.append(&mut kept);
                    report
                }
                Err(e) => {
                    warn!("[{}] region skipped: {}", region, e);
                    RegionReport {
                        region: region.clone(),
                        links: 0,
                        resolved: 0,
                        kept: 0,
                        failures: Vec::new(),
                        error: Some(e.to_string()),
                    }
                }
            };
            outcome.regions.push(report);
        }

        info!(
            "Batch done: {} records from {} regions ({} skipped, {} links dropped, {} teams cached)",
            outcome.records.len(),
            regions.len(),
            outcome.failed_regions(),
            outcome.failed_links(),
            self.teams.len()
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::record::{DEFAULT_TEAM_A, DEFAULT_TEAM_B};
    use crate::render::NoRenderer;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    fn named() -> EventRecord {
        EventRecord {
            team_a: "Lincoln".into(),
            team_b: "Eastside".into(),
            ..EventRecord::default()
        }
    }

    #[test]
    fn placeholders_never_pass() {
        let rich = EventRecord {
            kick: "2025-09-26T19:00:00".into(),
            venue: "Field".into(),
            city: "Austin".into(),
            state: "TX".into(),
            ..EventRecord::default()
        };
        assert_eq!(rich.team_a, DEFAULT_TEAM_A);
        assert_eq!(rich.team_b, DEFAULT_TEAM_B);
        assert!(!is_informative(&rich, false));
        assert!(!is_informative(&rich, true));

        let blank_names = EventRecord {
            team_a: String::new(),
            team_b: String::new(),
            ..rich
        };
        assert!(!is_informative(&blank_names, false));
    }

    #[test]
    fn one_signal_is_lenient_only() {
        let record = EventRecord {
            venue: "Eastside Stadium".into(),
            ..named()
        };
        assert!(is_informative(&record, false));
        assert!(!is_informative(&record, true));
    }

    #[test]
    fn zero_signals_fail_both_modes() {
        assert!(!is_informative(&named(), false));
        assert!(!is_informative(&named(), true));
    }

    #[test]
    fn paired_fields_count_once() {
        let record = EventRecord {
            mascot_a: "Lions".into(),
            mascot_b: "Eagles".into(),
            ..named()
        };
        assert_eq!(informativeness(&record), 1);
        assert!(!is_informative(&record, true));

        let two = EventRecord {
            logo_b: "https://cdn.test/l.png".into(),
            ..record
        };
        assert!(is_informative(&two, true));
    }

    #[test]
    fn one_resolved_name_is_enough() {
        let record = EventRecord {
            team_b: "Eastside".into(),
            kick: "2025-09-26T19:00:00".into(),
            ..EventRecord::default()
        };
        assert!(is_informative(&record, false));
    }

    #[test]
    fn region_hinted_state_is_not_a_signal() {
        let hinted = EventRecord {
            state: "TX".into(),
            state_hinted: true,
            ..named()
        };
        assert_eq!(informativeness(&hinted), 0);
        assert!(!is_informative(&hinted, false));

        let from_page = EventRecord {
            state_hinted: false,
            ..hinted
        };
        assert_eq!(informativeness(&from_page), 1);
        assert!(is_informative(&from_page, false));
    }

    struct FakeSite(HashMap<String, String>);

    #[async_trait]
    impl PageSource for FakeSite {
        async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
            self.0
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::status(500, url))
        }
    }

    #[derive(Default)]
    struct RecordingPacer {
        pauses: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Pacer for RecordingPacer {
        async fn pause(&self, duration: Duration) {
            self.pauses.lock().unwrap().push(duration);
        }

        fn jitter(&self, max: Duration) -> Duration {
            max / 2
        }
    }

    fn page(a: &str, b: &str, desc: &str) -> String {
        format!(
            r#"<html><body>
            <div class="team-overview__team"><div class="team-overview__team-name">{a}</div></div>
            <div class="team-overview__team"><div class="team-overview__team-name">{b}</div></div>
            <p class="contest-description">{desc}</p>
            </body></html>"#
        )
    }

    #[tokio::test]
    async fn failing_region_is_skipped_and_regions_run_in_order() {
        let config = ScrapeConfig::default();
        let base = config.base_url.clone();
        let mut pages = HashMap::new();
        pages.insert(
            config.listing_url("ok", "9/26/2025"),
            r#"<a href="/ok/game/1">1</a><a href="/ok/game/2">2</a>"#.to_string(),
        );
        pages.insert(format!("{base}/ok/game/1"), page("Tulsa", "Union", "today @ 7pm"));
        pages.insert(format!("{base}/ok/game/2"), page("", "", "today @ 7pm"));
        let pacer = Arc::new(RecordingPacer::default());
        let batch = BatchScraper::with_pacer(
            Arc::new(FakeSite(pages)),
            Arc::new(NoRenderer),
            pacer.clone(),
            config,
        );
        let regions = Region::parse_list("tx,ok").unwrap();

        let outcome = batch
            .run(&regions, &RunDate::parse("9/26/2025").unwrap())
            .await;

        assert_eq!(outcome.regions[0].region.code(), "tx");
        assert!(outcome.regions[0].error.is_some());
        assert_eq!(outcome.regions[1].region.code(), "ok");
        assert_eq!(outcome.regions[1].resolved, 2);
        assert_eq!(outcome.regions[1].kept, 1);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].team_a, "Tulsa");
        assert_eq!(outcome.records[0].kick, "2025-09-26T19:00:00");
        assert_eq!(outcome.failed_regions(), 1);

        let pauses = pacer.pauses.lock().unwrap().clone();
        assert_eq!(pauses, vec![Duration::from_millis(700)]);
    }

    #[tokio::test]
    async fn names_only_page_is_dropped_in_lenient_mode() {
        let config = ScrapeConfig::default();
        let base = config.base_url.clone();
        let mut pages = HashMap::new();
        pages.insert(
            config.listing_url("tx", "9/26/2025"),
            r#"<a href="/tx/game/1">1</a>"#.to_string(),
        );
        pages.insert(format!("{base}/tx/game/1"), page("Lincoln", "Eastside", ""));
        let batch = BatchScraper::with_pacer(
            Arc::new(FakeSite(pages)),
            Arc::new(NoRenderer),
            Arc::new(RecordingPacer::default()),
            config,
        );

        let outcome = batch
            .run(&Region::parse_list("tx").unwrap(), &RunDate::parse("9/26/2025").unwrap())
            .await;

        assert_eq!(outcome.regions[0].resolved, 1);
        assert_eq!(outcome.regions[0].kept, 0);
        assert!(outcome.records.is_empty());
    }

    #[tokio::test]
    async fn drop_empty_off_keeps_placeholders() {
        let config = ScrapeConfig {
            drop_empty: false,
            ..ScrapeConfig::default()
        };
        let base = config.base_url.clone();
        let mut pages = HashMap::new();
        pages.insert(
            config.listing_url("tx", "9/26/2025"),
            r#"<a href="/tx/game/1">1</a>"#.to_string(),
        );
        pages.insert(format!("{base}/tx/game/1"), page("", "", ""));
        let batch = BatchScraper::with_pacer(
            Arc::new(FakeSite(pages)),
            Arc::new(NoRenderer),
            Arc::new(RecordingPacer::default()),
            config,
        );

        let outcome = batch
            .run(&Region::parse_list("tx").unwrap(), &RunDate::parse("9/26/2025").unwrap())
            .await;

        assert_eq!(outcome.records.len(), 1);
        assert!(!outcome.records[0].is_resolved());
    }
}
