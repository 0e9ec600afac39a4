//! Full pipeline against a scripted site: retrying client -> batch -> filter.

use async_trait::async_trait;
use maxpreps_scraper::{
    BatchScraper, FetchClient, FetchError, HttpResponse, HttpTransport, NoRenderer, Pacer, Region,
    RetryPolicy, RunDate, ScrapeConfig,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Serves fixed pages; a URL listed in `flaky` answers 503 that many times first.
struct ScriptedSite {
    pages: HashMap<String, String>,
    flaky: Mutex<HashMap<String, u32>>,
    hits: Mutex<HashMap<String, u32>>,
}

impl ScriptedSite {
    fn hits(&self, url: &str) -> u32 {
        self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl HttpTransport for ScriptedSite {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        *self.hits.lock().unwrap().entry(url.to_string()).or_default() += 1;
        if let Some(left) = self.flaky.lock().unwrap().get_mut(url) {
            if *left > 0 {
                *left -= 1;
                return Ok(HttpResponse {
                    status: 503,
                    body: String::new(),
                });
            }
        }
        Ok(match self.pages.get(url) {
            Some(body) => HttpResponse {
                status: 200,
                body: body.clone(),
            },
            None => HttpResponse {
                status: 404,
                body: String::new(),
            },
        })
    }
}

#[derive(Default)]
struct InstantPacer {
    pauses: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Pacer for InstantPacer {
    async fn pause(&self, duration: Duration) {
        self.pauses.lock().unwrap().push(duration);
    }

    fn jitter(&self, _max: Duration) -> Duration {
        Duration::ZERO
    }
}

const GAME_PATH: &str = "/tx/dallas/eastside/football/game/lincoln-vs-eastside/";

fn detail_page() -> String {
    r#"<html><head><title>Lincoln vs Eastside</title></head><body>
    <div class="team-overview">
      <div class="team-overview__team">
        <div class="team-overview__team-name">Lincoln (3-1)</div>
      </div>
      <div class="team-overview__team">
        <div class="team-overview__team-name">Eastside (2-2)</div>
      </div>
    </div>
    <p class="contest-description">Friday, September 26 @ 7:00 PM</p>
    <p class="contest-location">Eastside Stadium, TX</p>
    </body></html>"#
        .to_string()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn single_tx_game_resolves_through_flaky_fetches() {
    let config = ScrapeConfig::default();
    let listing_url = config.listing_url("tx", "9/26/2025");
    let game_url = format!("{}{}", config.base_url, GAME_PATH);

    let site = Arc::new(ScriptedSite {
        pages: HashMap::from([
            (
                listing_url.clone(),
                format!(r#"<html><body><a href="{GAME_PATH}">Final</a></body></html>"#),
            ),
            (game_url.clone(), detail_page()),
        ]),
        flaky: Mutex::new(HashMap::from([(game_url.clone(), 2)])),
        hits: Mutex::new(HashMap::new()),
    });
    let pacer = Arc::new(InstantPacer::default());
    let client = FetchClient::new(site.clone(), pacer.clone(), RetryPolicy::default());
    let batch = BatchScraper::with_pacer(Arc::new(client), Arc::new(NoRenderer), pacer.clone(), config);

    let outcome = batch
        .run(
            &[Region::parse("tx").unwrap()],
            &RunDate::parse("9/26/2025").unwrap(),
        )
        .await;

    assert_eq!(outcome.records.len(), 1);
    let record = &outcome.records[0];
    assert_eq!(record.team_a, "Lincoln");
    assert_eq!(record.team_b, "Eastside");
    assert_eq!(record.kick, "2025-09-26T19:00:00");
    assert_eq!(record.venue, "Eastside Stadium, TX");
    assert_eq!(record.state, "TX");
    assert_eq!(record.city, "Eastside Stadium");
    assert_eq!(record.sport, "Football");
    assert_eq!(record.league, "");

    assert_eq!(site.hits(&listing_url), 1);
    assert_eq!(site.hits(&game_url), 3);
    assert_eq!(
        *pacer.pauses.lock().unwrap(),
        vec![Duration::from_secs(1), Duration::from_secs_f64(1.7)]
    );

    let json = serde_json::to_value(record).unwrap();
    assert_eq!(json["teamA"], "Lincoln");
    assert_eq!(json["kick"], "2025-09-26T19:00:00");
}

#[tokio::test]
async fn strict_mode_drops_thin_records() {
    let config = ScrapeConfig {
        strict: true,
        ..ScrapeConfig::default()
    };
    let listing_url = config.listing_url("tx", "9/26/2025");
    let game_url = format!("{}{}", config.base_url, GAME_PATH);
    let thin = r#"<html><body>
      <div class="team-overview__team"><div class="team-overview__team-name">Lincoln</div></div>
      <div class="team-overview__team"><div class="team-overview__team-name">Eastside</div></div>
      </body></html>"#;
    let site = Arc::new(ScriptedSite {
        pages: HashMap::from([
            (listing_url, format!(r#"<a href="{GAME_PATH}">x</a>"#)),
            (game_url, thin.to_string()),
        ]),
        flaky: Mutex::new(HashMap::new()),
        hits: Mutex::new(HashMap::new()),
    });
    let pacer = Arc::new(InstantPacer::default());
    let client = FetchClient::new(site, pacer.clone(), RetryPolicy::default());
    let batch = BatchScraper::with_pacer(Arc::new(client), Arc::new(NoRenderer), pacer, config);

    let outcome = batch
        .run(
            &[Region::parse("tx").unwrap()],
            &RunDate::parse("9/26/2025").unwrap(),
        )
        .await;

    // Only the region hint fills `state`, which is not a signal.
    assert_eq!(outcome.regions[0].resolved, 1);
    assert!(outcome.records.is_empty());
}

#[tokio::test]
async fn lenient_mode_drops_names_only_records_despite_region_state() {
    let config = ScrapeConfig::default();
    let listing_url = config.listing_url("tx", "9/26/2025");
    let game_url = format!("{}{}", config.base_url, GAME_PATH);
    let thin = r#"<html><body>
      <div class="team-overview__team"><div class="team-overview__team-name">Lincoln</div></div>
      <div class="team-overview__team"><div class="team-overview__team-name">Eastside</div></div>
      </body></html>"#;
    let site = Arc::new(ScriptedSite {
        pages: HashMap::from([
            (listing_url, format!(r#"<a href="{GAME_PATH}">x</a>"#)),
            (game_url, thin.to_string()),
        ]),
        flaky: Mutex::new(HashMap::new()),
        hits: Mutex::new(HashMap::new()),
    });
    let pacer = Arc::new(InstantPacer::default());
    let client = FetchClient::new(site, pacer.clone(), RetryPolicy::default());
    let batch = BatchScraper::with_pacer(Arc::new(client), Arc::new(NoRenderer), pacer, config);

    let outcome = batch
        .run(
            &[Region::parse("tx").unwrap()],
            &RunDate::parse("9/26/2025").unwrap(),
        )
        .await;

    assert_eq!(outcome.regions[0].resolved, 1);
    assert_eq!(outcome.regions[0].kept, 0);
    assert!(outcome.records.is_empty());
}
