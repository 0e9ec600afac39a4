//! Detail page resolution: one `EventRecord` per game page.
//!
//! Page-local extraction always wins; team page enrichment and the rendered
//! fallback only fill what is still empty.

use regex::Regex;
use reqwest::Url;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use tracing::debug;

use crate::config::ScrapeConfig;
use crate::dom::{self, first_filled, FieldChain, Probe};
use crate::enrichment::TeamEnrichmentCache;
use crate::error::ScrapeResult;
use crate::fetch::PageSource;
use crate::kickoff::resolve_kickoff;
use crate::record::{EventRecord, Region, RunDate, TeamEnrichment, DEFAULT_TEAM_A, DEFAULT_TEAM_B};
use crate::render::{pick_logo, pick_mascot, ImageRenderer, RENDER_SELECTORS};

static RECORD_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(\d+-\d+\)$").expect("record suffix pattern is valid"));

static VENUE_STATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([A-Z]{2})(?:\s|$)").expect("venue state pattern is valid"));

static VENUE_CITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^,]+),\s*[A-Z]{2}\b").expect("venue city pattern is valid"));

static PAREN_CITY_STATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(([A-Za-z .'-]+),\s*([A-Z]{2})\)").expect("parenthesized city pattern is valid")
});

static DESCRIPTION_CHAIN: LazyLock<FieldChain> =
    LazyLock::new(|| FieldChain::texts(&["p.contest-description", "div.contest-description"]));

static VENUE_CHAIN: LazyLock<FieldChain> =
    LazyLock::new(|| FieldChain::texts(&["p.contest-location", "div.contest-location"]));

/// Which of the two team columns a selector set addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

struct SideChains {
    name: FieldChain,
    name_link: &'static str,
    mascot: FieldChain,
    mascot_img: FieldChain,
    mascot_letter: FieldChain,
    logo: FieldChain,
}

macro_rules! side_chains {
    ($team:literal, $details:literal) => {
        SideChains {
            name: FieldChain::texts(&[
                concat!($team, " .team-overview__team-name a"),
                concat!($team, " .team-overview__team-name"),
            ]),
            name_link: concat!($team, " .team-overview__team-name a"),
            mascot: FieldChain::texts(&[
                concat!($details, " a.team-details__mascot"),
                concat!($details, " .team-details__mascot"),
            ]),
            mascot_img: FieldChain::images(&[
                concat!($team, " .mascot-image"),
                concat!($team, " .team-details__logo"),
            ]),
            mascot_letter: FieldChain::texts(&[concat!($team, " .mascot-image--letter")]),
            logo: FieldChain::new([
                Probe::Image(concat!($team, " .team-overview__logo")),
                Probe::Image(concat!($team, " .team-details__logo")),
                Probe::Image(concat!($team, " .school-logo")),
                Probe::Image(concat!($team, " .avatar")),
                Probe::Image($team),
            ]),
        }
    };
}

static SIDE_A: LazyLock<SideChains> = LazyLock::new(|| {
    side_chains!(
        "div.team-overview__team:nth-of-type(1)",
        "div.team-details:nth-of-type(1)"
    )
});

static SIDE_B: LazyLock<SideChains> = LazyLock::new(|| {
    side_chains!(
        "div.team-overview__team:nth-of-type(2)",
        "div.team-details:nth-of-type(2)"
    )
});

impl Side {
    fn chains(self) -> &'static SideChains {
        match self {
            Side::A => &SIDE_A,
            Side::B => &SIDE_B,
        }
    }
}

/// Page-local fields of one team column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamColumn {
    pub name: String,
    pub profile_url: String,
    pub mascot: String,
    pub mascot_img: String,
    pub mascot_letter: String,
    pub logo: String,
}

/// Everything a detail page yields before enrichment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GamePage {
    pub team_a: TeamColumn,
    pub team_b: TeamColumn,
    pub description: String,
    pub venue: String,
    pub metadata: Option<Value>,
}

/// Drops a trailing win-loss record: `"Lincoln (3-1)"` -> `"Lincoln"`.
pub fn clean_team_name(name: &str) -> String {
    RECORD_SUFFIX.replace(name.trim(), "").trim().to_string()
}

/// First embedded `application/ld+json` object; for an array, its first element.
pub fn first_ld_json(doc: &Html) -> Option<Value> {
    let sel = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;
    doc.select(&sel).find_map(|script| {
        let raw = script.text().collect::<String>();
        match serde_json::from_str::<Value>(raw.trim()).ok()? {
            obj @ Value::Object(_) => Some(obj),
            Value::Array(items) => items.into_iter().next(),
            _ => None,
        }
    })
}

fn absolute_url(base: &str, href: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }
    Url::parse(base)
        .and_then(|b| b.join(href))
        .map(String::from)
        .unwrap_or_default()
}

fn team_column(doc: &Html, side: Side, base_url: &str) -> TeamColumn {
    let chains = side.chains();
    let href = dom::attr(doc, chains.name_link, "href");
    TeamColumn {
        name: clean_team_name(&chains.name.resolve(doc)),
        profile_url: absolute_url(base_url, &href),
        mascot: chains.mascot.resolve(doc),
        mascot_img: chains.mascot_img.resolve(doc),
        mascot_letter: chains.mascot_letter.resolve(doc),
        logo: chains.logo.resolve(doc),
    }
}

/// Static extraction of a detail page.
pub fn parse_game_page(html: &str, base_url: &str) -> GamePage {
    let doc = Html::parse_document(html);
    GamePage {
        team_a: team_column(&doc, Side::A, base_url),
        team_b: team_column(&doc, Side::B, base_url),
        description: DESCRIPTION_CHAIN.resolve(&doc),
        venue: VENUE_CHAIN.resolve(&doc),
        metadata: first_ld_json(&doc),
    }
}

/// A candidate pair for the record's location; empty parts mean "no opinion".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationHint {
    pub city: String,
    pub state: String,
}

pub fn venue_location(venue: &str) -> LocationHint {
    LocationHint {
        city: VENUE_CITY
            .captures(venue)
            .map(|c| c[1].trim().to_string())
            .unwrap_or_default(),
        state: VENUE_STATE
            .captures(venue)
            .map(|c| c[1].to_string())
            .unwrap_or_default(),
    }
}

pub fn parenthesized_location(text: &str) -> LocationHint {
    PAREN_CITY_STATE
        .captures(text)
        .map(|c| LocationHint {
            city: c[1].trim().to_string(),
            state: c[2].trim().to_string(),
        })
        .unwrap_or_default()
}

/// Fills city and state independently from the first hint that has each.
pub fn settle_location(hints: &[LocationHint]) -> LocationHint {
    LocationHint {
        city: first_filled(hints.iter().map(|h| h.city.as_str())),
        state: first_filled(hints.iter().map(|h| h.state.as_str())),
    }
}

fn or_default_name(name: String, default: &str) -> String {
    if name.is_empty() {
        default.to_string()
    } else {
        name
    }
}

pub struct GameResolver {
    source: Arc<dyn PageSource>,
    teams: Arc<TeamEnrichmentCache>,
    renderer: Arc<dyn ImageRenderer>,
    base_url: String,
}

impl GameResolver {
    pub fn new(
        source: Arc<dyn PageSource>,
        teams: Arc<TeamEnrichmentCache>,
        renderer: Arc<dyn ImageRenderer>,
        config: &ScrapeConfig,
    ) -> Self {
        Self {
            source,
            teams,
            renderer,
            base_url: config.base_url.clone(),
        }
    }

    pub fn team_cache(&self) -> &Arc<TeamEnrichmentCache> {
        &self.teams
    }

    /// Fetches and resolves one detail page. Only the page fetch itself can fail.
    pub async fn resolve(
        &self,
        event_url: &str,
        run_date: &RunDate,
        region: Option<&Region>,
    ) -> ScrapeResult<EventRecord> {
        let html = self.source.fetch_page(event_url).await?;
        let page = parse_game_page(&html, &self.base_url);

        let kick = resolve_kickoff(
            page.metadata.as_ref(),
            &page.description,
            run_date.reference_date(),
            run_date.default_year(),
        );

        let enrich_a = self.teams.enrich(&page.team_a.profile_url).await;
        let enrich_b = self.teams.enrich(&page.team_b.profile_url).await;

        let mut a = fill_from_enrichment(page.team_a, &enrich_a);
        let mut b = fill_from_enrichment(page.team_b, &enrich_b);
        self.render_missing_images(event_url, &mut a, &mut b).await;

        let hints = [
            LocationHint {
                city: enrich_a.city.clone(),
                state: enrich_a.state.clone(),
            },
            LocationHint {
                city: enrich_b.city.clone(),
                state: enrich_b.state.clone(),
            },
            venue_location(&page.venue),
            parenthesized_location(&page.description),
        ];
        let mut location = settle_location(&hints);
        // Region hint is last resort and is not a page-derived signal.
        let state_hinted = match region {
            Some(region) if location.state.is_empty() => {
                location.state = region.state_hint();
                true
            }
            _ => false,
        };

        debug!("Resolved {}: {} vs {} ({})", event_url, a.name, b.name, kick);

        Ok(EventRecord {
            team_a: or_default_name(a.name, DEFAULT_TEAM_A),
            team_b: or_default_name(b.name, DEFAULT_TEAM_B),
            venue: page.venue,
            kick,
            school: first_filled([enrich_a.school.as_str(), enrich_b.school.as_str()]),
            city: location.city,
            state: location.state,
            state_hinted,
            logo_a: a.logo,
            logo_b: b.logo,
            mascot_a: a.mascot,
            mascot_b: b.mascot,
            mascot_img_a: a.mascot_img,
            mascot_img_b: b.mascot_img,
            mascot_letter_a: a.mascot_letter,
            mascot_letter_b: b.mascot_letter,
            description: page.description,
            ..EventRecord::default()
        })
    }

    /// One rendered pass over the page when any image slot is still empty.
    async fn render_missing_images(&self, event_url: &str, a: &mut TeamColumn, b: &mut TeamColumn) {
        let missing = [&a.logo, &b.logo, &a.mascot_img, &b.mascot_img]
            .iter()
            .any(|v| v.is_empty());
        if !missing {
            return;
        }

        let images = self
            .renderer
            .collect_images(event_url, &RENDER_SELECTORS)
            .await;
        if images.is_empty() {
            return;
        }

        if a.mascot_img.is_empty() {
            a.mascot_img = pick_mascot(&images, "").unwrap_or_default().to_string();
        }
        if b.mascot_img.is_empty() {
            b.mascot_img = pick_mascot(&images, &a.mascot_img).unwrap_or_default().to_string();
        }
        if a.logo.is_empty() {
            a.logo = pick_logo(&images, "").unwrap_or_default().to_string();
        }
        if b.logo.is_empty() {
            b.logo = pick_logo(&images, &a.logo).unwrap_or_default().to_string();
        }
    }
}

fn fill_from_enrichment(mut column: TeamColumn, enrichment: &TeamEnrichment) -> TeamColumn {
    column.logo = first_filled([column.logo.as_str(), enrichment.logo.as_str()]);
    column.mascot = first_filled([column.mascot.as_str(), enrichment.mascot.as_str()]);
    column.mascot_img = first_filled([column.mascot_img.as_str(), enrichment.mascot_img.as_str()]);
    column
}
