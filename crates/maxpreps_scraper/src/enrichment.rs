//! Team page lookups, memoized per team URL for the lifetime of a run.

use regex::Regex;
use scraper::Html;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use tracing::{debug, warn};

use crate::dom::{FieldChain, Probe};
use crate::fetch::PageSource;
use crate::record::TeamEnrichment;
use crate::render::{pick_logo, pick_mascot, ImageRenderer, RENDER_SELECTORS};

static CITY_STATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z .'-]+),\s*([A-Z]{2})(?:\b|$)").expect("city/state pattern is valid")
});

static URL_STATE_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([a-z]{2})/").expect("state segment pattern is valid"));

static LOGO_CHAIN: LazyLock<FieldChain> = LazyLock::new(|| {
    FieldChain::new([
        Probe::Image(".TeamHeader"),
        Probe::Image(".team-header"),
        Probe::Image(".team-logo"),
        Probe::Image(".school-logo"),
        Probe::Image(".avatar"),
        Probe::ImageAlt("logo"),
        Probe::Image("body"),
    ])
});

static SCHOOL_CHAIN: LazyLock<FieldChain> = LazyLock::new(|| {
    FieldChain::texts(&[
        r#".TeamHeader h1, .team-header h1, h1[itemprop="name"]"#,
        "nav.breadcrumbs a:last-child, .breadcrumbs a:last-child",
    ])
});

static MASCOT_CHAIN: LazyLock<FieldChain> =
    LazyLock::new(|| FieldChain::texts(&[".mascot, .team-mascot, a.team-details__mascot"]));

static MASCOT_IMG_CHAIN: LazyLock<FieldChain> =
    LazyLock::new(|| FieldChain::images(&[".mascot-image", ".team-details__logo"]));

static LOCATION_CHAIN: LazyLock<FieldChain> = LazyLock::new(|| {
    FieldChain::texts(&[
        ".TeamHeader .location, .team-header .location",
        ".profile-header .location",
        r#"meta[name="description"]"#,
    ])
});

/// Parses the static parts of a team page.
pub fn parse_team_page(html: &str, team_url: &str) -> TeamEnrichment {
    let doc = Html::parse_document(html);
    let mut out = TeamEnrichment {
        logo: LOGO_CHAIN.resolve(&doc),
        school: SCHOOL_CHAIN.resolve(&doc),
        mascot: MASCOT_CHAIN.resolve(&doc),
        mascot_img: MASCOT_IMG_CHAIN.resolve(&doc),
        ..TeamEnrichment::default()
    };

    let location = LOCATION_CHAIN.resolve(&doc);
    match split_city_state(&location) {
        Some((city, state)) => {
            out.city = city;
            out.state = state;
        }
        None => out.state = state_from_url(team_url),
    }
    out
}

/// "Springfield, IL ..." -> ("Springfield", "IL").
pub fn split_city_state(text: &str) -> Option<(String, String)> {
    let caps = CITY_STATE.captures(text)?;
    Some((caps[1].trim().to_string(), caps[2].trim().to_string()))
}

/// Team URLs are namespaced by jurisdiction: `/tx/austin/...` -> `TX`.
pub fn state_from_url(url: &str) -> String {
    URL_STATE_SEGMENT
        .captures(url)
        .map(|caps| caps[1].to_ascii_uppercase())
        .unwrap_or_default()
}

/// Process-wide (per run) cache of team enrichments keyed by team URL.
///
/// Entries are never refreshed. Two workers racing on the same URL may both
/// fetch; the later insert simply overwrites an equal value.
pub struct TeamEnrichmentCache {
    source: Arc<dyn PageSource>,
    renderer: Arc<dyn ImageRenderer>,
    entries: Mutex<HashMap<String, TeamEnrichment>>,
}

impl TeamEnrichmentCache {
    pub fn new(source: Arc<dyn PageSource>, renderer: Arc<dyn ImageRenderer>) -> Self {
        Self {
            source,
            renderer,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn cached(&self, team_url: &str) -> Option<TeamEnrichment> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(team_url)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn enrich(&self, team_url: &str) -> TeamEnrichment {
        if team_url.is_empty() {
            return TeamEnrichment::default();
        }
        if let Some(hit) = self.cached(team_url) {
            debug!("Team cache hit: {}", team_url);
            return hit;
        }

        let enrichment = self.lookup(team_url).await;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(team_url.to_string(), enrichment.clone());
        enrichment
    }

    async fn lookup(&self, team_url: &str) -> TeamEnrichment {
        let html = match self.source.fetch_page(team_url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Team page {} unavailable, caching empty enrichment: {}", team_url, e);
                return TeamEnrichment::default();
            }
        };
        let mut out = parse_team_page(&html, team_url);

        if out.logo.is_empty() || out.mascot_img.is_empty() {
            let images = self
                .renderer
                .collect_images(team_url, &RENDER_SELECTORS)
                .await;
            if out.mascot_img.is_empty() {
                out.mascot_img = pick_mascot(&images, "").unwrap_or_default().to_string();
            }
            if out.logo.is_empty() {
                out.logo = pick_logo(&images, "").unwrap_or_default().to_string();
            }
        }
        out
    }
}
