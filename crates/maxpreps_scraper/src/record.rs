use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ScrapeError, ScrapeResult};

pub const DEFAULT_TEAM_A: &str = "Team A";
pub const DEFAULT_TEAM_B: &str = "Team B";
pub const SPORT_LABEL: &str = "Football";
/// Stream/chat links are not scraped; the site front-end fills them in.
pub const LINK_PLACEHOLDER: &str = "#";

/// Jurisdiction codes the listing site namespaces its score pages by.
pub const STATE_CODES: [&str; 52] = [
    "al", "ak", "ar", "az", "ca", "co", "ct", "dc", "de", "fl", "ga", "hi", "ia", "id", "il", "in",
    "ks", "ky", "la", "ma", "md", "me", "mi", "mn", "mo", "ms", "mt", "nc", "nd", "ne", "nh", "nj",
    "nm", "nv", "ny", "oh", "ok", "or", "pa", "ps", "ri", "sc", "sd", "tn", "tx", "ut", "va", "vt",
    "wa", "wi", "wv", "wy",
];

/// One matchup as written to the output document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub team_a: String,
    pub team_b: String,
    pub sport: String,
    pub league: String,
    pub venue: String,
    /// Naive local kickoff, `YYYY-MM-DDTHH:MM:SS`, or empty when unknown.
    pub kick: String,
    pub stream: String,
    pub chat: String,
    pub school: String,
    pub city: String,
    pub state: String,
    pub logo_a: String,
    pub logo_b: String,
    pub mascot_a: String,
    pub mascot_b: String,
    pub mascot_img_a: String,
    pub mascot_img_b: String,
    pub mascot_letter_a: String,
    pub mascot_letter_b: String,
    pub description: String,
    /// `state` came from the region being scraped, not from any page.
    #[serde(skip)]
    pub state_hinted: bool,
}

impl Default for EventRecord {
    fn default() -> Self {
        Self {
            team_a: DEFAULT_TEAM_A.to_string(),
            team_b: DEFAULT_TEAM_B.to_string(),
            sport: SPORT_LABEL.to_string(),
            league: String::new(),
            venue: String::new(),
            kick: String::new(),
            stream: LINK_PLACEHOLDER.to_string(),
            chat: LINK_PLACEHOLDER.to_string(),
            school: String::new(),
            city: String::new(),
            state: String::new(),
            logo_a: String::new(),
            logo_b: String::new(),
            mascot_a: String::new(),
            mascot_b: String::new(),
            mascot_img_a: String::new(),
            mascot_img_b: String::new(),
            mascot_letter_a: String::new(),
            mascot_letter_b: String::new(),
            description: String::new(),
            state_hinted: false,
        }
    }
}

impl EventRecord {
    /// True when at least one team name was actually resolved from the page.
    pub fn is_resolved(&self) -> bool {
        let named = |name: &str, default: &str| !name.is_empty() && name != default;
        named(&self.team_a, DEFAULT_TEAM_A) || named(&self.team_b, DEFAULT_TEAM_B)
    }
}

/// Fields recovered from a team's own page. Empty means "not found".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamEnrichment {
    pub logo: String,
    pub city: String,
    pub state: String,
    pub school: String,
    pub mascot: String,
    pub mascot_img: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Region(String);

impl Region {
    pub fn parse(code: &str) -> ScrapeResult<Self> {
        let code = code.trim().to_ascii_lowercase();
        if STATE_CODES.contains(&code.as_str()) {
            Ok(Self(code))
        } else {
            Err(ScrapeError::InvalidRegion(code))
        }
    }

    /// Parses a comma separated list, skipping blanks. An empty list means all regions.
    pub fn parse_list(list: &str) -> ScrapeResult<Vec<Self>> {
        let regions = list
            .split(',')
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(Self::parse)
            .collect::<ScrapeResult<Vec<_>>>()?;
        if regions.is_empty() {
            return Ok(Self::all());
        }
        Ok(regions)
    }

    pub fn all() -> Vec<Self> {
        STATE_CODES.iter().map(|code| Self(code.to_string())).collect()
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    /// Upper-cased code, the form used in the `state` field.
    pub fn state_hint(&self) -> String {
        self.0.to_ascii_uppercase()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The date a run scrapes, as given on the command line (`M/D/YYYY`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDate {
    raw: String,
    date: NaiveDate,
}

impl RunDate {
    pub fn parse(raw: &str) -> ScrapeResult<Self> {
        let raw = raw.trim();
        let invalid = || ScrapeError::InvalidDate(raw.to_string());
        let mut parts = raw.split('/').map(|p| p.trim().parse::<u32>());
        let (Some(Ok(month)), Some(Ok(day)), Some(Ok(year)), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        let year = i32::try_from(year).map_err(|_| invalid())?;
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;
        Ok(Self {
            raw: raw.to_string(),
            date,
        })
    }

    /// Value for the listing page's `date` query parameter.
    pub fn listing_param(&self) -> &str {
        &self.raw
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.date
    }

    pub fn default_year(&self) -> i32 {
        self.date.year()
    }

    pub fn output_file_name(&self) -> String {
        format!("hsfb-{}.json", self.date.format("%Y-%m-%d"))
    }
}
