//! Kickoff time resolution from embedded metadata and free-text descriptions.
//!
//! Output is a naive local timestamp (`YYYY-MM-DDTHH:MM:SS`); the listing
//! pages never say which timezone they mean. An empty string means unknown.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

pub const KICKOFF_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

static TODAY_AT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\btoday\b\s*@\s*(\d{1,2})(?::(\d{2}))?\s*([ap])\.?m?\.?")
        .expect("today pattern is valid")
});

static MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Sept|Oct|Nov|Dec)[a-z]*\s+(\d{1,2})")
        .expect("month/day pattern is valid")
});

static AT_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)@\s*(\d{1,2})(?::(\d{2}))?\s*([ap])\.?m?\.?").expect("time pattern is valid")
});

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meridiem {
    Am,
    Pm,
}

impl Meridiem {
    fn from_marker(marker: &str) -> Option<Self> {
        match marker.chars().next()?.to_ascii_lowercase() {
            'a' => Some(Self::Am),
            'p' => Some(Self::Pm),
            _ => None,
        }
    }
}

/// 12-hour clock to 24-hour. Hours outside 1..=12 are rejected.
pub fn to_24_hour(hour: u32, meridiem: Meridiem) -> Option<u32> {
    if !(1..=12).contains(&hour) {
        return None;
    }
    Some(match (meridiem, hour) {
        (Meridiem::Am, 12) => 0,
        (Meridiem::Am, h) => h,
        (Meridiem::Pm, 12) => 12,
        (Meridiem::Pm, h) => h + 12,
    })
}

/// Everything the kickoff strategies may look at.
#[derive(Debug, Clone, Copy)]
pub struct KickoffInputs<'a> {
    pub metadata: Option<&'a Value>,
    pub description: &'a str,
    pub reference_date: NaiveDate,
    pub default_year: i32,
}

type Strategy = fn(&KickoffInputs<'_>) -> Option<NaiveDateTime>;

/// Tried in order; the first hit wins.
pub const STRATEGIES: [(&str, Strategy); 3] = [
    ("metadata", from_metadata),
    ("today", from_today),
    ("month-day", from_month_day),
];

pub fn resolve_kickoff(
    metadata: Option<&Value>,
    description: &str,
    reference_date: NaiveDate,
    default_year: i32,
) -> String {
    let inputs = KickoffInputs {
        metadata,
        description,
        reference_date,
        default_year,
    };
    STRATEGIES
        .iter()
        .find_map(|(_, strategy)| strategy(&inputs))
        .map(|dt| dt.format(KICKOFF_FORMAT).to_string())
        .unwrap_or_default()
}

fn default_clock() -> NaiveTime {
    NaiveTime::from_hms_opt(19, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn clock(caps: &regex::Captures<'_>) -> Option<NaiveTime> {
    let hour = caps.get(1)?.as_str().parse::<u32>().ok()?;
    let minute = caps
        .get(2)
        .map_or(Some(0), |m| m.as_str().parse::<u32>().ok())?;
    let meridiem = Meridiem::from_marker(caps.get(3)?.as_str())?;
    NaiveTime::from_hms_opt(to_24_hour(hour, meridiem)?, minute, 0)
}

/// `startDate` on the metadata object itself or nested under `event`.
fn from_metadata(inputs: &KickoffInputs<'_>) -> Option<NaiveDateTime> {
    let meta = inputs.metadata?;
    let raw = meta
        .get("startDate")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .or_else(|| meta.get("event")?.get("startDate")?.as_str())?;
    parse_metadata_start(raw.trim())
}

/// Offset-bearing values keep their wall-clock time; the offset is dropped.
pub fn parse_metadata_start(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M%z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.naive_local());
        }
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(default_clock()))
}

/// "today @ 7pm" against the run's reference date.
fn from_today(inputs: &KickoffInputs<'_>) -> Option<NaiveDateTime> {
    let caps = TODAY_AT.captures(inputs.description)?;
    Some(inputs.reference_date.and_time(clock(&caps)?))
}

/// "Sep 26 @ 7:00 PM" in the default year; 19:00 when no usable time is given.
fn from_month_day(inputs: &KickoffInputs<'_>) -> Option<NaiveDateTime> {
    let caps = MONTH_DAY.captures(inputs.description)?;
    let prefix = caps.get(1)?.as_str().to_ascii_lowercase();
    let month = MONTHS.iter().position(|m| prefix.starts_with(m))? as u32 + 1;
    let day = caps.get(2)?.as_str().parse::<u32>().ok()?;
    let date = NaiveDate::from_ymd_opt(inputs.default_year, month, day)?;
    let time = AT_TIME
        .captures(inputs.description)
        .and_then(|t| clock(&t))
        .unwrap_or_else(default_clock);
    Some(date.and_time(time))
}
