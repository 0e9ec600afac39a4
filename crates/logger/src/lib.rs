//! hsfb-scrape: Logger
//! JSONL run-event stream, JSON output documents

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        if let Err(e) = fs::create_dir_all(&dir) {
            tracing::warn!("Cannot create log dir {}: {}", dir.display(), e);
        }
        Self { log_dir: dir }
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = self.log_dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open {}", path.display()))?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

/// Writes `items` as a pretty JSON array to `dir/file_name`, creating `dir`.
pub fn write_json_array<T: Serialize>(dir: impl AsRef<Path>, file_name: &str, items: &[T]) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).with_context(|| format!("create output dir {}", dir.display()))?;
    let path = dir.join(file_name);
    let file = fs::File::create(&path).with_context(|| format!("create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, items).context("serialize output document")?;
    out.flush()?;
    Ok(path)
}

// ── Event types ────────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct RegionScrapedEvent {
    pub ts:          String,
    pub event:       &'static str,    // "REGION_SCRAPED"
    pub region:      String,
    pub date:        String,
    pub links:       usize,
    pub resolved:    usize,
    pub kept:        usize,
    pub failed:      usize,
    pub error:       Option<String>,
}

#[derive(Serialize, Debug)]
pub struct RunSummaryEvent {
    pub ts:             String,
    pub event:          &'static str,   // "RUN_SUMMARY"
    pub date:           String,
    pub regions:        usize,
    pub regions_failed: usize,
    pub links_failed:   usize,
    pub records:        usize,
    pub strict:         bool,
    pub output:         String,
}
