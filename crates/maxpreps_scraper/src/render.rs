//! Rendered-page image fallback.
//!
//! Some team blocks only get their images after client-side scripts run. The
//! renderer loads the page in headless Chrome and collects image URLs from
//! computed background styles and live `img` state. It is a last resort and
//! callers treat an empty result as "nothing found".

use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions};
use std::collections::HashSet;
use std::time::Duration;
use tokio::task;
use tracing::{debug, warn};

/// Selectors scanned on a rendered page, most specific first.
pub const RENDER_SELECTORS: [&str; 8] = [
    ".mascot-image",
    ".team-overview__logo",
    ".team-details__logo",
    ".team-logo",
    ".school-logo",
    ".avatar",
    "img[alt*='logo' i]",
    "img",
];

/// Marker in CDN paths of mascot artwork.
pub const MASCOT_MARKER: &str = "school-mascot";

#[async_trait]
pub trait ImageRenderer: Send + Sync {
    /// Image URLs found under `selectors` after a full page load, in document order.
    async fn collect_images(&self, url: &str, selectors: &[&str]) -> Vec<String>;
}

/// Renderer used when the browser fallback is switched off.
pub struct NoRenderer;

#[async_trait]
impl ImageRenderer for NoRenderer {
    async fn collect_images(&self, _url: &str, _selectors: &[&str]) -> Vec<String> {
        Vec::new()
    }
}

pub struct ChromeRenderer {
    user_agent: String,
    settle: Duration,
}

impl ChromeRenderer {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            settle: Duration::from_secs(2),
        }
    }

    fn collect_blocking(url: &str, user_agent: &str, selectors: &[String], settle: Duration) -> Result<Vec<String>> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .build()
            .context("Failed to build Chrome launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome")?;
        let tab = browser.new_tab().context("Failed to create browser tab")?;
        tab.set_user_agent(user_agent, None, None)
            .context("Failed to set Chrome user agent")?;

        tab.navigate_to(url).context("Chrome navigate failed")?;
        tab.wait_until_navigated()
            .context("Chrome wait_until_navigated failed")?;
        tab.wait_for_element("body")
            .context("Chrome wait_for_element(body) failed")?;
        // Lazy images and style swaps land shortly after load.
        std::thread::sleep(settle);

        let script = collection_script(selectors)?;
        let result = tab
            .evaluate(&script, false)
            .context("Chrome image collection script failed")?;
        let raw = result
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .unwrap_or("[]")
            .to_string();
        let urls: Vec<String> =
            serde_json::from_str(&raw).context("Image collection returned malformed JSON")?;
        Ok(dedupe(urls))
    }
}

#[async_trait]
impl ImageRenderer for ChromeRenderer {
    async fn collect_images(&self, url: &str, selectors: &[&str]) -> Vec<String> {
        let url_owned = url.to_string();
        let user_agent = self.user_agent.clone();
        let selectors: Vec<String> = selectors.iter().map(|s| s.to_string()).collect();
        let settle = self.settle;

        let outcome = task::spawn_blocking(move || {
            Self::collect_blocking(&url_owned, &user_agent, &selectors, settle)
        })
        .await;

        match outcome {
            Ok(Ok(urls)) => {
                debug!("Rendered {} -> {} image candidates", url, urls.len());
                urls
            }
            Ok(Err(e)) => {
                warn!("Rendered image fallback failed for {}: {:#}", url, e);
                Vec::new()
            }
            Err(e) => {
                warn!("Rendered image fallback task for {} died: {}", url, e);
                Vec::new()
            }
        }
    }
}

/// Browser-side collector: computed `background-image`, `src` and first `srcset` candidate.
fn collection_script(selectors: &[String]) -> Result<String> {
    let selectors = serde_json::to_string(selectors).context("Failed to encode selectors")?;
    Ok(format!(
        r#"(() => {{
  const out = [];
  for (const sel of {selectors}) {{
    let nodes = [];
    try {{ nodes = document.querySelectorAll(sel); }} catch (e) {{ continue; }}
    for (const el of nodes) {{
      const bg = getComputedStyle(el).backgroundImage || "";
      const m = /url\((['"]?)(.*?)\1\)/.exec(bg);
      if (m && m[2]) out.push(m[2]);
      const src = el.getAttribute("src");
      if (src) out.push(src);
      const srcset = el.getAttribute("srcset");
      if (srcset) {{
        const first = srcset.split(",")[0].trim().split(" ")[0];
        if (first) out.push(first);
      }}
    }}
  }}
  return JSON.stringify(out);
}})()"#
    ))
}

fn dedupe(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty() && seen.insert(u.clone()))
        .collect()
}

/// First candidate that looks like mascot artwork, skipping `taken`.
pub fn pick_mascot<'a>(candidates: &'a [String], taken: &str) -> Option<&'a str> {
    candidates
        .iter()
        .map(String::as_str)
        .find(|u| u.contains(MASCOT_MARKER) && *u != taken)
}

/// First candidate that looks like a school logo (never mascot artwork), skipping `taken`.
pub fn pick_logo<'a>(candidates: &'a [String], taken: &str) -> Option<&'a str> {
    candidates
        .iter()
        .map(String::as_str)
        .find(|u| (u.contains("school") || u.contains("logo")) && !u.contains("mascot") && *u != taken)
}
