//! Selector based lookups over a parsed page.
//!
//! Nothing here fails on "not found": a miss is an empty string and the
//! callers decide what to fall back to.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::debug;

static BACKGROUND_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"background-image\s*:\s*url\(\s*(?:"([^"]*)"|'([^']*)'|([^)'"]*))\s*\)"#)
        .expect("background-image pattern is valid")
});

/// Lazy-load variants tried after `src`, in this order.
const IMG_SOURCE_ATTRS: [&str; 4] = ["src", "data-src", "data-original", "data-lazy-src"];

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            debug!("Skipping invalid selector {:?}: {:?}", css, e);
            None
        }
    }
}

fn first_match<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let sel = selector(css)?;
    scope.select(&sel).next()
}

fn element_text(el: ElementRef<'_>) -> String {
    if el.value().name() == "meta" {
        return el.value().attr("content").unwrap_or_default().trim().to_string();
    }
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trimmed text of the first element matching `css`, or `""`.
///
/// A `meta` match yields its `content` attribute.
pub fn text(doc: &Html, css: &str) -> String {
    first_match(doc.root_element(), css)
        .map(element_text)
        .unwrap_or_default()
}

/// First non-empty `attr` value of an element matching `css`, or `""`.
pub fn attr(doc: &Html, css: &str, attr: &str) -> String {
    let Some(sel) = selector(css) else {
        return String::new();
    };
    doc.select(&sel)
        .filter_map(|el| el.value().attr(attr))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// First candidate URL of a `srcset` value.
pub fn first_srcset_candidate(srcset: &str) -> String {
    srcset
        .split(',')
        .next()
        .unwrap_or_default()
        .trim()
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}

/// URL of a `background-image: url(...)` declaration inside a style attribute.
pub fn background_url(style: &str) -> String {
    BACKGROUND_URL
        .captures(style)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

fn img_element_url(img: ElementRef<'_>) -> String {
    let value = img.value();
    for name in IMG_SOURCE_ATTRS {
        if let Some(v) = value.attr(name).filter(|v| !v.trim().is_empty()) {
            return v.trim().to_string();
        }
    }
    value
        .attr("srcset")
        .map(first_srcset_candidate)
        .unwrap_or_default()
}

fn scoped_image(scope: ElementRef<'_>) -> String {
    if let Some(img) = first_match(scope, "img") {
        let url = img_element_url(img);
        if !url.is_empty() {
            return url;
        }
    }

    if let Some(source) = first_match(scope, "picture source[srcset]") {
        let url = first_srcset_candidate(source.value().attr("srcset").unwrap_or_default());
        if !url.is_empty() {
            return url;
        }
    }

    let own = background_url(scope.value().attr("style").unwrap_or_default());
    if !own.is_empty() {
        return own;
    }
    if let Some(sel) = selector("[style]") {
        for el in scope.select(&sel) {
            let url = background_url(el.value().attr("style").unwrap_or_default());
            if !url.is_empty() {
                return url;
            }
        }
    }

    String::new()
}

/// First resolvable image URL inside the element matched by `scope_css`.
///
/// Order: scope `img` (`src`, lazy attributes, `srcset`), `picture source`,
/// inline background image on the scope then its descendants, and finally
/// the document's `og:image`. A scope that does not exist yields `""`.
pub fn image(doc: &Html, scope_css: &str) -> String {
    let Some(scope) = first_match(doc.root_element(), scope_css) else {
        return String::new();
    };
    let url = scoped_image(scope);
    if !url.is_empty() {
        return url;
    }
    attr(doc, r#"meta[property="og:image"]"#, "content")
}

/// First `img` whose alt text mentions `needle` (case-insensitive).
pub fn image_by_alt(doc: &Html, needle: &str) -> String {
    let Some(sel) = selector("img[alt]") else {
        return String::new();
    };
    let needle = needle.to_lowercase();
    doc.select(&sel)
        .filter(|img| {
            img.value()
                .attr("alt")
                .is_some_and(|alt| alt.to_lowercase().contains(&needle))
        })
        .map(img_element_url)
        .find(|url| !url.is_empty())
        .unwrap_or_default()
}

/// One way of pulling a value out of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Text(&'static str),
    Image(&'static str),
    ImageAlt(&'static str),
}

impl Probe {
    pub fn run(&self, doc: &Html) -> String {
        match self {
            Self::Text(css) => text(doc, css),
            Self::Image(scope) => image(doc, scope),
            Self::ImageAlt(needle) => image_by_alt(doc, needle),
        }
    }
}

/// Ordered fallback: the first probe with a non-empty result wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChain {
    probes: Vec<Probe>,
}

impl FieldChain {
    pub fn new(probes: impl IntoIterator<Item = Probe>) -> Self {
        Self {
            probes: probes.into_iter().collect(),
        }
    }

    pub fn texts(selectors: &[&'static str]) -> Self {
        Self::new(selectors.iter().copied().map(Probe::Text))
    }

    pub fn images(scopes: &[&'static str]) -> Self {
        Self::new(scopes.iter().copied().map(Probe::Image))
    }

    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }

    pub fn resolve(&self, doc: &Html) -> String {
        self.probes
            .iter()
            .map(|probe| probe.run(doc))
            .find(|v| !v.is_empty())
            .unwrap_or_default()
    }
}

/// First non-empty candidate, already-computed values version of [`FieldChain`].
pub fn first_filled<'a>(candidates: impl IntoIterator<Item = &'a str>) -> String {
    candidates
        .into_iter()
        .map(str::trim)
        .find(|v| !v.is_empty())
        .unwrap_or_default()
        .to_string()
}
