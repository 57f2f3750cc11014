//! Link-preview scraper — fetches a page and extracts its preview metadata.
//!
//! DESIGN
//! ======
//! `MetadataScraper` is the seam the pin service depends on; `HttpScraper`
//! is the production implementation. Fetching is a thin reqwest wrapper and
//! all HTML handling lives in the pure `parse_metadata` for testability.
//! Open Graph tags win, then `<title>` / `description` / `<link rel=icon>`.
//! Only HTML responses are read, and never past `MAX_PAGE_BYTES`.

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::Url;

use crate::config::ScrapeTimeouts;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("page returned status {0}")]
    Status(u16),
    #[error("no preview metadata found at {0}")]
    NoMetadata(String),
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
    #[error("not an html page: {0}")]
    NotHtml(String),
    #[error("page exceeds {0} bytes")]
    TooLarge(usize),
}

/// Upper bound on how much of a page is read before giving up.
pub const MAX_PAGE_BYTES: usize = 1024 * 1024;

/// Preview metadata extracted from a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapedPage {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub site_name: Option<String>,
    pub icon: Option<String>,
}

impl ScrapedPage {
    fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.image_url.is_none()
    }
}

#[async_trait::async_trait]
pub trait MetadataScraper: Send + Sync {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, ScrapeError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

pub struct HttpScraper {
    http: reqwest::Client,
}

impl HttpScraper {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(user_agent: &str, timeouts: ScrapeTimeouts) -> Result<Self, ScrapeError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| ScrapeError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl MetadataScraper for HttpScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, ScrapeError> {
        let page_url = parse_page_url(url)?;

        let mut response = self
            .http
            .get(page_url.clone())
            .send()
            .await
            .map_err(|e| ScrapeError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        ensure_html(content_type)?;
        if response.content_length().is_some_and(|len| len > MAX_PAGE_BYTES as u64) {
            return Err(ScrapeError::TooLarge(MAX_PAGE_BYTES));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ScrapeError::Fetch(e.to_string()))?
        {
            append_capped(&mut body, &chunk, MAX_PAGE_BYTES)?;
        }
        let html = String::from_utf8_lossy(&body);

        let page = parse_metadata(&html, &page_url);
        if page.is_empty() {
            return Err(ScrapeError::NoMetadata(url.to_owned()));
        }
        Ok(page)
    }
}

/// Accept only absolute http(s) URLs.
pub(crate) fn parse_page_url(raw: &str) -> Result<Url, ScrapeError> {
    let url = Url::parse(raw.trim()).map_err(|_| ScrapeError::InvalidUrl(raw.to_owned()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ScrapeError::InvalidUrl(raw.to_owned())),
    }
}

/// Only HTML documents carry preview metadata. A missing header is let
/// through since some servers omit it for HTML.
pub(crate) fn ensure_html(content_type: Option<&str>) -> Result<(), ScrapeError> {
    let Some(raw) = content_type else {
        return Ok(());
    };
    let mime = raw.split(';').next().unwrap_or(raw).trim().to_ascii_lowercase();
    match mime.as_str() {
        "text/html" | "application/xhtml+xml" => Ok(()),
        _ => Err(ScrapeError::NotHtml(mime)),
    }
}

/// Append `chunk` to `body`, failing once the total would pass `cap`.
pub(crate) fn append_capped(body: &mut Vec<u8>, chunk: &[u8], cap: usize) -> Result<(), ScrapeError> {
    if body.len() + chunk.len() > cap {
        return Err(ScrapeError::TooLarge(cap));
    }
    body.extend_from_slice(chunk);
    Ok(())
}

// =============================================================================
// PARSING
// =============================================================================

// Quoted attribute values may contain `>`.
static META_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)<meta\s(?:[^>"']|"[^"]*"|'[^']*')*>"#).expect("static regex"));
static LINK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)<link\s(?:[^>"']|"[^"]*"|'[^']*')*>"#).expect("static regex"));
static TITLE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("static regex"));
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("static regex")
});

/// Extract preview metadata from raw HTML. Relative image and icon URLs are
/// resolved against `page_url`; the site name falls back to the host.
#[must_use]
pub fn parse_metadata(html: &str, page_url: &Url) -> ScrapedPage {
    let mut meta: HashMap<String, String> = HashMap::new();
    for tag in META_TAG.find_iter(html) {
        let attrs = attributes(tag.as_str());
        let Some(key) = attrs.get("property").or_else(|| attrs.get("name")) else {
            continue;
        };
        let Some(content) = attrs.get("content") else {
            continue;
        };
        // First occurrence wins, as browsers and most unfurlers do.
        meta.entry(key.to_ascii_lowercase())
            .or_insert_with(|| content.clone());
    }

    let pick = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| meta.get(*k))
            .map(|v| decode_entities(v.trim()))
            .filter(|v| !v.is_empty())
    };

    let title = pick(&["og:title", "twitter:title"]).or_else(|| {
        TITLE_TAG
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| decode_entities(m.as_str().trim()))
            .filter(|v| !v.is_empty())
    });
    let description = pick(&["og:description", "twitter:description", "description"]);
    let image_url = pick(&["og:image", "og:image:url", "twitter:image"]).and_then(|v| resolve(page_url, &v));
    let site_name = pick(&["og:site_name", "application-name"]).or_else(|| page_url.host_str().map(str::to_owned));
    let icon = find_icon(html).and_then(|href| resolve(page_url, &href));

    ScrapedPage { title, description, image_url, site_name, icon }
}

fn attributes(tag: &str) -> HashMap<String, String> {
    ATTRIBUTE
        .captures_iter(tag)
        .filter_map(|c| {
            let name = c.get(1)?.as_str().to_ascii_lowercase();
            let value = c.get(2).or_else(|| c.get(3))?.as_str().to_owned();
            Some((name, value))
        })
        .collect()
}

fn find_icon(html: &str) -> Option<String> {
    LINK_TAG.find_iter(html).find_map(|tag| {
        let attrs = attributes(tag.as_str());
        let rel = attrs.get("rel")?.to_ascii_lowercase();
        if rel.split_whitespace().any(|r| r == "icon") {
            attrs.get("href").map(|h| decode_entities(h.trim()))
        } else {
            None
        }
    })
}

fn resolve(base: &Url, href: &str) -> Option<String> {
    if href.is_empty() {
        return None;
    }
    base.join(href).ok().map(String::from)
}

fn decode_entities(raw: &str) -> String {
    html_escape::decode_html_entities(raw).into_owned()
}

#[cfg(test)]
#[path = "scrape_test.rs"]
mod tests;
