//! HTML extraction of page metadata and links
//!
//! This module turns fetched HTML into a `PageRecord`:
//! - Title (with `og:title` and `<h1>` fallbacks)
//! - Description (with `og:description` fallback)
//! - Links to follow (from `<a>` tags and canonical links)
//!
//! html5ever recovers from any malformed input, so extraction never fails;
//! a broken document yields whatever fields could be read.

use crate::discovery::SitemapEntry;
use crate::storage::PageRecord;
use crate::url::{normalize_url_with, NormalizeOptions, SiteRoot};
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    /// Page title; empty when nothing usable was found
    pub title: String,

    pub description: Option<String>,

    /// Every followable link on the page, normalized, first occurrence order
    pub links: Vec<String>,
}

impl ParsedPage {
    /// Builds the page record for a fetched URL
    ///
    /// Only same-site links are kept. `lastModified` prefers the sitemap value
    /// over the HTTP header; change frequency and priority come only from the
    /// sitemap.
    pub fn into_record(
        self,
        url: &Url,
        site: &SiteRoot,
        entry: Option<&SitemapEntry>,
        header_last_modified: Option<DateTime<Utc>>,
        used_fallback: bool,
    ) -> PageRecord {
        let links = self
            .links
            .into_iter()
            .filter(|link| site.contains(link))
            .collect();

        PageRecord {
            url: url.to_string(),
            domain: site.host().to_string(),
            title: self.title,
            description: self.description,
            last_modified: entry
                .and_then(|e| e.last_modified)
                .or(header_last_modified),
            change_frequency: entry.and_then(|e| e.change_frequency),
            priority: entry.and_then(|e| e.priority),
            links,
            used_fallback,
        }
    }
}

/// Parses HTML content and extracts links and metadata
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs and fragment-only hrefs
/// - Anything the normalizer rejects (binary assets, other schemes)
///
/// # Example
///
/// ```
/// use site_sync::crawler::parse_html;
/// use site_sync::url::NormalizeOptions;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page/">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url, NormalizeOptions::default());
/// assert_eq!(parsed.title, "Test");
/// assert_eq!(parsed.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_html(html: &str, base_url: &Url, options: NormalizeOptions) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        description: extract_description(&document),
        links: extract_links(&document, base_url, options),
    }
}

/// Extracts a page record with default normalization
///
/// Convenience wrapper for callers that have no HTTP header data.
pub fn extract(
    html: &str,
    url: &Url,
    site: &SiteRoot,
    entry: Option<&SitemapEntry>,
) -> PageRecord {
    parse_html(html, url, NormalizeOptions::default()).into_record(url, site, entry, None, false)
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .map(element_text)
        .find(|text| !text.is_empty())
}

/// Content of the first `<meta>` whose `attr` equals `value`, case-insensitively
fn meta_content(document: &Html, attr: &str, value: &str) -> Option<String> {
    let selector = Selector::parse(&format!("meta[{}][content]", attr)).ok()?;
    document
        .select(&selector)
        .filter(|element| {
            element
                .value()
                .attr(attr)
                .is_some_and(|v| v.trim().eq_ignore_ascii_case(value))
        })
        .filter_map(|element| element.value().attr("content"))
        .map(|content| content.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|content| !content.is_empty())
}

fn extract_title(document: &Html) -> String {
    first_text(document, "title")
        .or_else(|| meta_content(document, "property", "og:title"))
        .or_else(|| first_text(document, "h1"))
        .unwrap_or_default()
}

fn extract_description(document: &Html) -> Option<String> {
    meta_content(document, "name", "description")
        .or_else(|| meta_content(document, "property", "og:description"))
}

fn extract_links(document: &Html, base_url: &Url, options: NormalizeOptions) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();
    let mut push = |href: &str| {
        if let Some(link) = resolve_link(href, base_url, options) {
            if seen.insert(link.clone()) {
                links.push(link);
            }
        }
    };

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    links
}

/// Resolves an href against the page URL and normalizes it
fn resolve_link(href: &str, base_url: &Url, options: NormalizeOptions) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    normalize_url_with(absolute.as_str(), options)
}
