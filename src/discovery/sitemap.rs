//! Sitemap XML parsing
//!
//! Classifies a fetched document as a sitemap index or a urlset and harvests
//! per-URL metadata from the latter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sitemap::reader::{SiteMapEntity, SiteMapReader};
use sitemap::structs::ChangeFreq;
use std::fmt;
use std::io::Cursor;

/// How often a page is expected to change, as declared in a sitemap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFrequency {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Never => "never",
        }
    }

    /// Parses the sitemap spelling, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Some(Self::Always),
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            "never" => Some(Self::Never),
            _ => None,
        }
    }

    fn from_reader(freq: &ChangeFreq) -> Option<Self> {
        match freq {
            ChangeFreq::Always => Some(Self::Always),
            ChangeFreq::Hourly => Some(Self::Hourly),
            ChangeFreq::Daily => Some(Self::Daily),
            ChangeFreq::Weekly => Some(Self::Weekly),
            ChangeFreq::Monthly => Some(Self::Monthly),
            ChangeFreq::Yearly => Some(Self::Yearly),
            ChangeFreq::Never => Some(Self::Never),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata for one `<url>` element of a urlset
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    /// The `<loc>` value as written in the sitemap
    pub url: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub change_frequency: Option<ChangeFrequency>,
    /// Clamped to `[0, 1]`
    pub priority: Option<f32>,
}

/// A classified sitemap document
#[derive(Debug, Clone, PartialEq)]
pub enum SitemapDocument {
    /// `<sitemapindex>`: locations of nested sitemaps
    Index(Vec<String>),

    /// `<urlset>`: page entries
    UrlSet(Vec<SitemapEntry>),

    /// Not XML, or XML without any `<loc>` we can use
    Empty,
}

impl SitemapDocument {
    /// Number of locations the document declares
    pub fn len(&self) -> usize {
        match self {
            Self::Index(children) => children.len(),
            Self::UrlSet(entries) => entries.len(),
            Self::Empty => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parses a sitemap body
///
/// A document that declares any nested `<sitemap>` is treated as an index.
/// Parsing stops at the first XML error; entries read before it are kept.
pub fn parse_sitemap(body: &[u8]) -> SitemapDocument {
    let mut children: Vec<String> = Vec::new();
    let mut entries: Vec<SitemapEntry> = Vec::new();

    for entity in SiteMapReader::new(Cursor::new(body)) {
        match entity {
            SiteMapEntity::Url(url_entry) => {
                let Some(loc) = url_entry.loc.get_url() else {
                    continue;
                };
                entries.push(SitemapEntry {
                    url: loc.to_string(),
                    last_modified: url_entry
                        .lastmod
                        .get_time()
                        .map(|t| t.with_timezone(&Utc)),
                    change_frequency: ChangeFrequency::from_reader(&url_entry.changefreq),
                    priority: url_entry
                        .priority
                        .get_priority()
                        .filter(|p| p.is_finite())
                        .map(|p| p.clamp(0.0, 1.0)),
                });
            }
            SiteMapEntity::SiteMap(sitemap_entry) => {
                if let Some(loc) = sitemap_entry.loc.get_url() {
                    children.push(loc.to_string());
                }
            }
            SiteMapEntity::Err(e) => {
                tracing::trace!("Sitemap parse stopped: {:?}", e);
                break;
            }
        }
    }

    if !children.is_empty() {
        SitemapDocument::Index(children)
    } else if !entries.is_empty() {
        SitemapDocument::UrlSet(entries)
    } else {
        SitemapDocument::Empty
    }
}
