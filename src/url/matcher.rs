use crate::ConfigError;
use regex::RegexSet;
use url::Url;

/// Matches candidate URLs against a crawl's exclude-pattern list
///
/// Patterns are regular expressions tested against the URL's path plus query
/// (`/cart?step=2`), so `"/admin(/|$)"` excludes `https://example.com/admin`
/// but not `https://admin.example.com/`.
#[derive(Debug, Clone)]
pub struct ExcludeMatcher {
    set: RegexSet,
}

impl ExcludeMatcher {
    /// Compiles the pattern list
    ///
    /// # Examples
    ///
    /// ```
    /// use site_sync::url::ExcludeMatcher;
    ///
    /// let matcher = ExcludeMatcher::new(&["/cart(/|$)".to_string()]).unwrap();
    /// assert!(matcher.is_excluded_str("https://example.com/cart"));
    /// assert!(!matcher.is_excluded_str("https://example.com/cartography"));
    /// ```
    pub fn new(patterns: &[String]) -> Result<Self, ConfigError> {
        let set = RegexSet::new(patterns)
            .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;
        Ok(Self { set })
    }

    /// A matcher that excludes nothing
    pub fn empty() -> Self {
        Self {
            set: RegexSet::empty(),
        }
    }

    /// Returns true if the URL matches any exclude pattern
    pub fn is_excluded(&self, url: &Url) -> bool {
        if self.set.is_empty() {
            return false;
        }

        match url.query() {
            Some(query) => self.set.is_match(&format!("{}?{}", url.path(), query)),
            None => self.set.is_match(url.path()),
        }
    }

    /// String form of [`ExcludeMatcher::is_excluded`]; unparseable input is excluded
    pub fn is_excluded_str(&self, url: &str) -> bool {
        Url::parse(url)
            .map(|u| self.is_excluded(&u))
            .unwrap_or(true)
    }
}
