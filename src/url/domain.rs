use crate::SyncError;
use url::Url;

/// Extracts the domain from a URL
///
/// Returns the lowercase host portion, or None if the URL has no host.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_sync::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Strips a single leading `www.` label
fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// The tracked site a crawl runs against
///
/// Accepts either a bare host (`example.com`, crawled over https) or a full
/// origin (`http://127.0.0.1:8080`). Path, query and fragment are discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRoot {
    origin: Url,
    host: String,
}

impl SiteRoot {
    /// Parses a domain argument into a site root
    ///
    /// # Examples
    ///
    /// ```
    /// use site_sync::url::SiteRoot;
    ///
    /// let site = SiteRoot::parse("Example.com").unwrap();
    /// assert_eq!(site.root_url(), "https://example.com/");
    /// assert_eq!(site.robots_url(), "https://example.com/robots.txt");
    /// ```
    pub fn parse(input: &str) -> Result<Self, SyncError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(SyncError::InvalidDomain("empty domain".to_string()));
        }

        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };

        let mut origin = Url::parse(&candidate)
            .map_err(|e| SyncError::InvalidDomain(format!("{}: {}", input, e)))?;

        if origin.scheme() != "http" && origin.scheme() != "https" {
            return Err(SyncError::InvalidDomain(format!(
                "{}: unsupported scheme {}",
                input,
                origin.scheme()
            )));
        }

        let host = extract_domain(&origin)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| SyncError::InvalidDomain(format!("{}: missing host", input)))?;

        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);

        Ok(Self { origin, host })
    }

    /// Lowercase host of the site, as stored in page records
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Origin URL with a root path
    pub fn url(&self) -> &Url {
        &self.origin
    }

    /// Canonical homepage URL
    pub fn root_url(&self) -> String {
        self.origin.to_string()
    }

    /// Location of robots.txt
    pub fn robots_url(&self) -> String {
        self.join("/robots.txt")
            .unwrap_or_else(|| format!("{}robots.txt", self.origin))
    }

    /// Resolves a path against the site origin
    pub fn join(&self, path: &str) -> Option<String> {
        self.origin.join(path).ok().map(String::from)
    }

    /// Returns true if the URL belongs to this site
    ///
    /// Hosts compare case-insensitively with a leading `www.` ignored on
    /// either side; ports are not compared.
    pub fn is_same_site(&self, url: &Url) -> bool {
        match url.host_str() {
            Some(host) => strip_www(&host.to_lowercase()) == strip_www(&self.host),
            None => false,
        }
    }

    /// String form of [`SiteRoot::is_same_site`]; unparseable input is off-site
    pub fn contains(&self, url: &str) -> bool {
        Url::parse(url)
            .map(|u| self.is_same_site(&u))
            .unwrap_or(false)
    }
}
