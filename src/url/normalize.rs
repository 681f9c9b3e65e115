use crate::UrlError;
use url::Url;

/// File extensions that never hold crawlable HTML
const BINARY_EXTENSIONS: &[&str] = &[
    // images
    "jpg", "jpeg", "png", "gif", "webp", "svg", "ico", "bmp", "tif", "tiff", "avif",
    // archives
    "zip", "rar", "7z", "tar", "gz", "tgz", "bz2", "xz",
    // audio
    "mp3", "wav", "ogg", "flac", "aac", "m4a",
    // video
    "mp4", "m4v", "avi", "mov", "wmv", "mkv", "webm", "flv",
    // documents and binaries
    "pdf", "exe", "dmg", "iso", "woff", "woff2", "ttf", "eot",
];

/// Options that alter normalization for a crawl run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Drop the query string entirely
    pub ignore_query_params: bool,
}

/// Normalizes a URL into its canonical string form
///
/// Returns `None` for unparseable input, non-HTTP(S) schemes, and URLs that
/// point at binary assets. Never panics.
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject schemes other than http/https
/// 3. Lowercase the host (the authority)
/// 4. Normalize path:
///    - Remove dot segments and empty segments
///    - Remove trailing slash (except for root /)
///    - Empty path becomes /
/// 5. Reject binary-asset extensions (images, archives, audio/video, pdf)
/// 6. Remove fragment
/// 7. Preserve the query string verbatim (or drop it when asked to); an empty
///    query (trailing `?`) is removed
///
/// The result is a fixed point: normalizing it again returns it unchanged.
///
/// # Examples
///
/// ```
/// use site_sync::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.COM/page/#top").unwrap();
/// assert_eq!(url, "https://example.com/page");
///
/// assert_eq!(normalize_url("https://example.com/logo.png"), None);
/// ```
pub fn normalize_url(url_str: &str) -> Option<String> {
    normalize_url_with(url_str, NormalizeOptions::default())
}

/// Normalizes a URL using run-specific options
pub fn normalize_url_with(url_str: &str, options: NormalizeOptions) -> Option<String> {
    match parse_normalized(url_str, options) {
        Ok(url) => Some(url.into()),
        Err(e) => {
            tracing::trace!("Rejected URL {}: {}", url_str, e);
            None
        }
    }
}

/// Parses and normalizes a URL, reporting why it was rejected
pub fn parse_normalized(url_str: &str, options: NormalizeOptions) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or(UrlError::MissingDomain)?
        .to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;

    let normalized_path = normalize_path(url.path());
    if has_binary_extension(&normalized_path) {
        return Err(UrlError::BinaryAsset(normalized_path));
    }
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if options.ignore_query_params || url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}

/// Returns true if the path ends in a known binary-asset extension
pub fn has_binary_extension(path: &str) -> bool {
    let last_segment = path.rsplit('/').next().unwrap_or("");
    match last_segment.rsplit_once('.') {
        Some((_, ext)) => BINARY_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut normalized_segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            // Skip empty segments (from multiple slashes) and current directory markers
            "" | "." => continue,
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", normalized_segments.join("/"))
}
