use crate::UrlError;
use url::Url;

/// Normalizes a URL into the key used by the visited set
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Only HTTP and HTTPS schemes are accepted
/// 3. Lowercase the host (the scheme is kept as-is)
/// 4. Collapse trailing slashes on the path; an empty path becomes `/`
/// 5. Remove the fragment
///
/// The query string and path parameters are preserved untouched, so
/// `?page=2` and `?page=3` stay distinct pages.
///
/// # Examples
///
/// ```
/// use site_harvester::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.com/page/#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

/// Same as [`normalize_url`] for an already parsed URL
pub fn normalize_parsed(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
        .ok_or(UrlError::MissingDomain)?;
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;

    let trimmed = url.path().trim_end_matches('/').to_string();
    if trimmed.is_empty() {
        url.set_path("/");
    } else {
        url.set_path(&trimmed);
    }

    url.set_fragment(None);

    Ok(url)
}

/// Resolves an href or src attribute against the page it appeared on
///
/// Handles protocol-relative (`//cdn.example.com/x`), root-relative (`/x`),
/// relative (`x`, `../x`) and absolute forms.
pub fn resolve_url(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base_url.join(href).ok()
}

/// Resolves an anchor href to a followable absolute URL
///
/// Returns None if the link should be excluded:
/// - `javascript:`, `mailto:`, `tel:` and `data:` schemes
/// - fragment-only links (same page anchors)
/// - invalid URLs or non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    let mut absolute = resolve_url(href, base_url)?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    absolute.set_fragment(None);
    Some(absolute)
}
