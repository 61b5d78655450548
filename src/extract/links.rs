use super::{selector, ExtractionError};
use crate::url::{extract_domain, is_same_domain, normalize_parsed, resolve_link};
use scraper::Html;
use tracing::debug;
use url::Url;

/// Extracts followable same-domain links
///
/// # Link Rules
///
/// **Include:** `<a href>` targets on the page's own host (and port)
///
/// **Exclude:**
/// - empty, `mailto:`, `tel:`, `javascript:`, `data:` and bare-fragment hrefs
/// - non-HTTP(S) targets
/// - other hosts, subdomains included
///
/// Results are normalized and de-duplicated in document order.
pub(crate) fn extract_links(document: &Html, page_url: &Url) -> Result<Vec<Url>, ExtractionError> {
    let Some(base_domain) = extract_domain(page_url) else {
        return Ok(Vec::new());
    };

    let anchors = selector("a[href]")?;
    let mut links: Vec<Url> = Vec::new();
    let mut skipped = 0usize;

    for anchor in document.select(&anchors) {
        let href = anchor.value().attr("href").unwrap_or_default();
        let Some(absolute) = resolve_link(href, page_url) else {
            skipped += 1;
            continue;
        };
        if !is_same_domain(&absolute, &base_domain) {
            skipped += 1;
            continue;
        }
        let Ok(normalized) = normalize_parsed(absolute) else {
            skipped += 1;
            continue;
        };
        if !links.contains(&normalized) {
            links.push(normalized);
        }
    }

    debug!(
        "Found {} links on {} ({} skipped)",
        links.len(),
        page_url,
        skipped
    );
    Ok(links)
}
