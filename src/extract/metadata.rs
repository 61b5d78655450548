use super::{element_text, selector, ExtractionError, PageMetadata};
use scraper::Html;

/// Reads title, meta tags, canonical link, language and charset
pub(crate) fn extract_metadata(
    document: &Html,
    page_url: &str,
    depth: u32,
) -> Result<PageMetadata, ExtractionError> {
    let mut metadata = PageMetadata::new(page_url, depth);

    let title = selector("title")?;
    if let Some(element) = document.select(&title).next() {
        metadata.title = element_text(element);
    }

    let meta = selector("meta")?;
    for tag in document.select(&meta) {
        let attrs = tag.value();
        let name = attrs.attr("name").unwrap_or_default().to_lowercase();
        let property = attrs.attr("property").unwrap_or_default().to_lowercase();
        let content = attrs.attr("content").unwrap_or_default().to_string();

        match (name.as_str(), property.as_str()) {
            ("description", _) => metadata.description = content,
            ("keywords", _) => metadata.keywords = content,
            ("robots", _) => metadata.robots = content,
            (_, "og:title") => metadata.og_title = content,
            (_, "og:description") => metadata.og_description = content,
            (_, "og:image") => metadata.og_image = content,
            _ => {
                if let Some(charset) = attrs.attr("charset") {
                    metadata.charset = charset.to_string();
                }
            }
        }
    }

    let canonical = selector("link[rel~=\"canonical\"]")?;
    if let Some(link) = document.select(&canonical).next() {
        metadata.canonical_url = link.value().attr("href").unwrap_or_default().to_string();
    }

    metadata.language = document
        .root_element()
        .value()
        .attr("lang")
        .unwrap_or_default()
        .to_string();

    Ok(metadata)
}
