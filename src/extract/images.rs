use super::{selector, ExtractionError, ExtractionMethod, ImageItem};
use crate::url::resolve_url;
use scraper::Html;
use url::Url;

const MAX_IMAGES: usize = 20;
const IMAGE_CONFIDENCE: f64 = 0.9;

/// Extracts `<img src>` elements with their src resolved against the page
pub(crate) fn extract_images(
    document: &Html,
    page_url: &Url,
) -> Result<Vec<ImageItem>, ExtractionError> {
    let img = selector("img[src]")?;
    let mut images = Vec::new();

    for element in document.select(&img).take(MAX_IMAGES) {
        let attrs = element.value();
        let src = attrs.attr("src").unwrap_or_default().trim();
        if src.is_empty() {
            continue;
        }
        let Some(resolved) = resolve_url(src, page_url) else {
            continue;
        };

        images.push(ImageItem {
            url: resolved.to_string(),
            alt_text: attrs.attr("alt").unwrap_or_default().trim().to_string(),
            width: dimension(attrs.attr("width")),
            height: dimension(attrs.attr("height")),
            page_url: page_url.to_string(),
            confidence: IMAGE_CONFIDENCE,
            method: ExtractionMethod::ImgParsing,
        });
    }

    Ok(images)
}

/// Parses a width/height attribute only when it is all ASCII digits
fn dimension(value: Option<&str>) -> Option<u32> {
    value
        .filter(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|v| v.parse().ok())
}
