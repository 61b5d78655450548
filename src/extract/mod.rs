//! Structured fact extraction from fetched HTML
//!
//! A page is parsed once with `scraper` and then handed to a set of
//! independent sub-extractions:
//! - body text and headings
//! - images
//! - emails and phone numbers
//! - product listings
//! - social profile links
//! - head metadata
//! - same-domain links to follow
//!
//! A sub-extraction that fails is logged and contributes an empty result;
//! the rest of the page is still used.

mod contacts;
mod images;
mod links;
mod metadata;
mod products;
mod social;
mod text;
mod types;

pub use contacts::ContactPatterns;
pub use products::ProductPatterns;
pub use types::{
    ContactItem, ContactKind, ExtractionMethod, ImageItem, PageMetadata, PageRecord, ProductItem,
    SocialItem, TextItem,
};

use crate::crawler::FetchMethod;
use scraper::{ElementRef, Html, Selector};
use tracing::{info, warn};
use url::Url;

/// Errors raised inside a single sub-extraction
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Parses a CSS selector, mapping the parser's error into [`ExtractionError`]
pub(crate) fn selector(css: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(css).map_err(|e| ExtractionError::Selector {
        selector: css.to_string(),
        message: format!("{:?}", e),
    })
}

/// Trimmed, non-empty text nodes under `element`, skipping script and style content
pub(crate) fn text_lines(element: ElementRef<'_>) -> Vec<String> {
    let mut lines = Vec::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| matches!(e.name(), "script" | "style" | "noscript"))
        });
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed.to_string());
        }
    }
    lines
}

/// Text of an element with whitespace runs at node boundaries collapsed to one space
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// First `max` characters of `s`
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Strips markup from an HTML document, one text node per line
///
/// # Example
///
/// ```
/// use site_harvester::extract::plain_text;
///
/// let text = plain_text("<html><body><h1>Hi</h1><script>x()</script><p>there</p></body></html>");
/// assert_eq!(text, "Hi\nthere");
/// ```
pub fn plain_text(html: &str) -> String {
    let document = Html::parse_document(html);
    text_lines(document.root_element()).join("\n")
}

/// Runs every sub-extraction over a page
///
/// Regular expressions are compiled once here and shared by all workers of a
/// session through an `Arc`.
#[derive(Debug)]
pub struct Extractor {
    contact_patterns: ContactPatterns,
    product_patterns: ProductPatterns,
}

impl Extractor {
    pub fn new() -> Result<Self, ExtractionError> {
        Ok(Self {
            contact_patterns: ContactPatterns::new()?,
            product_patterns: ProductPatterns::new()?,
        })
    }

    /// Extracts every record type and the followable links from one page
    ///
    /// The returned record carries [`FetchMethod::Primary`]; callers that
    /// fetched through the fallback use [`PageRecord::with_method`].
    pub fn extract(&self, html: &str, page_url: &Url, depth: u32) -> PageRecord {
        let document = Html::parse_document(html);
        let page_text = text_lines(document.root_element()).join("\n");
        let url = page_url.as_str();

        let text = isolate("text", url, text::extract_text(&document, &page_text, url));
        let images = isolate("images", url, images::extract_images(&document, page_url));
        let contacts = isolate(
            "contact",
            url,
            contacts::extract_contacts(&document, &page_text, url, &self.contact_patterns),
        );
        let products = isolate(
            "products",
            url,
            products::extract_products(&document, url, &self.product_patterns),
        );
        let social = isolate("social_media", url, social::extract_social(&document, page_url));
        let metadata = metadata::extract_metadata(&document, url, depth).unwrap_or_else(|e| {
            warn!("Metadata extraction failed for {}: {}", url, e);
            PageMetadata::new(url, depth)
        });
        let links = isolate("links", url, links::extract_links(&document, page_url));

        info!(
            "Extracted data from {}: {} text, {} images, {} contacts, {} products, {} social",
            url,
            text.len(),
            images.len(),
            contacts.len(),
            products.len(),
            social.len()
        );

        PageRecord {
            url: url.to_string(),
            depth,
            text,
            images,
            contacts,
            products,
            social,
            metadata,
            links,
            raw_html: html.to_string(),
            method: FetchMethod::Primary,
        }
    }
}

fn isolate<T: Default>(what: &str, url: &str, result: Result<T, ExtractionError>) -> T {
    result.unwrap_or_else(|e| {
        warn!("{} extraction failed for {}: {}", what, url, e);
        T::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://ex.com/p").unwrap()
    }

    const PAGE: &str = r#"<html lang="en"><head><title>Acme</title></head><body>
        <main><h1>Welcome to Acme</h1>
        <p>We build industrial widgets for demanding customers worldwide.</p></main>
        <img src="/a.png" alt="logo">
        <a href="mailto:x@y.com">x@y.com</a>
        <p>Call (555) 123-4567</p>
        <a href="/about">About</a>
        <a href="https://other.com/b">Elsewhere</a>
        <a href="https://www.linkedin.com/company/acme">LinkedIn</a>
        </body></html>"#;

    #[test]
    fn test_plain_text_skips_script_and_style() {
        let text = plain_text(concat!(
            "<html><head><style>p{}</style></head>",
            "<body><p>a</p><noscript>n</noscript></body></html>",
        ));
        assert_eq!(text, "a");
    }

    #[test]
    fn test_invalid_selector_is_an_error() {
        assert!(matches!(
            selector("[[nope"),
            Err(ExtractionError::Selector { .. })
        ));
    }

    #[test]
    fn test_truncate_chars_counts_characters() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[test]
    fn test_extract_full_page() {
        let extractor = Extractor::new().unwrap();
        let record = extractor.extract(PAGE, &page_url(), 0);

        assert_eq!(record.url, "https://ex.com/p");
        assert_eq!(record.depth, 0);
        assert_eq!(record.method, FetchMethod::Primary);
        assert_eq!(record.metadata.title, "Acme");
        assert_eq!(record.metadata.language, "en");
        assert_eq!(record.images[0].url, "https://ex.com/a.png");
        assert_eq!(record.social.len(), 1);
        assert_eq!(record.social[0].platform, "LinkedIn");
        assert_eq!(
            record.links,
            vec![Url::parse("https://ex.com/about").unwrap()]
        );

        let email = record
            .contacts
            .iter()
            .find(|c| c.kind == ContactKind::Email)
            .unwrap();
        assert_eq!(email.value, "x@y.com");
        assert_eq!(email.confidence, 0.98);

        let phone = record
            .contacts
            .iter()
            .find(|c| c.kind == ContactKind::Phone)
            .unwrap();
        assert_eq!(phone.value, "5551234567");
        assert!(phone.confidence >= 0.8);
    }

    #[test]
    fn test_with_method_tags_record_and_metadata() {
        let extractor = Extractor::new().unwrap();
        let record = extractor
            .extract(PAGE, &page_url(), 1)
            .with_method(FetchMethod::Fallback);
        assert_eq!(record.method, FetchMethod::Fallback);
        assert_eq!(record.metadata.fetch_method, FetchMethod::Fallback);
    }

    #[test]
    fn test_extract_is_deterministic() {
        let extractor = Extractor::new().unwrap();
        let a = extractor.extract(PAGE, &page_url(), 0);
        let b = extractor.extract(PAGE, &page_url(), 0);
        assert_eq!(a.contacts, b.contacts);
        assert_eq!(a.text, b.text);
    }

    #[test]
    fn test_empty_document() {
        let extractor = Extractor::new().unwrap();
        let record = extractor.extract("", &page_url(), 0);
        assert!(record.text.is_empty());
        assert!(record.images.is_empty());
        assert!(record.contacts.is_empty());
        assert!(record.links.is_empty());
        assert_eq!(record.metadata.title, "");
    }
}
