use super::{element_text, selector, text_lines, truncate_chars, ExtractionError};
use super::{ExtractionMethod, TextItem};
use scraper::Html;

/// Main content regions, tried in order
const CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    ".content",
    ".main-content",
    ".entry-content",
    ".post-content",
    "#content",
];

const MIN_REGION_CHARS: usize = 50;
const MIN_PARAGRAPH_CHARS: usize = 20;
const MAX_PARAGRAPHS: usize = 20;
const MAX_PARAGRAPH_CHARS: usize = 1000;
const MAX_HEADINGS: usize = 10;
const MIN_HEADING_CHARS: usize = 3;

const PARAGRAPH_CONFIDENCE: f64 = 0.85;
const HEADING_CONFIDENCE: f64 = 0.95;

/// Extracts body paragraphs followed by headings
///
/// Paragraphs come from the first content region that matches; a missing or
/// nearly empty region falls back to the whole-page text.
pub(crate) fn extract_text(
    document: &Html,
    page_text: &str,
    page_url: &str,
) -> Result<Vec<TextItem>, ExtractionError> {
    let mut region = String::new();
    for css in CONTENT_SELECTORS {
        let sel = selector(css)?;
        if let Some(element) = document.select(&sel).next() {
            region = text_lines(element).join("\n");
            break;
        }
    }

    let body = if region.chars().count() < MIN_REGION_CHARS {
        page_text
    } else {
        region.as_str()
    };

    let mut items: Vec<TextItem> = body
        .lines()
        .map(str::trim)
        .filter(|line| line.chars().count() > MIN_PARAGRAPH_CHARS)
        .take(MAX_PARAGRAPHS)
        .map(|line| TextItem {
            content: truncate_chars(line, MAX_PARAGRAPH_CHARS),
            page_url: page_url.to_string(),
            confidence: PARAGRAPH_CONFIDENCE,
            method: ExtractionMethod::ContentParsing,
        })
        .collect();

    let headings = selector("h1, h2, h3, h4, h5, h6")?;
    for heading in document.select(&headings).take(MAX_HEADINGS) {
        let text = element_text(heading);
        if text.chars().count() <= MIN_HEADING_CHARS {
            continue;
        }
        items.push(TextItem {
            content: format!("[{}] {}", heading.value().name().to_uppercase(), text),
            page_url: page_url.to_string(),
            confidence: HEADING_CONFIDENCE,
            method: ExtractionMethod::HeadingExtraction,
        });
    }

    Ok(items)
}
