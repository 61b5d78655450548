use super::{
    element_text, selector, truncate_chars, ExtractionError, ExtractionMethod, ProductItem,
};
use regex::Regex;
use scraper::{ElementRef, Html};

const PRODUCT_SELECTOR: &str =
    ".product, .item, .listing, .card, [class*=\"product\"], [class*=\"item\"]";

/// Fallback chain for the product name
const NAME_SELECTORS: &[&str] = &[
    "h1",
    "h2",
    "h3",
    "h4",
    ".title",
    ".name",
    "[class*=\"title\"]",
    "[class*=\"name\"]",
];

/// Fallback chain for the product description
const DESCRIPTION_SELECTORS: &[&str] = &["p", ".description", ".summary", "[class*=\"desc\"]"];

const MAX_PRODUCTS: usize = 10;
const MIN_NAME_CHARS: usize = 2;
const MAX_DESCRIPTION_CHARS: usize = 200;
const PRODUCT_CONFIDENCE: f64 = 0.75;

/// Compiled price pattern
#[derive(Debug)]
pub struct ProductPatterns {
    price: Regex,
}

impl ProductPatterns {
    pub fn new() -> Result<Self, ExtractionError> {
        Ok(Self {
            price: Regex::new(r"[$£€¥]\s?\d+(?:[.,]\d{2})?")?,
        })
    }

    /// First currency amount in `text`
    pub fn price(&self, text: &str) -> Option<String> {
        self.price.find(text).map(|m| m.as_str().to_string())
    }
}

/// Extracts product-like cards in document order
pub(crate) fn extract_products(
    document: &Html,
    page_url: &str,
    patterns: &ProductPatterns,
) -> Result<Vec<ProductItem>, ExtractionError> {
    let cards = selector(PRODUCT_SELECTOR)?;
    let mut products = Vec::new();

    for card in document.select(&cards).take(MAX_PRODUCTS) {
        let name = first_text(card, NAME_SELECTORS)?.unwrap_or_default();
        if name.chars().count() <= MIN_NAME_CHARS {
            continue;
        }

        let price = patterns.price(&element_text(card));
        let description = first_text(card, DESCRIPTION_SELECTORS)?
            .filter(|d| !d.is_empty())
            .map(|d| truncate_chars(&d, MAX_DESCRIPTION_CHARS));

        products.push(ProductItem {
            name,
            price,
            description,
            page_url: page_url.to_string(),
            confidence: PRODUCT_CONFIDENCE,
            method: ExtractionMethod::CssSelectorParsing,
        });
    }

    Ok(products)
}

/// Text of the first descendant matched by the first selector in `chain` that matches
fn first_text(card: ElementRef<'_>, chain: &[&str]) -> Result<Option<String>, ExtractionError> {
    for css in chain {
        let sel = selector(css)?;
        if let Some(found) = card.select(&sel).next() {
            return Ok(Some(element_text(found)));
        }
    }
    Ok(None)
}
