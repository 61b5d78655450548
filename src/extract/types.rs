//! Typed records produced by the extractor
//!
//! Field names serialize to the snake_case keys used in the persisted
//! documents (`confidence_score`, `extraction_method`, `page_url`).

use crate::crawler::FetchMethod;
use serde::Serialize;
use url::Url;

/// How an item was found on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    ContentParsing,
    HeadingExtraction,
    ImgParsing,
    RegexPatternMatching,
    HtmlMailtoLink,
    HtmlTelLink,
    HtmlElementText,
    CssSelectorParsing,
    DomainMatching,
    MetaParsing,
}

/// A paragraph of body copy or a heading
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextItem {
    pub content: String,
    pub page_url: String,
    #[serde(rename = "confidence_score")]
    pub confidence: f64,
    #[serde(rename = "extraction_method")]
    pub method: ExtractionMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageItem {
    /// Absolute image URL
    pub url: String,
    pub alt_text: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub page_url: String,
    #[serde(rename = "confidence_score")]
    pub confidence: f64,
    #[serde(rename = "extraction_method")]
    pub method: ExtractionMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactKind {
    Email,
    Phone,
}

impl ContactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }
}

/// An email address or phone number
///
/// Emails are lowercased; phones are stored as their digits only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactItem {
    #[serde(rename = "type")]
    pub kind: ContactKind,
    pub value: String,
    pub page_url: String,
    #[serde(rename = "confidence_score")]
    pub confidence: f64,
    #[serde(rename = "extraction_method")]
    pub method: ExtractionMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductItem {
    pub name: String,
    pub price: Option<String>,
    pub description: Option<String>,
    pub page_url: String,
    #[serde(rename = "confidence_score")]
    pub confidence: f64,
    #[serde(rename = "extraction_method")]
    pub method: ExtractionMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SocialItem {
    /// Display name of the platform, e.g. `LinkedIn`
    pub platform: String,
    pub url: String,
    pub link_text: String,
    pub page_url: String,
    #[serde(rename = "confidence_score")]
    pub confidence: f64,
    #[serde(rename = "extraction_method")]
    pub method: ExtractionMethod,
}

/// Head metadata for one page; absent values are empty strings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageMetadata {
    pub page_url: String,
    pub depth: u32,
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub og_title: String,
    pub og_description: String,
    pub og_image: String,
    pub canonical_url: String,
    pub language: String,
    pub charset: String,
    pub robots: String,
    pub extraction_method: ExtractionMethod,
    /// Transport that fetched the page
    pub fetch_method: FetchMethod,
}

impl PageMetadata {
    pub fn new(page_url: &str, depth: u32) -> Self {
        Self {
            page_url: page_url.to_string(),
            depth,
            title: String::new(),
            description: String::new(),
            keywords: String::new(),
            og_title: String::new(),
            og_description: String::new(),
            og_image: String::new(),
            canonical_url: String::new(),
            language: String::new(),
            charset: String::new(),
            robots: String::new(),
            extraction_method: ExtractionMethod::MetaParsing,
            fetch_method: FetchMethod::Primary,
        }
    }
}

/// Everything extracted from a single fetched page
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub url: String,
    pub depth: u32,
    pub text: Vec<TextItem>,
    pub images: Vec<ImageItem>,
    pub contacts: Vec<ContactItem>,
    pub products: Vec<ProductItem>,
    pub social: Vec<SocialItem>,
    pub metadata: PageMetadata,
    /// Normalized same-domain links in document order
    pub links: Vec<Url>,
    pub raw_html: String,
    pub method: FetchMethod,
}

impl PageRecord {
    /// Records the transport that fetched this page
    pub fn with_method(mut self, method: FetchMethod) -> Self {
        self.method = method;
        self.metadata.fetch_method = method;
        self
    }
}
