//! Per-data-type documents handed to the document store

use crate::aggregate::{CoverageSummary, CrawlMetadata, CrawlResult};
use crate::extract::{ContactItem, ExtractionMethod, TextItem};
use crate::storage::DataType;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Short description of a document's payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionSummary {
    pub data_type: &'static str,
    pub total_items: usize,
    pub has_content: bool,

    /// Distinct extraction methods, text only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_types: Option<Vec<ExtractionMethod>>,

    /// Distinct pages the images came from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_pages: Option<usize>,

    /// Contacts per kind (`email`, `phone`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_types: Option<BTreeMap<&'static str, usize>>,

    /// Sum of raw HTML lengths in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_html_size: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_summary: Option<CoverageSummary>,
}

impl ExtractionSummary {
    fn new(data_type: DataType, total_items: usize) -> Self {
        Self {
            data_type: data_type.as_str(),
            total_items,
            has_content: total_items > 0,
            content_types: None,
            unique_pages: None,
            contact_types: None,
            total_html_size: None,
            coverage_summary: None,
        }
    }
}

/// `{metadata, data, data_type, company_name, extraction_summary}`
#[derive(Debug, Serialize)]
pub struct PersistedDocument<'a> {
    pub metadata: &'a CrawlMetadata,
    pub data: serde_json::Value,
    pub data_type: &'static str,
    pub company_name: &'a str,
    pub extraction_summary: ExtractionSummary,
}

/// Builds one document for every data type that has content
///
/// Types are returned in [`DataType::ALL`] order; empty collections are
/// skipped.
pub fn build_documents(
    result: &CrawlResult,
    company_name: &str,
) -> Result<Vec<(DataType, serde_json::Value)>, serde_json::Error> {
    let mut documents = Vec::new();

    for data_type in DataType::ALL {
        let (data, summary) = match data_type {
            DataType::Text => (
                serde_json::to_value(&result.data.text)?,
                text_summary(&result.data.text),
            ),
            DataType::Images => {
                let mut summary = ExtractionSummary::new(data_type, result.data.images.len());
                let pages: HashSet<&str> = result
                    .data
                    .images
                    .iter()
                    .map(|i| i.page_url.as_str())
                    .collect();
                summary.unique_pages = Some(pages.len());
                (serde_json::to_value(&result.data.images)?, summary)
            }
            DataType::Contact => (
                serde_json::to_value(&result.data.contact)?,
                contact_summary(&result.data.contact),
            ),
            DataType::Products => (
                serde_json::to_value(&result.data.products)?,
                ExtractionSummary::new(data_type, result.data.products.len()),
            ),
            DataType::SocialMedia => (
                serde_json::to_value(&result.data.social_media)?,
                ExtractionSummary::new(data_type, result.data.social_media.len()),
            ),
            DataType::Metadata => (
                serde_json::to_value(&result.data.metadata)?,
                ExtractionSummary::new(data_type, result.data.metadata.len()),
            ),
            DataType::RawHtml => {
                let mut summary = ExtractionSummary::new(data_type, result.raw_html.len());
                summary.total_html_size = Some(result.raw_html.values().map(String::len).sum());
                (serde_json::to_value(&result.raw_html)?, summary)
            }
            DataType::Sitemap => {
                let mut summary =
                    ExtractionSummary::new(data_type, result.sitemap.crawl_structure.len());
                summary.coverage_summary = Some(result.sitemap.coverage_summary);
                (serde_json::to_value(&result.sitemap)?, summary)
            }
        };

        if !summary.has_content {
            continue;
        }

        let document = PersistedDocument {
            metadata: &result.metadata,
            data,
            data_type: data_type.as_str(),
            company_name,
            extraction_summary: summary,
        };
        documents.push((data_type, serde_json::to_value(&document)?));
    }

    Ok(documents)
}

fn text_summary(items: &[TextItem]) -> ExtractionSummary {
    let mut summary = ExtractionSummary::new(DataType::Text, items.len());
    let mut methods = Vec::new();
    for item in items {
        if !methods.contains(&item.method) {
            methods.push(item.method);
        }
    }
    summary.content_types = Some(methods);
    summary
}

fn contact_summary(items: &[ContactItem]) -> ExtractionSummary {
    let mut summary = ExtractionSummary::new(DataType::Contact, items.len());
    let mut counts = BTreeMap::new();
    for item in items {
        *counts.entry(item.kind.as_str()).or_insert(0) += 1;
    }
    summary.contact_types = Some(counts);
    summary
}
