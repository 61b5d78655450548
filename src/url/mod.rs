//! URL handling module for Site-Harvester
//!
//! Normalization into visited-set keys, crawl-scope domain extraction,
//! href resolution and company-name derivation.

mod domain;
mod normalize;

pub use domain::{company_name_from_url, extract_domain};
pub use normalize::{normalize_parsed, normalize_url, resolve_link, resolve_url};

use url::Url;

/// Returns true when `url` belongs to the crawl scope rooted at `base_domain`
///
/// Scope is exact host (plus port) equality; subdomains are separate sites.
pub fn is_same_domain(url: &Url, base_domain: &str) -> bool {
    extract_domain(url).is_some_and(|d| d == base_domain)
}
