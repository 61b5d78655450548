use super::{element_text, selector, ExtractionError, ExtractionMethod, SocialItem};
use crate::url::resolve_url;
use scraper::Html;
use url::Url;

/// Platform host and display name, checked in this order
const PLATFORMS: &[(&str, &str)] = &[
    ("facebook.com", "Facebook"),
    ("twitter.com", "Twitter"),
    ("x.com", "X (Twitter)"),
    ("linkedin.com", "LinkedIn"),
    ("instagram.com", "Instagram"),
    ("youtube.com", "YouTube"),
    ("tiktok.com", "TikTok"),
    ("pinterest.com", "Pinterest"),
    ("snapchat.com", "Snapchat"),
    ("github.com", "GitHub"),
];

const SOCIAL_CONFIDENCE: f64 = 0.95;

fn platform_for(url: &Url) -> Option<&'static str> {
    let host = url.host_str()?.to_lowercase();
    PLATFORMS
        .iter()
        .find(|(domain, _)| host == *domain || host.ends_with(&format!(".{}", domain)))
        .map(|(_, name)| *name)
}

/// Extracts at most one profile link per platform, first anchor wins
pub(crate) fn extract_social(
    document: &Html,
    page_url: &Url,
) -> Result<Vec<SocialItem>, ExtractionError> {
    let anchors = selector("a[href]")?;
    let mut found: Vec<SocialItem> = Vec::new();

    for anchor in document.select(&anchors) {
        let href = anchor.value().attr("href").unwrap_or_default();
        let Some(target) = resolve_url(href, page_url) else {
            continue;
        };
        let Some(platform) = platform_for(&target) else {
            continue;
        };
        if found.iter().any(|s| s.platform == platform) {
            continue;
        }

        found.push(SocialItem {
            platform: platform.to_string(),
            url: target.to_string(),
            link_text: element_text(anchor),
            page_url: page_url.to_string(),
            confidence: SOCIAL_CONFIDENCE,
            method: ExtractionMethod::DomainMatching,
        });
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(html: &str) -> Vec<SocialItem> {
        let document = Html::parse_document(html);
        extract_social(&document, &Url::parse("https://ex.com/").unwrap()).unwrap()
    }

    #[test]
    fn test_platforms_detected() {
        let social = run(r#"
            <a href="https://www.facebook.com/acme">Facebook</a>
            <a href="https://github.com/acme">Code</a>
            <a href="https://x.com/acme">X</a>"#);
        let platforms: Vec<&str> = social.iter().map(|s| s.platform.as_str()).collect();
        assert_eq!(platforms, vec!["Facebook", "GitHub", "X (Twitter)"]);
        assert_eq!(social[1].link_text, "Code");
        assert_eq!(social[0].confidence, 0.95);
    }

    #[test]
    fn test_one_entry_per_platform() {
        let social = run(r#"
            <a href="https://twitter.com/acme">first</a>
            <a href="https://twitter.com/acme_support">second</a>"#);
        assert_eq!(social.len(), 1);
        assert_eq!(social[0].url, "https://twitter.com/acme");
    }

    #[test]
    fn test_lookalike_hosts_ignored() {
        let social = run(r#"
            <a href="https://notfacebook.com/x">a</a>
            <a href="https://ex.com/?ref=linkedin.com">b</a>
            <a href="https://box.com/share">c</a>"#);
        assert!(social.is_empty());
    }

    #[test]
    fn test_subdomain_matches() {
        let social = run(r#"<a href="https://m.youtube.com/@acme">Watch</a>"#);
        assert_eq!(social[0].platform, "YouTube");
    }
}
