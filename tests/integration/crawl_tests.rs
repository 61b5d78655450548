//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run full scrapes
//! end-to-end through the real HTTP transports.

use site_harvester::config::Config;
use site_harvester::crawler::{
    crawl, FallbackTransport, FetchError, FetchMethod, HttpTransport, Transport,
};
use site_harvester::storage::{DataType, DocumentStore, LocalStore};
use site_harvester::{ScrapeError, ScrapeRequest, ScrapeService};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a fast test configuration
fn test_config() -> Config {
    let mut config = Config::default();
    config.crawler.request_delay_ms = 0;
    config.crawler.page_timeout_secs = 5;
    config.crawler.session_timeout_secs = 30;
    config.fallback.timeout_secs = 5;
    config
}

/// 200 response with an HTML body
///
/// `set_body_string` would pin the content type to `text/plain`.
fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

/// Paths the mock server saw GET requests for
async fn requested_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect()
}

#[tokio::test]
async fn test_crawl_stays_on_domain() {
    let server = MockServer::start().await;
    let base = server.uri();
    let port = url::Url::parse(&base).unwrap().port().unwrap();

    // Same server reached under a different host name counts as off-domain
    mount_page(
        &server,
        "/",
        format!(
            r#"<html><head><title>Home</title></head><body>
            <a href="{}/a">A</a>
            <a href="http://localhost:{}/b">B</a>
            </body></html>"#,
            base, port
        ),
    )
    .await;
    mount_page(&server, "/a", "<html><body><p>Page A</p></body></html>".to_string()).await;
    mount_page(&server, "/b", "<html><body><p>Page B</p></body></html>".to_string()).await;

    let result = crawl(&base, "Test", 1, &test_config()).await.unwrap();

    let crawled: Vec<&String> = result.sitemap.crawl_structure.keys().collect();
    assert_eq!(crawled, vec![&format!("{}/", base), &format!("{}/a", base)]);
    assert_eq!(result.metadata.total_pages_crawled, 2);
    assert_eq!(result.sitemap.coverage_summary.total_pages, 2);
    assert_eq!(result.metadata.fallback_pages, 0);
    assert!(result
        .data
        .metadata
        .iter()
        .all(|m| m.fetch_method == FetchMethod::Primary));
    assert!(!requested_paths(&server).await.contains(&"/b".to_string()));
}

#[tokio::test]
async fn test_crawl_with_depth_limit() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", format!(r#"<a href="{}/d1">next</a>"#, base)).await;
    mount_page(&server, "/d1", format!(r#"<a href="{}/d2">next</a>"#, base)).await;
    mount_page(&server, "/d2", format!(r#"<a href="{}/d3">next</a>"#, base)).await;
    mount_page(&server, "/d3", "<p>too deep</p>".to_string()).await;

    let result = crawl(&base, "Test", 2, &test_config()).await.unwrap();

    assert_eq!(result.sitemap.crawl_structure.len(), 3);
    assert!(result
        .sitemap
        .crawl_structure
        .values()
        .all(|entry| entry.depth <= 2));
    assert_eq!(result.metadata.fallback_pages, 0);
    assert!(!requested_paths(&server).await.contains(&"/d3".to_string()));
}

#[tokio::test]
async fn test_each_url_fetched_once() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        format!(
            r#"<a href="{0}/a">A</a><a href="{0}/a/">A again</a><a href="{0}/a#top">A top</a>"#,
            base
        ),
    )
    .await;
    mount_page(&server, "/a", format!(r#"<a href="{}/">home</a>"#, base)).await;

    let result = crawl(&base, "Test", 3, &test_config()).await.unwrap();

    assert_eq!(result.metadata.urls_visited, 2);
    let paths = requested_paths(&server).await;
    assert_eq!(paths.iter().filter(|p| p.as_str() == "/a").count(), 1);
    assert_eq!(paths.iter().filter(|p| p.as_str() == "/").count(), 1);
}

#[tokio::test]
async fn test_unreachable_root_is_an_error() {
    let server = MockServer::start().await;

    let err = crawl(&server.uri(), "Test", 1, &test_config())
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::RootUnreachable { .. }));
    assert_eq!(err.kind(), "ScrapingError");
}

#[tokio::test]
async fn test_primary_transport_rejects_non_html() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&test_config().user_agent).unwrap();
    let url = url::Url::parse(&format!("{}/data.json", server.uri())).unwrap();
    let err = transport
        .fetch_html(&url, Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::ContentMismatch { .. }));
}

#[tokio::test]
async fn test_primary_transport_accepts_html() {
    let server = MockServer::start().await;
    let config = test_config();

    // Served only to the crawler's own identity
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", config.user_agent.header_value().as_str()))
        .respond_with(html("<html><body><p>Welcome</p></body></html>".to_string()))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&config.user_agent).unwrap();
    let url = url::Url::parse(&format!("{}/", server.uri())).unwrap();
    let (body, text) = transport
        .fetch_html(&url, Duration::from_secs(5))
        .await
        .unwrap();

    assert!(body.contains("<p>Welcome</p>"));
    assert!(text.contains("Welcome"));
}

#[tokio::test]
async fn test_fallback_transport_rejects_non_html() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(vec![0x89, b'P', b'N', b'G'], "image/png"),
        )
        .mount(&server)
        .await;

    let transport = FallbackTransport::new(&test_config().fallback).unwrap();
    let url = url::Url::parse(&format!("{}/logo.png", server.uri())).unwrap();
    let err = transport
        .fetch_html(&url, Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::ContentMismatch { .. }));
}

#[tokio::test]
async fn test_linked_binary_is_not_crawled() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        format!(
            r#"<html><body>
            <a href="{0}/doc.pdf">Brochure</a>
            <a href="{0}/a">A</a>
            </body></html>"#,
            base
        ),
    )
    .await;
    mount_page(&server, "/a", "<html><body><p>Page A</p></body></html>".to_string()).await;
    Mock::given(method("GET"))
        .and(path("/doc.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"%PDF-1.4 binary\0\xff junk".to_vec(), "application/pdf"),
        )
        .mount(&server)
        .await;

    let result = crawl(&base, "Test", 1, &test_config()).await.unwrap();

    let pdf = format!("{}/doc.pdf", base);
    let crawled: Vec<&String> = result.sitemap.crawl_structure.keys().collect();
    assert_eq!(crawled, vec![&format!("{}/", base), &format!("{}/a", base)]);
    assert!(!result.raw_html.contains_key(&pdf));
    assert_eq!(result.sitemap.coverage_summary.total_pages, 2);
    assert_eq!(result.metadata.failed_pages, 1);
    assert_eq!(result.metadata.fallback_pages, 0);
}

#[tokio::test]
async fn test_fallback_transport_rescues_page() {
    let server = MockServer::start().await;
    let mut config = test_config();
    config.fallback.user_agent = "FallbackBrowser/1.0".to_string();

    // Only the browser-like fallback identity gets the page
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", config.fallback.user_agent.as_str()))
        .respond_with(html(
            r#"<html><body><a href="mailto:hello@acme.test">Mail</a></body></html>"#.to_string(),
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = crawl(&server.uri(), "Test", 1, &config).await.unwrap();

    assert_eq!(result.metadata.fallback_pages, 1);
    assert_eq!(result.data.metadata[0].fetch_method, FetchMethod::Fallback);
    assert_eq!(result.data.contact[0].value, "hello@acme.test");
}

#[tokio::test]
async fn test_images_resolved_against_page() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/products/p",
        r#"<html><body><img src="/a.png" alt="Logo"><img src="b.jpg"></body></html>"#
            .to_string(),
    )
    .await;

    let result = crawl(&format!("{}/products/p", base), "Test", 1, &test_config())
        .await
        .unwrap();

    let urls: Vec<&str> = result.data.images.iter().map(|i| i.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}/a.png", base).as_str(),
            format!("{}/products/b.jpg", base).as_str()
        ]
    );
    assert_eq!(result.data.images[0].alt_text, "Logo");
}

#[tokio::test]
async fn test_scrape_service_stores_documents() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "/",
        format!(
            r#"<html><head><title>Acme</title><meta name="description" content="Widgets"></head>
            <body>
            <p>Acme makes reliable widgets for workshops around the world.</p>
            <a href="mailto:sales@acme.test">Sales</a>
            <p>Call (555) 123-4567 for a quote.</p>
            <a href="{}/about">About</a>
            <a href="https://www.linkedin.com/company/acme">LinkedIn</a>
            </body></html>"#,
            base
        ),
    )
    .await;
    mount_page(
        &server,
        "/about",
        "<html><body><h1>About Acme</h1></body></html>".to_string(),
    )
    .await;

    let store = Arc::new(LocalStore::new(dir.path()).unwrap());
    let service = ScrapeService::new(test_config(), store.clone()).unwrap();
    let request = ScrapeRequest::new(base.clone())
        .with_company_name("Acme Corp")
        .with_max_depth(1);

    let response = service.scrape(&request).await;

    assert!(response.is_success(), "{:?}", response.error_message);
    assert_eq!(response.company_name, "Acme_Corp");
    let metadata = response.metadata.as_ref().unwrap();
    assert_eq!(metadata.total_pages_crawled, 2);
    assert_eq!(metadata.extraction_method, "http_dom_parsing");

    let files = response.storage_files.as_ref().unwrap();
    assert!(files.contains_key("social_media"));
    assert!(!files.contains_key("products"));

    let contact = store.load(&files["contact"]).unwrap();
    let values: Vec<&str> = contact["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["value"].as_str().unwrap())
        .collect();
    assert!(values.contains(&"sales@acme.test"));
    assert!(values.contains(&"5551234567"));

    let listed = store
        .list_documents("Acme Corp", Some(DataType::Sitemap))
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].key.starts_with("acme_corp/sitemap/acme_corp_sitemap_"));
}
