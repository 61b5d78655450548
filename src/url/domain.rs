use url::Url;

/// Subdomain labels skipped when deriving a company name from a host
const GENERIC_SUBDOMAINS: &[&str] = &["www", "web", "app", "api"];

/// Extracts the crawl-scoping domain from a URL
///
/// The host is lowercased and an explicit non-default port is kept, so
/// `http://127.0.0.1:8080/` and `http://127.0.0.1:9090/` are different sites.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_harvester::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://localhost:8080/").unwrap();
/// assert_eq!(extract_domain(&url), Some("localhost:8080".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Derives a display company name from a site URL
///
/// Takes the first meaningful host label (skipping `www`, `web`, `app` and
/// `api`), turns hyphens and underscores into spaces and title-cases the
/// result: `https://www.acme-widgets.com` becomes `Acme Widgets`.
pub fn company_name_from_url(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_lowercase();
    let labels: Vec<&str> = host.split('.').collect();

    let label = if labels.len() >= 2 {
        if GENERIC_SUBDOMAINS.contains(&labels[0]) {
            labels[1]
        } else {
            labels[0]
        }
    } else {
        host.as_str()
    };

    title_case(&label.replace(['-', '_'], " "))
}

/// Uppercases the first letter of every alphabetic run, lowercasing the rest
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
