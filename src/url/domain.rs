use url::Url;

/// File extensions that never lead to an auditable HTML page
const NON_HTML_EXTENSIONS: &[&str] = &[
    ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp", ".ico", ".css", ".js", ".xml",
    ".json", ".zip", ".gz", ".mp4", ".mp3", ".webm", ".woff", ".woff2",
];

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_lens::url::extract_domain;
///
/// let url = Url::parse("https://Blog.Example.com:8443/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("blog.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Strips a leading `www.` so that `www.example.com` and `example.com`
/// compare as the same site
pub fn site_host(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Returns true if the URL path ends in an extension that is not an HTML page
pub fn is_non_html_target(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    NON_HTML_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_domain_lowercases() {
        let url = Url::parse("https://EXAMPLE.COM/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_ip_host() {
        let url = Url::parse("http://127.0.0.1:9000/").unwrap();
        assert_eq!(extract_domain(&url), Some("127.0.0.1".to_string()));
    }

    #[test]
    fn test_site_host_strips_www() {
        assert_eq!(site_host("www.example.com"), "example.com");
        assert_eq!(site_host("example.com"), "example.com");
        assert_eq!(site_host("wwwexample.com"), "wwwexample.com");
    }

    #[test]
    fn test_non_html_targets() {
        let pdf = Url::parse("https://example.com/files/Report.PDF").unwrap();
        let page = Url::parse("https://example.com/about").unwrap();
        let query = Url::parse("https://example.com/search?format=json").unwrap();

        assert!(is_non_html_target(&pdf));
        assert!(!is_non_html_target(&page));
        assert!(!is_non_html_target(&query));
    }
}
