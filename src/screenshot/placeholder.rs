//! Generated stand-in images for captures that did not happen

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use url::Url;

pub const PLACEHOLDER_WIDTH: u32 = 1280;
pub const PLACEHOLDER_HEIGHT: u32 = 720;

const SUBTITLE: &str = "Sumi-Lens SEO Audit";

/// An SVG card showing the URL's domain, as a data-URI
///
/// URLs without a host get a plain "SEO Audit Preview" card.
pub fn placeholder_data_uri(url: &str) -> String {
    let svg = match Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_string)) {
        Some(domain) => domain_card(&domain),
        None => fallback_card(),
    };
    format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg))
}

fn domain_card(domain: &str) -> String {
    format!(
        r##"<svg width="{w}" height="{h}" xmlns="http://www.w3.org/2000/svg">
  <defs>
    <linearGradient id="gradient" x1="0%" y1="0%" x2="100%" y2="100%">
      <stop offset="0%" stop-color="#4f46e5" />
      <stop offset="100%" stop-color="#7c3aed" />
    </linearGradient>
  </defs>
  <rect width="100%" height="100%" fill="url(#gradient)" />
  <text x="50%" y="40%" font-family="Arial, sans-serif" font-size="48" text-anchor="middle" fill="white" font-weight="bold">{domain}</text>
  <text x="50%" y="55%" font-family="Arial, sans-serif" font-size="24" text-anchor="middle" fill="#e0e7ff">{subtitle}</text>
  <text x="50%" y="70%" font-family="Arial, sans-serif" font-size="18" text-anchor="middle" fill="#c7d2fe">Screenshot preview</text>
</svg>"##,
        w = PLACEHOLDER_WIDTH,
        h = PLACEHOLDER_HEIGHT,
        domain = escape_xml(domain),
        subtitle = SUBTITLE,
    )
}

fn fallback_card() -> String {
    format!(
        r##"<svg width="{w}" height="{h}" xmlns="http://www.w3.org/2000/svg">
  <rect width="100%" height="100%" fill="#1e40af" />
  <text x="50%" y="50%" font-family="Arial" font-size="24" text-anchor="middle" fill="white">SEO Audit Preview</text>
</svg>"##,
        w = PLACEHOLDER_WIDTH,
        h = PLACEHOLDER_HEIGHT,
    )
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(uri: &str) -> String {
        let payload = uri.strip_prefix("data:image/svg+xml;base64,").unwrap();
        String::from_utf8(STANDARD.decode(payload).unwrap()).unwrap()
    }

    #[test]
    fn test_placeholder_shows_domain() {
        let svg = decode(&placeholder_data_uri("https://shop.example.com/cart"));
        assert!(svg.contains("shop.example.com"));
        assert!(svg.contains("#4f46e5"));
        assert!(svg.contains("width=\"1280\""));
    }

    #[test]
    fn test_placeholder_for_unparseable_url() {
        let svg = decode(&placeholder_data_uri("not a url"));
        assert!(svg.contains("SEO Audit Preview"));
    }
}
