use serde::{Deserialize, Serialize};

/// Default desktop user agent for page fetches
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; SumiLens/1.0; +https://github.com/sumi-lens)";

/// Default user agent for mobile captures
pub const DEFAULT_MOBILE_USER_AGENT: &str =
    "Mozilla/5.0 (iPhone; CPU iPhone OS 14_0 like Mac OS X) AppleWebKit/605.1.15";

/// Main configuration structure for Sumi-Lens
///
/// Every section is optional; a missing section falls back to its defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub screenshots: ScreenshotConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Upper bound on the number of pages audited per crawl
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Maximum link depth from the seed URL (seed is depth 0)
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Number of pages processed concurrently
    pub concurrency: usize,

    /// Treat subdomains of the seed host as internal
    #[serde(rename = "include-subdomains")]
    pub include_subdomains: bool,

    /// Skip interior links disallowed by robots.txt
    #[serde(rename = "respect-robots-txt")]
    pub respect_robots_txt: bool,

    /// Check discovered links for 4xx/5xx responses
    #[serde(rename = "verify-links")]
    pub verify_links: bool,

    /// Maximum unique links checked per page
    #[serde(rename = "max-link-checks")]
    pub max_link_checks: usize,

    /// Minimum delay between page dispatches (milliseconds)
    #[serde(rename = "request-delay-ms")]
    pub request_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 50,
            max_depth: 3,
            concurrency: 2,
            include_subdomains: false,
            respect_robots_txt: true,
            verify_links: true,
            max_link_checks: 20,
            request_delay_ms: 0,
        }
    }
}

/// Headless browser configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Render pages in Chromium instead of fetching them over plain HTTP
    pub enabled: bool,

    /// Explicit path to a Chrome/Chromium executable
    pub executable: Option<String>,

    pub headless: bool,

    #[serde(rename = "viewport-width")]
    pub viewport_width: u32,

    #[serde(rename = "viewport-height")]
    pub viewport_height: u32,

    #[serde(rename = "mobile-viewport-width")]
    pub mobile_viewport_width: u32,

    #[serde(rename = "mobile-viewport-height")]
    pub mobile_viewport_height: u32,

    #[serde(rename = "user-agent")]
    pub user_agent: String,

    #[serde(rename = "mobile-user-agent")]
    pub mobile_user_agent: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            executable: None,
            headless: true,
            viewport_width: 1366,
            viewport_height: 768,
            mobile_viewport_width: 390,
            mobile_viewport_height: 844,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            mobile_user_agent: DEFAULT_MOBILE_USER_AGENT.to_string(),
        }
    }
}

/// Timeouts for network and browser operations (milliseconds)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Hard bound on a single page navigation
    #[serde(rename = "navigation-ms")]
    pub navigation_ms: u64,

    /// Best-effort wait for the network to settle after the DOM is parsed
    #[serde(rename = "settle-ms")]
    pub settle_ms: u64,

    #[serde(rename = "screenshot-ms")]
    pub screenshot_ms: u64,

    #[serde(rename = "link-check-ms")]
    pub link_check_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            navigation_ms: 15_000,
            settle_ms: 5_000,
            screenshot_ms: 20_000,
            link_check_ms: 5_000,
        }
    }
}

/// Screenshot capture configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScreenshotConfig {
    /// Real captures per batch; the rest receive placeholders
    #[serde(rename = "max-captures")]
    pub max_captures: usize,
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self { max_captures: 3 }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite audit history database
    #[serde(rename = "database-path")]
    pub database_path: Option<String>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8088,
        }
    }
}
