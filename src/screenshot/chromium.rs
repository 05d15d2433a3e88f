//! Chromium capture backend

use super::{CaptureBackend, CaptureKind, CaptureRequest};
use crate::browser::{navigate, BrowserError, BrowserSession};
use crate::config::Config;
use crate::CaptureError;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use std::sync::Arc;
use std::time::Duration;

/// Outlines every element matching the given selectors and tags them
const HIGHLIGHT_SCRIPT: &str = r#"
    ((selectors) => {
        const style = document.createElement('style');
        style.textContent = '[data-lens-highlight] { outline: 3px solid #ef4444 !important; outline-offset: 2px; }';
        document.head.appendChild(style);
        for (const selector of selectors) {
            try {
                document.querySelectorAll(selector).forEach((el) => el.setAttribute('data-lens-highlight', 'true'));
            } catch (e) {}
        }
    })(SELECTORS)
"#;

/// Viewports and timeouts for captures
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub desktop: (u32, u32),
    pub mobile: (u32, u32),
    pub user_agent: String,
    pub mobile_user_agent: String,
    pub navigation_timeout: Duration,
    pub settle_timeout: Duration,
    pub capture_timeout: Duration,
}

impl CaptureSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            desktop: (config.browser.viewport_width, config.browser.viewport_height),
            mobile: (
                config.browser.mobile_viewport_width,
                config.browser.mobile_viewport_height,
            ),
            user_agent: config.browser.user_agent.clone(),
            mobile_user_agent: config.browser.mobile_user_agent.clone(),
            navigation_timeout: Duration::from_millis(config.timeouts.navigation_ms),
            settle_timeout: Duration::from_millis(config.timeouts.settle_ms),
            capture_timeout: Duration::from_millis(config.timeouts.screenshot_ms),
        }
    }
}

/// Emulation and framing for one capture
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureProfile<'a> {
    pub width: u32,
    pub height: u32,
    pub scale: f64,
    pub mobile: bool,
    pub user_agent: &'a str,
    pub full_page: bool,
}

impl CaptureSettings {
    /// Picks the viewport, user agent and framing for `kind`
    pub fn profile(&self, kind: &CaptureKind) -> CaptureProfile<'_> {
        let mobile = *kind == CaptureKind::Mobile;
        let (width, height) = if mobile { self.mobile } else { self.desktop };
        CaptureProfile {
            width,
            height,
            scale: if mobile { 2.0 } else { 1.0 },
            mobile,
            user_agent: if mobile {
                &self.mobile_user_agent
            } else {
                &self.user_agent
            },
            full_page: matches!(kind, CaptureKind::FullPage | CaptureKind::Highlight(_)),
        }
    }
}

/// Captures pages with a shared [`BrowserSession`]
///
/// The browser launches on the first capture and is shut down by `close`.
/// Each capture runs in its own page, which is closed even when the capture
/// fails or times out.
pub struct ChromiumBackend {
    session: Arc<BrowserSession>,
    settings: CaptureSettings,
}

impl ChromiumBackend {
    pub fn new(session: Arc<BrowserSession>, settings: CaptureSettings) -> Self {
        Self { session, settings }
    }

    async fn capture_on(
        &self,
        page: &Page,
        request: &CaptureRequest,
    ) -> Result<Vec<u8>, CaptureError> {
        let url = request.url.as_str();
        let profile = self.settings.profile(&request.kind);

        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(profile.width),
            i64::from(profile.height),
            profile.scale,
            profile.mobile,
        ))
        .await
        .map_err(|e| failed(url, e))?;
        page.execute(SetUserAgentOverrideParams::new(profile.user_agent))
            .await
            .map_err(|e| failed(url, e))?;

        navigate(
            page,
            url,
            self.settings.navigation_timeout,
            self.settings.settle_timeout,
        )
        .await
        .map_err(|e| match e {
            BrowserError::Timeout { url, timeout_ms } => CaptureError::Timeout { url, timeout_ms },
            other => failed(url, other),
        })?;

        match &request.kind {
            CaptureKind::Element(selector) => {
                let element = page.find_element(selector.as_str()).await.map_err(|_| {
                    CaptureError::ElementNotFound {
                        url: url.to_string(),
                        selector: selector.clone(),
                    }
                })?;
                element
                    .screenshot(CaptureScreenshotFormat::Png)
                    .await
                    .map_err(|e| failed(url, e))
            }
            CaptureKind::Highlight(selectors) => {
                page.evaluate(highlight_script(selectors).map_err(|e| failed(url, e))?)
                    .await
                    .map_err(|e| failed(url, e))?;
                screenshot(page, url, profile.full_page).await
            }
            _ => screenshot(page, url, profile.full_page).await,
        }
    }
}

#[async_trait]
impl CaptureBackend for ChromiumBackend {
    async fn capture(&self, request: &CaptureRequest) -> Result<Vec<u8>, CaptureError> {
        let page = self
            .session
            .new_page()
            .await
            .map_err(|e| CaptureError::BrowserUnavailable(e.to_string()))?;

        let result = tokio::time::timeout(
            self.settings.capture_timeout,
            self.capture_on(&page, request),
        )
        .await
        .unwrap_or_else(|_| {
            Err(CaptureError::Timeout {
                url: request.url.clone(),
                timeout_ms: self.settings.capture_timeout.as_millis() as u64,
            })
        });

        self.session.close_page(page).await;
        result
    }

    async fn close(&self) {
        self.session.close().await;
    }
}

/// Script that outlines and tags every element matching `selectors`
fn highlight_script(selectors: &[String]) -> Result<String, serde_json::Error> {
    let list = serde_json::to_string(selectors)?;
    Ok(HIGHLIGHT_SCRIPT.replace("SELECTORS", &list))
}

async fn screenshot(page: &Page, url: &str, full_page: bool) -> Result<Vec<u8>, CaptureError> {
    let params = ScreenshotParams::builder()
        .format(CaptureScreenshotFormat::Png)
        .full_page(full_page)
        .build();
    page.screenshot(params).await.map_err(|e| failed(url, e))
}

fn failed(url: &str, error: impl std::fmt::Display) -> CaptureError {
    CaptureError::Failed {
        url: url.to_string(),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::SessionSettings;
    use crate::screenshot::ScreenshotCapture;

    #[test]
    fn test_settings_from_config() {
        let settings = CaptureSettings::from_config(&Config::default());
        assert_eq!(settings.desktop, (1366, 768));
        assert_eq!(settings.mobile, (390, 844));
        assert_eq!(settings.capture_timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_highlight_script_embeds_selectors() {
        let selectors = vec!["h1".to_string(), "img:not([alt])".to_string()];
        let script = highlight_script(&selectors).unwrap();
        assert!(script.contains(r#"["h1","img:not([alt])"]"#));
        assert!(script.contains("outline: 3px solid"));
        assert!(script.contains("setAttribute('data-lens-highlight'"));
        assert!(!script.contains("SELECTORS"));
    }

    #[test]
    fn test_mobile_profile_uses_mobile_viewport_and_agent() {
        let settings = CaptureSettings::from_config(&Config::default());
        let profile = settings.profile(&CaptureKind::Mobile);

        assert_eq!((profile.width, profile.height), settings.mobile);
        assert_eq!(profile.user_agent, settings.mobile_user_agent);
        assert!(profile.mobile);
        assert_eq!(profile.scale, 2.0);
        assert!(!profile.full_page);
        assert!(profile.width < settings.desktop.0);
    }

    #[test]
    fn test_desktop_profiles() {
        let settings = CaptureSettings::from_config(&Config::default());

        for kind in [CaptureKind::FullPage, CaptureKind::AboveFold] {
            let profile = settings.profile(&kind);
            assert_eq!((profile.width, profile.height), settings.desktop);
            assert_eq!(profile.user_agent, settings.user_agent);
            assert!(!profile.mobile);
            assert_eq!(profile.scale, 1.0);
        }
        assert!(settings.profile(&CaptureKind::FullPage).full_page);
        assert!(!settings.profile(&CaptureKind::AboveFold).full_page);
        assert!(settings.profile(&CaptureKind::Highlight(vec!["h1".into()])).full_page);
        assert!(!settings.profile(&CaptureKind::Element("h1".into())).full_page);
    }

    #[tokio::test]
    async fn test_missing_browser_degrades_to_placeholders() {
        let session = Arc::new(BrowserSession::new(SessionSettings {
            executable: Some("/nonexistent/chrome".into()),
            ..SessionSettings::default()
        }));
        let settings = CaptureSettings::from_config(&Config::default());
        let backend = ChromiumBackend::new(session, settings);
        let capture = ScreenshotCapture::new(backend, 3);

        let shots = capture
            .capture_multiple(&["https://example.com/".to_string()])
            .await;
        assert_eq!(shots.len(), 1);
        assert!(shots[0].placeholder);
    }
}
