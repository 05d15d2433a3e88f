use super::{find_chrome, BrowserError};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Resolves once the DOM has been parsed.
const DOM_READY_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete' || document.readyState === 'interactive') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
        }
    })
"#;

/// Resolves once the load event has fired (network mostly idle).
const LOAD_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete') {
            resolve(true);
        } else {
            window.addEventListener('load', () => resolve(true));
        }
    })
"#;

/// Launch options for a [`BrowserSession`]
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub executable: Option<PathBuf>,
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub request_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            window_width: 1366,
            window_height: 768,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl SessionSettings {
    /// Builds launch options from the application config
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            executable: config.browser.executable.as_ref().map(PathBuf::from),
            headless: config.browser.headless,
            window_width: config.browser.viewport_width,
            window_height: config.browser.viewport_height,
            request_timeout: Duration::from_millis(
                config.timeouts.navigation_ms.max(config.timeouts.screenshot_ms),
            ),
        }
    }

    /// Viewport applied to every page the session opens
    pub fn viewport(&self) -> Viewport {
        Viewport {
            width: self.window_width,
            height: self.window_height,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: self.window_width > self.window_height,
            has_touch: false,
        }
    }
}

/// An owned handle to one headless Chromium process
///
/// The process is started on the first call to [`BrowserSession::new_page`]
/// and stays up until [`BrowserSession::close`] is called.
pub struct BrowserSession {
    settings: SessionSettings,
    browser: Mutex<Option<Browser>>,
    handler: Mutex<Option<JoinHandle<()>>>,
}

impl BrowserSession {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            browser: Mutex::new(None),
            handler: Mutex::new(None),
        }
    }

    /// Opens a fresh, isolated page, launching the browser if needed
    ///
    /// Callers own the returned page and must hand it back through
    /// [`BrowserSession::close_page`] on every path.
    pub async fn new_page(&self) -> Result<Page, BrowserError> {
        let mut guard = self.browser.lock().await;
        if guard.is_none() {
            *guard = Some(self.launch().await?);
        }
        let browser = guard.as_ref().ok_or(BrowserError::Closed)?;
        Ok(browser.new_page("about:blank").await?)
    }

    /// Closes a page obtained from [`BrowserSession::new_page`]
    pub async fn close_page(&self, page: Page) {
        let _guard = self.browser.lock().await;
        if let Err(e) = page.close().await {
            debug!("Page close failed: {}", e);
        }
    }

    /// Shuts the browser process down. Safe to call more than once.
    pub async fn close(&self) {
        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(e) = browser.close().await {
                warn!("Browser close failed: {}", e);
            }
            if let Err(e) = browser.wait().await {
                debug!("Browser wait failed: {}", e);
            }
            info!("Browser session closed");
        }
        if let Some(handle) = self.handler.lock().await.take() {
            handle.abort();
        }
    }

    async fn launch(&self) -> Result<Browser, BrowserError> {
        let chrome_path = find_chrome(self.settings.executable.as_deref())?;
        info!(
            "Launching browser {} (headless={})",
            chrome_path.display(),
            self.settings.headless
        );

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(self.settings.window_width, self.settings.window_height)
            .viewport(self.settings.viewport())
            .request_timeout(self.settings.request_timeout);

        if !self.settings.headless {
            builder = builder.with_head();
        }

        let config = builder
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--hide-scrollbars")
            .build()
            .map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handle = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });
        *self.handler.lock().await = Some(handle);

        Ok(browser)
    }
}

/// Navigates `page` to `url` and waits for it to become usable
///
/// Navigation plus DOM parsing is bounded by `navigation_timeout`; a timeout
/// there is an error. Waiting for the network to settle afterwards is
/// best-effort and bounded by `settle_timeout`.
pub async fn navigate(
    page: &Page,
    url: &str,
    navigation_timeout: Duration,
    settle_timeout: Duration,
) -> Result<(), BrowserError> {
    let params = NavigateParams::builder()
        .url(url)
        .build()
        .map_err(|e| BrowserError::Navigation {
            url: url.to_string(),
            message: e,
        })?;

    let navigation = async {
        let response = page.execute(params).await?;
        if let Some(error_text) = response.result.error_text.clone() {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                message: error_text,
            });
        }
        page.evaluate(DOM_READY_SCRIPT.to_string()).await?;
        Ok::<(), BrowserError>(())
    };

    tokio::time::timeout(navigation_timeout, navigation)
        .await
        .map_err(|_| BrowserError::Timeout {
            url: url.to_string(),
            timeout_ms: navigation_timeout.as_millis() as u64,
        })??;

    if tokio::time::timeout(settle_timeout, page.evaluate(LOAD_SCRIPT.to_string()))
        .await
        .is_err()
    {
        debug!("Network did not settle for {} within {:?}", url, settle_timeout);
    }

    Ok(())
}
