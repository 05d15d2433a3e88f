use super::BrowserError;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable that overrides executable discovery
pub const CHROME_ENV_VAR: &str = "SUMI_LENS_CHROME";

/// Well-known Chrome/Chromium install locations
const CHROME_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/opt/google/chrome/google-chrome",
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    // Windows
    "C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe",
    "C:\\Program Files (x86)\\Google\\Chrome\\Application\\chrome.exe",
];

/// Binary names looked up on `PATH`
const CHROME_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// Locates a Chrome/Chromium executable
///
/// Resolution order:
/// 1. `explicit` (from the CLI or config file)
/// 2. the `SUMI_LENS_CHROME` environment variable
/// 3. well-known install locations for the platform
/// 4. common binary names on `PATH`
///
/// # Returns
///
/// * `Ok(PathBuf)` - Path to an existing executable
/// * `Err(BrowserError::NotFound)` - Nothing usable was found
pub fn find_chrome(explicit: Option<&Path>) -> Result<PathBuf, BrowserError> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(BrowserError::NotFound(format!(
            "configured executable {} does not exist",
            path.display()
        )));
    }

    if let Ok(value) = std::env::var(CHROME_ENV_VAR) {
        let path = PathBuf::from(value.trim());
        if path.exists() {
            info!("Using Chrome from {}: {}", CHROME_ENV_VAR, path.display());
            return Ok(path);
        }
    }

    for path in CHROME_PATHS {
        let p = Path::new(path);
        if p.exists() {
            info!("Found Chrome at: {}", path);
            return Ok(p.to_path_buf());
        }
    }

    for cmd in CHROME_COMMANDS {
        if let Ok(path) = which::which(cmd) {
            info!("Found Chrome in PATH: {}", path.display());
            return Ok(path);
        }
    }

    Err(BrowserError::NotFound(format!(
        "install Chrome or Chromium, or set {} to its path",
        CHROME_ENV_VAR
    )))
}
