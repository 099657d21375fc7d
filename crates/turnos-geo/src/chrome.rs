//! Headless Chromium navigator.
//!
//! One browser process per lookup, each with a throwaway profile directory.
//! Chromium's `--dump-dom` prints the rendered document after the virtual
//! time budget (the settle delay) runs out; the final map URL is read from
//! the links and meta tags of that document.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use crate::navigator::{NavigateError, Navigator};

/// Wall-clock allowance on top of the settle delay before the process is killed.
const LAUNCH_ALLOWANCE: Duration = Duration::from_secs(25);

static MAPS_PLACE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https://www\.google\.[a-z.]+/maps/[^"'\s<>\\]*@-?\d+\.\d+,-?\d+\.\d+[^"'\s<>\\]*"#)
        .expect("maps place url pattern")
});

static CANONICAL_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<(?:meta[^>]+property="og:url"[^>]+content|link[^>]+rel="canonical"[^>]+href)="(https?://[^"]+)""#)
        .expect("canonical url pattern")
});

static META_MAP_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"content="(https?://[^"]*(?:center|ll|destination)=[^"]*)""#).expect("meta map url pattern")
});

pub struct ChromeNavigator {
    chrome_bin: String,
}

impl ChromeNavigator {
    pub fn new(chrome_bin: impl Into<String>) -> Self {
        Self {
            chrome_bin: chrome_bin.into(),
        }
    }

    /// Binary from `CHROME_BIN`, defaulting to `chromium`.
    pub fn from_env() -> Self {
        Self::new(std::env::var("CHROME_BIN").unwrap_or_else(|_| "chromium".to_string()))
    }
}

#[async_trait]
impl Navigator for ChromeNavigator {
    async fn navigate(&self, url: &str, settle: Duration) -> Result<String, NavigateError> {
        let profile = tempfile::tempdir().map_err(NavigateError::Launch)?;
        let limit = settle + LAUNCH_ALLOWANCE;

        let output = tokio::time::timeout(
            limit,
            tokio::process::Command::new(&self.chrome_bin)
                .args([
                    "--headless=new",
                    "--disable-gpu",
                    "--no-sandbox",
                    "--window-size=1280,800",
                    "--disable-software-rasterizer",
                    "--disable-dev-shm-usage",
                    &format!("--user-data-dir={}", profile.path().display()),
                    &format!("--virtual-time-budget={}", settle.as_millis()),
                    "--dump-dom",
                    url,
                ])
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| NavigateError::Timeout(limit))?
        .map_err(NavigateError::Launch)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(url, status = %output.status, "chromium exited with error");
            return Err(NavigateError::Exited {
                status: output.status.to_string(),
                stderr: stderr.chars().take(500).collect(),
            });
        }

        let dom = String::from_utf8_lossy(&output.stdout);
        let final_url = final_url_from_dom(&dom).unwrap_or_else(|| url.to_string());
        debug!(url, final_url = %final_url, "navigation finished");
        Ok(final_url)
    }

    fn name(&self) -> &str {
        "chromium"
    }
}

/// The place URL the page redirected to, as exposed in its rendered DOM.
fn final_url_from_dom(dom: &str) -> Option<String> {
    if let Some(m) = MAPS_PLACE_URL.find(dom) {
        return Some(m.as_str().replace("&amp;", "&"));
    }
    META_MAP_URL
        .captures(dom)
        .or_else(|| CANONICAL_URL.captures(dom))
        .map(|caps| caps[1].replace("&amp;", "&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_coordinates;
    use turnos_core::Coordinates;

    #[test]
    fn place_url_found_in_dom() {
        let dom = r#"<html><head><link rel="canonical" href="https://www.google.com/maps/place/Farmacia+Centro/@-34.4712,-58.5234,17z/data=!4m6"></head></html>"#;
        let url = final_url_from_dom(dom).unwrap();
        assert_eq!(extract_coordinates(&url), Some(Coordinates::new(-34.4712, -58.5234)));
    }

    #[test]
    fn static_map_meta_is_fallback() {
        let dom = r#"<meta content="https://maps.google.com/maps/api/staticmap?center=-34.61%2C-58.42&amp;zoom=15" itemprop="image">"#;
        let url = final_url_from_dom(dom).unwrap();
        assert!(url.contains("&zoom=15"));
        assert_eq!(extract_coordinates(&url), Some(Coordinates::new(-34.61, -58.42)));
    }

    #[test]
    fn canonical_link_is_last_resort() {
        let dom = r#"<head><meta property="og:url" content="https://www.google.com/maps/search/Belgrano+20"></head>"#;
        assert_eq!(
            final_url_from_dom(dom).as_deref(),
            Some("https://www.google.com/maps/search/Belgrano+20")
        );
    }

    #[test]
    fn dom_without_map_urls() {
        assert!(final_url_from_dom("<html><body>Sin resultados</body></html>").is_none());
    }

    #[tokio::test]
    async fn missing_binary_is_launch_error() {
        let nav = ChromeNavigator::new("/nonexistent/chromium-binary");
        let err = nav
            .navigate("https://example.org", Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, NavigateError::Launch(_)));
    }
}
