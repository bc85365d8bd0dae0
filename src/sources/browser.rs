use std::process::ExitStatus;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::app::{HifiscoutError, Result};
use crate::sources::PageSource;

/// Configuration for headless Chrome rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Whether to run the browser in headless mode (default: true)
    pub headless: bool,

    /// Page load timeout in seconds (default: 30)
    pub timeout_secs: u64,

    /// Wait time after page load for dynamic content in milliseconds (default: 1000)
    pub wait_after_load_ms: u64,

    /// Sources whose pages are rendered in Chrome instead of fetched over HTTP
    pub sources: Vec<String>,

    /// User agent string to use
    pub user_agent: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            timeout_secs: 30,
            wait_after_load_ms: 1000,
            sources: Vec::new(),
            user_agent: Some(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            ),
        }
    }
}

impl BrowserConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn wait_after_load(&self) -> Duration {
        Duration::from_millis(self.wait_after_load_ms)
    }

    /// Whether `site` should be rendered through Chrome.
    pub fn renders(&self, site: &str) -> bool {
        self.sources.iter().any(|s| s.eq_ignore_ascii_case(site))
    }
}

struct RunningBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
}

/// A lazily launched Chrome instance owned by a single adapter.
///
/// The browser starts on the first page request and lives until
/// [`PageSource::close`] is called; a later request relaunches it.
pub struct BrowserSession {
    config: BrowserConfig,
    running: Mutex<Option<RunningBrowser>>,
}

impl BrowserSession {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            running: Mutex::new(None),
        }
    }

    pub async fn is_open(&self) -> bool {
        self.running.lock().await.is_some()
    }

    async fn launch(&self) -> Result<RunningBrowser> {
        let mut builder = ChromeConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-software-rasterizer");

        if let Some(ref ua) = self.config.user_agent {
            builder = builder.arg(format!("--user-agent={}", ua));
        }

        if !self.config.headless {
            builder = builder.with_head();
        }

        let chrome_config = builder
            .build()
            .map_err(|e| HifiscoutError::Browser(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(chrome_config).await.map_err(|e| {
            HifiscoutError::Browser(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;

        let handler = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
        });

        tracing::debug!("browser session launched");
        Ok(RunningBrowser { browser, handler })
    }

    async fn render(&self, browser: &Browser, url: &str) -> Result<String> {
        let page = browser
            .new_page(url)
            .await
            .map_err(|e| HifiscoutError::Browser(format!("Failed to create page: {}", e)))?;

        page.wait_for_navigation()
            .await
            .map_err(|e| HifiscoutError::Browser(format!("Navigation failed: {}", e)))?;

        tokio::time::sleep(self.config.wait_after_load()).await;

        let html = page
            .content()
            .await
            .map_err(|e| HifiscoutError::Browser(format!("Failed to read page content: {}", e)))?;

        if let Err(e) = page.close().await {
            tracing::debug!(url, error = %e, "failed to close page");
        }

        Ok(html)
    }
}

#[async_trait]
impl PageSource for BrowserSession {
    async fn fetch_html(&self, url: &str) -> Result<Option<String>> {
        let mut running = self.running.lock().await;
        if running.is_none() {
            *running = Some(self.launch().await?);
        }
        let Some(ref session) = *running else {
            return Err(HifiscoutError::Browser("Browser session unavailable".into()));
        };

        let html = tokio::time::timeout(self.config.timeout(), self.render(&session.browser, url))
            .await
            .map_err(|_| {
                HifiscoutError::Browser(format!(
                    "Page load timed out after {}s: {}",
                    self.config.timeout_secs, url
                ))
            })??;

        Ok(Some(html))
    }

    async fn close(&self) -> Result<()> {
        let Some(mut session) = self.running.lock().await.take() else {
            return Ok(());
        };

        let result = session
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| HifiscoutError::Browser(format!("Failed to close browser: {}", e)));
        let status = exit_status(session.browser.wait().await);
        session.handler.abort();

        tracing::debug!(?status, "browser session closed");
        result
    }
}

/// Exit status of the Chrome process, logging a failed wait.
fn exit_status(waited: std::io::Result<Option<ExitStatus>>) -> Option<ExitStatus> {
    match waited {
        Ok(status) => status,
        Err(e) => {
            tracing::debug!(error = %e, "browser did not exit cleanly");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = BrowserConfig::default();
        assert!(config.headless);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.wait_after_load(), Duration::from_millis(1000));
        assert!(config.sources.is_empty());
        assert!(config.user_agent.is_some());
    }

    #[test]
    fn test_renders_is_case_insensitive() {
        let config = BrowserConfig {
            sources: vec!["hifitorget".into()],
            ..Default::default()
        };
        assert!(config.renders("HifiTorget"));
        assert!(!config.renders("Taktoton"));
    }

    #[tokio::test]
    async fn test_close_without_launch_is_noop() {
        let session = BrowserSession::new(BrowserConfig::default());
        assert!(!session.is_open().await);
        tokio_test::assert_ok!(session.close().await);
        tokio_test::assert_ok!(session.close().await);
    }

    #[test]
    fn test_failed_exit_wait_is_not_an_error() {
        let waited = Err(std::io::Error::new(std::io::ErrorKind::Other, "no child process"));
        assert!(exit_status(waited).is_none());
        assert!(exit_status(Ok(None)).is_none());
    }
}
