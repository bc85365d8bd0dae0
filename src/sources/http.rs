use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::app::Result;
use crate::sources::PageSource;

/// Configuration for plain HTTP page fetching
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds (default: 30)
    pub timeout_secs: u64,

    /// User agent string sent with every request
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// reqwest-backed page source shared by all HTTP adapters.
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for PageFetcher {
    async fn fetch_html(&self, url: &str) -> Result<Option<String>> {
        let response = self.client.get(url).send().await?;

        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::GONE) {
            tracing::debug!(url, status = %response.status(), "page not available");
            return Ok(None);
        }

        response.error_for_status_ref()?;

        let body = response.text().await?;
        Ok(Some(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_http_config() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.user_agent.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_partial_http_config() {
        let config: HttpConfig = toml::from_str("timeout_secs = 5").unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert!(!config.user_agent.is_empty());
    }

    #[test]
    fn test_fetcher_builds() {
        assert!(PageFetcher::new(&HttpConfig::default()).is_ok());
    }
}
