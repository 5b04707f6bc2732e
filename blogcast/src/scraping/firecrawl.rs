use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use super::Scraper;

/// Scraper backed by the hosted Firecrawl `/scrape` endpoint
pub struct FirecrawlScraper {
    api_url: String,
    api_key: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl FirecrawlScraper {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(60),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout = Duration::from_secs(timeout_secs);
        self
    }
}

#[async_trait::async_trait]
impl Scraper for FirecrawlScraper {
    fn name(&self) -> &'static str {
        "firecrawl"
    }

    async fn scrape(&self, url: &str) -> Result<String> {
        let req_body = ScrapeRequest {
            url,
            formats: &["markdown"],
            only_main_content: true,
        };

        let response = tokio::time::timeout(
            self.timeout,
            self.client
                .post(&self.api_url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&req_body)
                .send(),
        )
        .await
        .context("Firecrawl request timed out")?
        .context("Firecrawl HTTP request failed")?;

        let status = response.status();
        let body = tokio::time::timeout(self.timeout, response.text())
            .await
            .context("Firecrawl response timed out")?
            .context("failed to read Firecrawl response body")?;

        if !status.is_success() {
            // Prefer the API's own error message when the body carries one
            let message = serde_json::from_str::<ScrapeResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .unwrap_or(body);
            anyhow::bail!("Firecrawl API error {}: {}", status, message);
        }

        let parsed: ScrapeResponse =
            serde_json::from_str(&body).context("Failed to parse Firecrawl response")?;

        if !parsed.success {
            anyhow::bail!(
                "Firecrawl reported failure: {}",
                parsed.error.unwrap_or_else(|| "no error message".to_string())
            );
        }

        let markdown = parsed
            .data
            .and_then(|d| d.markdown)
            .context("Firecrawl response has no markdown content")?;

        info!("scraping: firecrawl returned {} chars markdown from {}", markdown.len(), url);
        Ok(markdown)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: &'a [&'a str],
    only_main_content: bool,
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<ScrapeData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScrapeData {
    #[serde(default)]
    markdown: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_asks_for_main_content_markdown() {
        let body = ScrapeRequest {
            url: "https://example.com/post",
            formats: &["markdown"],
            only_main_content: true,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "url": "https://example.com/post",
                "formats": ["markdown"],
                "onlyMainContent": true
            })
        );
    }
}
