use anyhow::{Context, Result};
use reqwest::Client;
use std::io::Cursor;
use std::time::Duration;
use tracing::{info, warn};

use super::Scraper;

/// Credential-free scraper: fetches the page directly and extracts the
/// main article with readability.
pub struct ReadabilityScraper {
    client: Client,
}

impl ReadabilityScraper {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("Blogcast/0.1.0")
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Scraper for ReadabilityScraper {
    fn name(&self) -> &'static str {
        "readability"
    }

    async fn scrape(&self, url: &str) -> Result<String> {
        // Readability needs a Url to resolve relative links
        let url_obj = url::Url::parse(url).context("failed to parse article URL")?;

        let response = self
            .client
            .get(url_obj.clone())
            .send()
            .await
            .context("failed to fetch article page")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("article fetch failed with status: {}", status));
        }

        // Readability requires a Reader, so we fetch bytes
        let bytes = response.bytes().await.context("failed to read response body")?;
        html_to_markdown(&bytes, &url_obj)
    }
}

/// Extract the main content of an HTML page and render it as markdown-like text.
pub fn html_to_markdown(html: &[u8], url: &url::Url) -> Result<String> {
    let mut reader = Cursor::new(html);
    let product = readability::extractor::extract(&mut reader, url)
        .map_err(|e| anyhow::anyhow!("readability could not extract content from {}: {}", url, e))?;

    // Width 80 keeps lines short enough for LLM input
    match html2text::from_read(product.content.as_bytes(), 80) {
        Ok(markdown) => {
            info!("scraping: readability extracted {} chars markdown from {}", markdown.len(), url);
            Ok(markdown)
        }
        Err(e) => {
            warn!("scraping: failed to convert extracted HTML to markdown: {}", e);
            // Plain text is less structured but still usable
            Ok(product.text)
        }
    }
}
