use anyhow::Result;

pub mod firecrawl;
pub mod readability;

pub use self::firecrawl::FirecrawlScraper;
pub use self::readability::ReadabilityScraper;

/// Fetches the main content of a web page as markdown.
#[async_trait::async_trait]
pub trait Scraper: Send + Sync {
    /// Short adapter name used in logs
    fn name(&self) -> &'static str;

    /// Scrape `url`, returning only its main content as markdown
    async fn scrape(&self, url: &str) -> Result<String>;
}
