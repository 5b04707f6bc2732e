// Podcast script writer
use anyhow::{Context, Result};
use tracing::{info, warn};

use super::{LlmProvider, LlmRequest};

const SUMMARIZATION_PROMPT: &str =
    "Summarize the following blog content and make it engaging and conversational:\n\n{blog_content}";

/// Fill the summarization template with the scraped blog content.
pub fn summarization_prompt(blog_content: &str) -> String {
    SUMMARIZATION_PROMPT.replace("{blog_content}", blog_content)
}

/// Turn scraped blog content into a podcast script.
/// The model output is returned with surrounding whitespace trimmed.
pub async fn write_podcast_script<P: LlmProvider + ?Sized>(
    provider: &P,
    blog_content: &str,
) -> Result<String> {
    let request = LlmRequest::from_prompt(summarization_prompt(blog_content));

    let response = provider
        .generate(request)
        .await
        .context("podcast script generation failed")?;

    let script = response.content.trim().to_string();
    if script.is_empty() {
        warn!("LLM returned an empty podcast script");
    } else {
        info!(
            "Podcast script generated: {} chars, {} tokens",
            script.len(),
            response.usage.total_tokens
        );
    }

    Ok(script)
}
