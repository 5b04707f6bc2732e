//! Build adapters from configuration.
//!
//! Every credential is resolved here, once, at startup. A missing credential
//! surfaces as [`PipelineError::Configuration`] before any request is sent.

use std::sync::Arc;
use tracing::info;

use common::{Config, LlmConfig, ScraperConfig, TtsConfig};

use crate::error::{PipelineError, Result};
use crate::llm::remote::RemoteLlmProvider;
use crate::llm::LlmProvider;
use crate::pipeline::Pipeline;
use crate::scraping::{FirecrawlScraper, ReadabilityScraper, Scraper};
use crate::tts::{ElevenLabsTts, SpeechSynthesizer, VoiceSettings};

pub fn create_llm_provider(cfg: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    let api_key = cfg
        .resolve_api_key()
        .ok_or_else(|| PipelineError::missing_credential("LLM", &cfg.api_key_env))?;

    let provider = RemoteLlmProvider::new(&cfg.api_url, api_key, &cfg.model).with_defaults(
        cfg.timeout_seconds,
        cfg.max_tokens,
        cfg.temperature,
    );
    info!("LLM provider initialized: remote ({}) at {}", cfg.model, cfg.api_url);
    Ok(Arc::new(provider))
}

pub fn create_scraper(cfg: &ScraperConfig) -> Result<Arc<dyn Scraper>> {
    match cfg.adapter.as_str() {
        "firecrawl" => {
            let api_key = cfg
                .resolve_api_key()
                .ok_or_else(|| PipelineError::missing_credential("Firecrawl", &cfg.api_key_env))?;
            info!("Scraper initialized: firecrawl at {}", cfg.api_url);
            Ok(Arc::new(
                FirecrawlScraper::new(&cfg.api_url, api_key).with_timeout(cfg.timeout_seconds),
            ))
        }
        "readability" => {
            let scraper = ReadabilityScraper::new(cfg.timeout_seconds).map_err(|e| {
                PipelineError::configuration(format!("failed to build readability scraper: {:#}", e))
            })?;
            info!("Scraper initialized: readability (direct fetch)");
            Ok(Arc::new(scraper))
        }
        other => Err(PipelineError::configuration(format!(
            "Unknown scraper adapter '{}' (expected 'firecrawl' or 'readability')",
            other
        ))),
    }
}

pub fn create_speech_synthesizer(cfg: &TtsConfig) -> Result<Arc<dyn SpeechSynthesizer>> {
    let api_key = cfg
        .resolve_api_key()
        .ok_or_else(|| PipelineError::missing_credential("ElevenLabs", &cfg.api_key_env))?;
    info!("Speech synthesizer initialized: ElevenLabs voice {}", cfg.voice_id);
    Ok(Arc::new(
        ElevenLabsTts::new(&cfg.api_url, api_key).with_timeout(cfg.timeout_seconds),
    ))
}

/// Build the full pipeline. Fails if any of the three services lacks a credential.
pub fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let scraper = create_scraper(&config.scraper)?;
    let llm = create_llm_provider(&config.llm)?;
    let tts = create_speech_synthesizer(&config.tts)?;

    if config.observability.resolve_api_key().is_none() {
        info!(
            "no observability credential ({}); traces stay local",
            config.observability.api_key_env
        );
    }

    Ok(Pipeline::new(
        scraper,
        llm,
        tts,
        VoiceSettings::from(&config.tts),
        &config.output.dir,
    )
    .with_project_name(&config.observability.project_name))
}
