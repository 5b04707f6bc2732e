use anyhow::{Context, Result};
use futures_util::StreamExt;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

use super::{with_chunk_timeout, AudioStream, SpeechRequest, SpeechSynthesizer};

/// ElevenLabs streaming text-to-speech
pub struct ElevenLabsTts {
    /// API root, e.g. "https://api.elevenlabs.io/v1"
    api_url: String,
    api_key: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl ElevenLabsTts {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(120),
            client: reqwest::Client::new(),
        }
    }

    /// Bounds both the initial response and each chunk read
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout = Duration::from_secs(timeout_secs);
        self
    }

    fn stream_url(&self, voice_id: &str) -> String {
        format!(
            "{}/text-to-speech/{}/stream",
            self.api_url.trim_end_matches('/'),
            voice_id
        )
    }
}

#[derive(Debug, Serialize)]
struct TtsBody<'a> {
    text: &'a str,
    model_id: &'a str,
}

#[async_trait::async_trait]
impl SpeechSynthesizer for ElevenLabsTts {
    async fn synthesize(&self, request: SpeechRequest) -> Result<AudioStream> {
        let voice = &request.voice;
        info!(
            "Synthesizing {} chars with ElevenLabs voice {} ({})",
            request.text.len(),
            voice.voice_id,
            voice.output_format
        );

        let response = tokio::time::timeout(
            self.timeout,
            self.client
                .post(self.stream_url(&voice.voice_id))
                .query(&[
                    ("output_format", voice.output_format.as_str()),
                    ("optimize_streaming_latency", voice.optimize_streaming_latency.as_str()),
                ])
                .header("xi-api-key", &self.api_key)
                .header("Accept", "audio/mpeg")
                .json(&TtsBody {
                    text: &request.text,
                    model_id: &voice.model_id,
                })
                .send(),
        )
        .await
        .context("ElevenLabs request timed out")?
        .context("ElevenLabs HTTP request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("ElevenLabs API error {}: {}", status, body);
        }

        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.context("failed to read audio chunk"));

        Ok(with_chunk_timeout(chunks, self.timeout))
    }
}
