use anyhow::Result;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod elevenlabs;

pub use self::elevenlabs::ElevenLabsTts;

/// Synthesized audio, delivered chunk by chunk
pub type AudioStream = BoxStream<'static, Result<Bytes>>;

/// Voice parameters fixed for the lifetime of a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub voice_id: String,
    pub model_id: String,
    pub output_format: String,
    /// Latency optimisation hint passed through to the provider
    pub optimize_streaming_latency: String,
}

impl From<&common::TtsConfig> for VoiceSettings {
    fn from(cfg: &common::TtsConfig) -> Self {
        Self {
            voice_id: cfg.voice_id.clone(),
            model_id: cfg.model_id.clone(),
            output_format: cfg.output_format.clone(),
            optimize_streaming_latency: cfg.optimize_streaming_latency.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: VoiceSettings,
}

/// Text-to-speech provider
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Start synthesis. The returned stream yields audio as it arrives.
    async fn synthesize(&self, request: SpeechRequest) -> Result<AudioStream>;
}

/// Fail the stream if no chunk arrives within `limit`.
pub fn with_chunk_timeout<S>(inner: S, limit: Duration) -> AudioStream
where
    S: futures_util::Stream<Item = Result<Bytes>> + Send + 'static,
{
    stream::unfold(Some(inner.boxed()), move |state| async move {
        let mut inner = state?;
        match tokio::time::timeout(limit, inner.next()).await {
            Ok(Some(item)) => Some((item, Some(inner))),
            Ok(None) => None,
            // Yield the error once, then end the stream
            Err(_) => Some((
                Err(anyhow::anyhow!("timed out after {:?} waiting for audio chunk", limit)),
                None,
            )),
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn chunk_timeout_passes_fast_streams_through() {
        let inner = stream::iter(vec![Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"c"))]);
        let chunks: Vec<_> = with_chunk_timeout(inner, Duration::from_secs(1))
            .collect()
            .await;

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].as_ref().unwrap().as_ref(), b"c");
    }

    #[tokio::test]
    async fn chunk_timeout_ends_stalled_stream_with_error() {
        let inner = stream::pending::<Result<Bytes>>();
        let chunks: Vec<_> = with_chunk_timeout(inner, Duration::from_millis(20))
            .collect()
            .await;

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].as_ref().unwrap_err().to_string().contains("timed out"));
    }
}
