//! In-process fake adapters shared by the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};

use blogcast::llm::{LlmProvider, LlmRequest, LlmResponse, UsageMetadata};
use blogcast::pipeline::Pipeline;
use blogcast::scraping::Scraper;
use blogcast::tts::{AudioStream, SpeechRequest, SpeechSynthesizer, VoiceSettings};

/// Completion fake: pops scripted replies, then falls back to a default reply.
pub struct FakeLlm {
    scripted: Mutex<VecDeque<Result<String>>>,
    default_reply: String,
    requests: Mutex<Vec<LlmRequest>>,
}

impl FakeLlm {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            scripted: Mutex::new(VecDeque::new()),
            default_reply: reply.to_string(),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn scripted(replies: Vec<Result<String>>, default_reply: &str) -> Arc<Self> {
        Arc::new(Self {
            scripted: Mutex::new(replies.into()),
            default_reply: default_reply.to_string(),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> LlmRequest {
        self.requests.lock().unwrap()[index].clone()
    }

    pub fn last_request(&self) -> LlmRequest {
        self.requests.lock().unwrap().last().cloned().expect("no requests recorded")
    }
}

#[async_trait::async_trait]
impl LlmProvider for FakeLlm {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        self.requests.lock().unwrap().push(request);
        let next = self.scripted.lock().unwrap().pop_front();
        let content = match next {
            Some(reply) => reply?,
            None => self.default_reply.clone(),
        };
        Ok(LlmResponse {
            content,
            usage: UsageMetadata::default(),
            model: "fake".to_string(),
        })
    }
}

pub struct FakeScraper {
    result: std::result::Result<String, String>,
    calls: AtomicUsize,
}

impl FakeScraper {
    pub fn returning(markdown: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(markdown.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Scraper for FakeScraper {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn scrape(&self, _url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(|m| anyhow::anyhow!(m))
    }
}

pub struct FakeTts {
    chunks: Vec<Vec<u8>>,
    fail_after_chunks: bool,
    requests: Mutex<Vec<SpeechRequest>>,
}

impl FakeTts {
    pub fn streaming(chunks: Vec<Vec<u8>>) -> Arc<Self> {
        Arc::new(Self {
            chunks,
            fail_after_chunks: false,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Yields the chunks, then a stream error
    pub fn breaking(chunks: Vec<Vec<u8>>) -> Arc<Self> {
        Arc::new(Self {
            chunks,
            fail_after_chunks: true,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> SpeechRequest {
        self.requests.lock().unwrap().last().cloned().expect("no requests recorded")
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for FakeTts {
    async fn synthesize(&self, request: SpeechRequest) -> Result<AudioStream> {
        self.requests.lock().unwrap().push(request);
        let mut items: Vec<Result<Bytes>> = self
            .chunks
            .iter()
            .map(|c| Ok(Bytes::from(c.clone())))
            .collect();
        if self.fail_after_chunks {
            items.push(Err(anyhow::anyhow!("connection reset by peer")));
        }
        Ok(stream::iter(items).boxed())
    }
}

pub fn voice() -> VoiceSettings {
    VoiceSettings::from(&common::TtsConfig::default())
}

pub fn pipeline(
    scraper: Arc<FakeScraper>,
    llm: Arc<FakeLlm>,
    tts: Arc<FakeTts>,
    output_dir: &std::path::Path,
) -> Pipeline {
    Pipeline::new(scraper, llm, tts, voice(), output_dir)
}

/// Number of entries in `dir`
pub fn file_count(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
