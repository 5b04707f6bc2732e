//! Blog-to-podcast orchestrator.
//!
//! Runs scrape → summarize → synthesize strictly in order over a single
//! [`PipelineState`]. A stage whose input is empty is skipped; the first
//! failing stage halts the run and every later stage is reported as halted.

use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use crate::audio;
use crate::error::PipelineError;
use crate::llm::{summarizer, LlmProvider};
use crate::scraping::Scraper;
use crate::tts::{SpeechRequest, SpeechSynthesizer, VoiceSettings};

mod state;

pub use self::state::{
    PipelineRun, PipelineState, Progress, SkipReason, Stage, StageOutcome, StageReport,
};

pub struct Pipeline {
    scraper: Arc<dyn Scraper>,
    llm: Arc<dyn LlmProvider>,
    tts: Arc<dyn SpeechSynthesizer>,
    voice: VoiceSettings,
    output_dir: PathBuf,
    project_name: String,
}

impl Pipeline {
    pub fn new(
        scraper: Arc<dyn Scraper>,
        llm: Arc<dyn LlmProvider>,
        tts: Arc<dyn SpeechSynthesizer>,
        voice: VoiceSettings,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            scraper,
            llm,
            tts,
            voice,
            output_dir: output_dir.into(),
            project_name: "blog2podcast".to_string(),
        }
    }

    /// Observability project recorded on every run span
    pub fn with_project_name(mut self, project_name: impl Into<String>) -> Self {
        self.project_name = project_name.into();
        self
    }

    pub fn output_dir(&self) -> &std::path::Path {
        &self.output_dir
    }

    pub fn llm(&self) -> Arc<dyn LlmProvider> {
        self.llm.clone()
    }

    /// Run all three stages for `url`.
    pub async fn run(&self, url: &str) -> PipelineRun {
        let id = Uuid::new_v4();
        let span = info_span!(
            "blog2podcast",
            project = %self.project_name,
            run_id = %id,
            url = %url
        );

        async move {
            let started_at = Utc::now();
            let mut state = PipelineState::new(url);
            let mut reports = Vec::with_capacity(Stage::ALL.len());
            let mut halted = false;

            for stage in Stage::ALL {
                if halted {
                    reports.push(StageReport {
                        stage,
                        outcome: StageOutcome::Skipped(SkipReason::Halted),
                        elapsed_ms: 0,
                    });
                    continue;
                }

                let started = Instant::now();
                let outcome = self
                    .run_stage(stage, &mut state)
                    .instrument(stage_span(stage))
                    .await;
                let elapsed_ms = started.elapsed().as_millis() as u64;

                match &outcome {
                    StageOutcome::Completed => info!(%stage, elapsed_ms, "stage completed"),
                    StageOutcome::Skipped(reason) => info!(%stage, ?reason, "stage skipped"),
                    StageOutcome::Failed(e) => {
                        error!(%stage, elapsed_ms, "stage failed: {}", e);
                        halted = true;
                    }
                }

                reports.push(StageReport {
                    stage,
                    outcome,
                    elapsed_ms,
                });
            }

            info!(progress = ?state.progress(), "pipeline finished");
            PipelineRun {
                id,
                state,
                reports,
                started_at,
                finished_at: Utc::now(),
            }
        }
        .instrument(span)
        .await
    }

    async fn run_stage(&self, stage: Stage, state: &mut PipelineState) -> StageOutcome {
        match stage {
            Stage::Scrape => self.scrape(state).await,
            Stage::Summarize => self.summarize(state).await,
            Stage::Synthesize => self.synthesize(state).await,
        }
    }

    /// Stage 1: sets `blog_content` from the main content of `url`.
    pub async fn scrape(&self, state: &mut PipelineState) -> StageOutcome {
        if state.url().trim().is_empty() {
            return StageOutcome::Skipped(SkipReason::MissingInput);
        }

        info!("Scraping content from URL: {} ({})", state.url(), self.scraper.name());
        match self.scraper.scrape(state.url()).await {
            Ok(markdown) => {
                state.set_blog_content(markdown);
                StageOutcome::Completed
            }
            Err(e) => StageOutcome::Failed(PipelineError::scrape(state.url(), &e)),
        }
    }

    /// Stage 2: sets `podcast_script` from `blog_content`.
    pub async fn summarize(&self, state: &mut PipelineState) -> StageOutcome {
        if state.blog_content().is_empty() {
            return StageOutcome::Skipped(SkipReason::MissingInput);
        }

        info!(
            "Summarizing blog content of length {} characters",
            state.blog_content().len()
        );
        match summarizer::write_podcast_script(self.llm.as_ref(), state.blog_content()).await {
            Ok(script) if script.is_empty() => {
                warn!("summarization produced no script; synthesis will be skipped");
                StageOutcome::Completed
            }
            Ok(script) => {
                state.set_podcast_script(script);
                StageOutcome::Completed
            }
            Err(e) => StageOutcome::Failed(PipelineError::summarize(&e)),
        }
    }

    /// Stage 3: streams speech for `podcast_script` into a new audio file
    /// and sets `audio_file_path` once the file is complete.
    pub async fn synthesize(&self, state: &mut PipelineState) -> StageOutcome {
        if state.podcast_script().is_empty() {
            return StageOutcome::Skipped(SkipReason::MissingInput);
        }

        info!(
            "Generating audio from podcast script of length {} characters",
            state.podcast_script().len()
        );
        let request = SpeechRequest {
            text: state.podcast_script().to_string(),
            voice: self.voice.clone(),
        };

        let stream = match self.tts.synthesize(request).await {
            Ok(stream) => stream,
            Err(e) => return StageOutcome::Failed(PipelineError::synthesis(&e)),
        };

        match audio::write_audio_stream(&self.output_dir, stream).await {
            Ok(written) => {
                info!(
                    "Audio written to {} ({} bytes)",
                    written.path.display(),
                    written.bytes_written
                );
                state.set_audio_file_path(written.path.to_string_lossy().into_owned());
                StageOutcome::Completed
            }
            Err(e) => StageOutcome::Failed(e),
        }
    }
}

/// Span a stage runs under, named after [`Stage::span_name`]
fn stage_span(stage: Stage) -> Span {
    match stage {
        Stage::Scrape => info_span!("scraping-url"),
        Stage::Summarize => info_span!("summarizing-content"),
        Stage::Synthesize => info_span!("generating-audio"),
    }
}
