use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::PipelineError;

/// Record threaded through the three stages. Each field after `url` is
/// written by exactly one stage; an empty field means the stage has not
/// produced anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineState {
    url: String,
    blog_content: String,
    podcast_script: String,
    audio_file_path: String,
}

impl PipelineState {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn blog_content(&self) -> &str {
        &self.blog_content
    }

    pub fn podcast_script(&self) -> &str {
        &self.podcast_script
    }

    pub fn audio_file_path(&self) -> &str {
        &self.audio_file_path
    }

    pub(crate) fn set_blog_content(&mut self, content: String) {
        self.blog_content = content;
    }

    pub(crate) fn set_podcast_script(&mut self, script: String) {
        self.podcast_script = script;
    }

    pub(crate) fn set_audio_file_path(&mut self, path: String) {
        self.audio_file_path = path;
    }

    /// Furthest node reached in `Created → Scraped → Summarized → Synthesized`
    pub fn progress(&self) -> Progress {
        if !self.audio_file_path.is_empty() {
            Progress::Synthesized
        } else if !self.podcast_script.is_empty() {
            Progress::Summarized
        } else if !self.blog_content.is_empty() {
            Progress::Scraped
        } else {
            Progress::Created
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Progress {
    Created,
    Scraped,
    Summarized,
    Synthesized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Scrape,
    Summarize,
    Synthesize,
}

impl Stage {
    /// Execution order
    pub const ALL: [Stage; 3] = [Stage::Scrape, Stage::Summarize, Stage::Synthesize];

    /// Span name used when tracing the stage
    pub fn span_name(self) -> &'static str {
        match self {
            Stage::Scrape => "scraping-url",
            Stage::Summarize => "summarizing-content",
            Stage::Synthesize => "generating-audio",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Scrape => "scrape",
            Stage::Summarize => "summarize",
            Stage::Synthesize => "synthesize",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The stage's input field was empty
    MissingInput,
    /// An earlier stage failed
    Halted,
}

#[derive(Debug)]
pub enum StageOutcome {
    Completed,
    Skipped(SkipReason),
    Failed(PipelineError),
}

impl StageOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, StageOutcome::Failed(_))
    }

    /// Label used in logs and API responses
    pub fn label(&self) -> &'static str {
        match self {
            StageOutcome::Completed => "completed",
            StageOutcome::Skipped(_) => "skipped",
            StageOutcome::Failed(_) => "failed",
        }
    }
}

#[derive(Debug)]
pub struct StageReport {
    pub stage: Stage,
    pub outcome: StageOutcome,
    pub elapsed_ms: u64,
}

/// Result of one orchestrator invocation: the (possibly partial) state and
/// what happened at each stage, in execution order.
#[derive(Debug)]
pub struct PipelineRun {
    pub id: Uuid,
    pub state: PipelineState,
    pub reports: Vec<StageReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PipelineRun {
    /// The error that halted the run, if any
    pub fn failure(&self) -> Option<&PipelineError> {
        self.reports.iter().find_map(|r| match &r.outcome {
            StageOutcome::Failed(e) => Some(e),
            _ => None,
        })
    }

    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.reports
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.outcome)
    }

    /// Discard the reports: the final state, or the first stage error.
    pub fn into_result(self) -> Result<PipelineState, PipelineError> {
        for report in self.reports {
            if let StageOutcome::Failed(e) = report.outcome {
                return Err(e);
            }
        }
        Ok(self.state)
    }
}
