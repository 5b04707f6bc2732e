//! Error types for the podcast pipeline and chat sessions.

use thiserror::Error;

use crate::pipeline::Stage;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Required credential or setting absent; raised before any network call
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Scraping {url} failed: {message}")]
    Scrape { url: String, message: String },

    #[error("Summarization failed: {message}")]
    Summarize { message: String },

    #[error("Speech synthesis failed: {message}")]
    Synthesis { message: String },

    #[error("Failed to write audio file {path}: {source}")]
    Output {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Chat completion failed: {message}")]
    Chat { message: String },

    #[error("Conversation compaction failed: {message}")]
    Compaction { message: String },
}

impl PipelineError {
    pub fn configuration(message: impl Into<String>) -> Self {
        PipelineError::Configuration {
            message: message.into(),
        }
    }

    /// Missing credential for the named service
    pub fn missing_credential(service: &str, env_var: &str) -> Self {
        PipelineError::Configuration {
            message: format!(
                "{} API key is missing; set it inline or via the {} environment variable",
                service, env_var
            ),
        }
    }

    pub fn scrape(url: &str, err: &anyhow::Error) -> Self {
        PipelineError::Scrape {
            url: url.to_string(),
            message: format!("{:#}", err),
        }
    }

    pub fn summarize(err: &anyhow::Error) -> Self {
        PipelineError::Summarize {
            message: format!("{:#}", err),
        }
    }

    pub fn synthesis(err: &anyhow::Error) -> Self {
        PipelineError::Synthesis {
            message: format!("{:#}", err),
        }
    }

    /// The pipeline stage this error belongs to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Scrape { .. } => Some(Stage::Scrape),
            PipelineError::Summarize { .. } => Some(Stage::Summarize),
            PipelineError::Synthesis { .. } | PipelineError::Output { .. } => {
                Some(Stage::Synthesize)
            }
            PipelineError::Configuration { .. }
            | PipelineError::Chat { .. }
            | PipelineError::Compaction { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
