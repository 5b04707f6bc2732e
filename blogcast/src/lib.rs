// Library interface for blogcast modules
// This allows tests and the binary to import modules

pub mod audio;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod providers;
pub mod scraping;
pub mod server;
pub mod sessions;
pub mod tts;

pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, PipelineRun, PipelineState};
