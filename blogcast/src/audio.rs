//! Writing synthesized audio to uniquely named files.

use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::tts::AudioStream;

pub const AUDIO_EXTENSION: &str = "mp3";

const PARTIAL_SUFFIX: &str = "part";

/// Random 128-bit identifier plus the audio extension
pub fn new_audio_file_name() -> String {
    format!("{}.{}", Uuid::new_v4(), AUDIO_EXTENSION)
}

/// True for names produced by [`new_audio_file_name`]; used to refuse
/// arbitrary paths when serving files back.
pub fn is_generated_file_name(name: &str) -> bool {
    match name.strip_suffix(AUDIO_EXTENSION).and_then(|s| s.strip_suffix('.')) {
        Some(stem) => Uuid::parse_str(stem).is_ok(),
        None => false,
    }
}

#[derive(Debug, Clone)]
pub struct WrittenAudio {
    pub path: PathBuf,
    pub file_name: String,
    pub bytes_written: u64,
}

/// Stream audio chunks into `<dir>/<uuid>.mp3`.
///
/// Chunks go to `<name>.part` first and the file is renamed once the stream
/// ends cleanly, so the final name only ever refers to complete audio. On any
/// failure the partial file is removed.
pub async fn write_audio_stream(dir: &Path, mut stream: AudioStream) -> Result<WrittenAudio> {
    let file_name = new_audio_file_name();
    let final_path = dir.join(&file_name);
    let partial_path = dir.join(format!("{}.{}", file_name, PARTIAL_SUFFIX));

    let io_err = |path: &Path, source: std::io::Error| PipelineError::Output {
        path: path.display().to_string(),
        source,
    };

    let mut file = tokio::fs::File::create(&partial_path)
        .await
        .map_err(|e| io_err(&partial_path, e))?;

    let mut bytes_written = 0u64;
    let outcome: Result<()> = async {
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| PipelineError::synthesis(&e))?;
            if chunk.is_empty() {
                continue;
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| io_err(&partial_path, e))?;
            bytes_written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| io_err(&partial_path, e))?;
        Ok(())
    }
    .await;
    drop(file);

    if let Err(e) = outcome {
        if let Err(rm_err) = tokio::fs::remove_file(&partial_path).await {
            warn!("failed to remove partial audio file {}: {}", partial_path.display(), rm_err);
        }
        return Err(e);
    }

    tokio::fs::rename(&partial_path, &final_path)
        .await
        .map_err(|e| io_err(&final_path, e))?;

    debug!("wrote {} audio bytes to {}", bytes_written, final_path.display());
    Ok(WrittenAudio {
        path: final_path,
        file_name,
        bytes_written,
    })
}
