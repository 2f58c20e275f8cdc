use async_trait::async_trait;
use std::path::Path;

use super::TranscriptionError;

pub mod openai_api;
pub mod whisper_cli;

pub use openai_api::OpenAiTranscriptionProvider;
pub use whisper_cli::WhisperCliProvider;

#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn transcribe(
        &self,
        audio_path: &Path,
        language: &str,
    ) -> Result<String, TranscriptionError>;
}
