//! Speech-to-text backend abstraction.
//!
//! The provider is selected once at startup from config; the pipeline only
//! ever sees the `Transcriber` facade.

use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::config::TranscriptionConfig;
use crate::pipeline::retry::Retryable;

pub mod providers;

pub use providers::{OpenAiTranscriptionProvider, TranscriptionProvider, WhisperCliProvider};

#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("transcription backend error: {reason}")]
    Backend { reason: String, retryable: bool },
    #[error("transcription produced empty text")]
    EmptyTranscript,
    #[error("invalid transcription configuration: {reason}")]
    Config { reason: String },
}

impl Retryable for TranscriptionError {
    fn retryable(&self) -> bool {
        matches!(self, Self::Backend { retryable: true, .. })
    }
}

pub struct Transcriber {
    provider: Box<dyn TranscriptionProvider>,
    language: String,
}

impl Transcriber {
    pub fn with_provider(
        provider_name: &str,
        config: &TranscriptionConfig,
    ) -> Result<Self, TranscriptionError> {
        let language = config.language.clone().unwrap_or_else(|| "en".to_string());

        let provider: Box<dyn TranscriptionProvider> = match provider_name {
            "openai-api" => {
                let api_key = config.api_key.clone().ok_or_else(|| {
                    TranscriptionError::Config {
                        reason: "api_key is required for the openai-api provider".to_string(),
                    }
                })?;
                let model = config
                    .model
                    .clone()
                    .unwrap_or_else(|| "whisper-1".to_string());
                Box::new(OpenAiTranscriptionProvider::new(
                    api_key,
                    config.api_endpoint.clone(),
                    model,
                ))
            }
            "whisper-cli" => {
                let model = config.model.clone().unwrap_or_else(|| "base".to_string());
                Box::new(WhisperCliProvider::new(
                    config.command_path.clone(),
                    model,
                    config.model_path.clone(),
                )?)
            }
            _ => {
                return Err(TranscriptionError::Config {
                    reason: format!(
                        "unknown transcription provider '{}'. Supported providers: openai-api, whisper-cli",
                        provider_name
                    ),
                })
            }
        };

        info!("Using {} for transcription", provider.name());

        Ok(Self { provider, language })
    }

    pub fn from_trait(provider: Box<dyn TranscriptionProvider>, language: &str) -> Self {
        Self {
            provider,
            language: language.to_string(),
        }
    }

    /// Transcribe a recording. A blank result is an error: an empty
    /// transcript means empty or corrupt audio and must not flow onward.
    pub async fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError> {
        info!(
            "Transcribing audio file: {:?} with {}",
            audio_path,
            self.provider.name()
        );

        let text = self.provider.transcribe(audio_path, &self.language).await?;
        let text = text.trim().to_string();

        if text.is_empty() {
            return Err(TranscriptionError::EmptyTranscript);
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedProvider(String);

    #[async_trait]
    impl TranscriptionProvider for FixedProvider {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn transcribe(
            &self,
            _audio_path: &Path,
            _language: &str,
        ) -> Result<String, TranscriptionError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_transcribe_trims_output() {
        let transcriber =
            Transcriber::from_trait(Box::new(FixedProvider("  hello world \n".into())), "en");
        let text = transcriber.transcribe(Path::new("/tmp/a.wav")).await.unwrap();
        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn test_blank_transcript_is_terminal() {
        let transcriber = Transcriber::from_trait(Box::new(FixedProvider("   \n".into())), "en");
        let err = transcriber
            .transcribe(Path::new("/tmp/a.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, TranscriptionError::EmptyTranscript));
        assert!(!err.retryable());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let err =
            Transcriber::with_provider("carrier-pigeon", &TranscriptionConfig::default())
                .err()
                .unwrap();
        assert!(matches!(err, TranscriptionError::Config { .. }));
    }

    #[test]
    fn test_openai_provider_requires_api_key() {
        let config = TranscriptionConfig {
            api_key: None,
            ..TranscriptionConfig::default()
        };
        let err = Transcriber::with_provider("openai-api", &config).err().unwrap();
        assert!(matches!(err, TranscriptionError::Config { .. }));
    }
}
