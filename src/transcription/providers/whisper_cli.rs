//! Local whisper CLI provider.
//!
//! Runs a whisper.cpp-style binary and reads the transcript from stdout.
//! Local inference failures are never retryable.

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

use super::TranscriptionProvider;
use crate::transcription::TranscriptionError;

pub struct WhisperCliProvider {
    command_path: String,
    model: String,
    model_path: Option<String>,
}

impl WhisperCliProvider {
    pub fn new(
        command_path: Option<String>,
        model: String,
        model_path: Option<String>,
    ) -> Result<Self, TranscriptionError> {
        let command_path = match command_path {
            Some(path) => path,
            None => which::which("whisper-cli")
                .map(|p| p.to_string_lossy().into_owned())
                .map_err(|e| TranscriptionError::Config {
                    reason: format!("whisper-cli not found on PATH: {}", e),
                })?,
        };

        info!("Initialized whisper CLI provider: {}", command_path);

        Ok(Self {
            command_path,
            model,
            model_path,
        })
    }
}

#[async_trait]
impl TranscriptionProvider for WhisperCliProvider {
    fn name(&self) -> &'static str {
        "Whisper CLI"
    }

    async fn transcribe(
        &self,
        audio_path: &Path,
        language: &str,
    ) -> Result<String, TranscriptionError> {
        let mut command = Command::new(&self.command_path);
        command
            .arg("-f")
            .arg(audio_path)
            .arg("-l")
            .arg(language)
            .arg("--no-timestamps");

        if let Some(model_path) = &self.model_path {
            command.arg("-m").arg(model_path);
        } else {
            command.arg("--model").arg(&self.model);
        }

        debug!("Running whisper CLI on {:?}", audio_path);

        let output = command
            .output()
            .await
            .map_err(|e| TranscriptionError::Backend {
                reason: format!("failed to run whisper CLI: {}", e),
                retryable: false,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscriptionError::Backend {
                reason: format!(
                    "whisper CLI exited with {}: {}",
                    output.status,
                    stderr.trim()
                ),
                retryable: false,
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        info!("Whisper CLI transcription complete: {} chars", text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_is_config_error() {
        let result = WhisperCliProvider::new(None, "base".to_string(), None);
        // Either the binary exists on this machine or we get a config error;
        // an explicit path always works.
        if result.is_err() {
            assert!(matches!(
                result.err().unwrap(),
                TranscriptionError::Config { .. }
            ));
        }

        let explicit =
            WhisperCliProvider::new(Some("/opt/whisper/main".to_string()), "base".to_string(), None);
        assert!(explicit.is_ok());
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_backend_error() {
        let provider = WhisperCliProvider::new(
            Some("false".to_string()),
            "base".to_string(),
            None,
        )
        .unwrap();

        let err = provider
            .transcribe(Path::new("/tmp/a.wav"), "en")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TranscriptionError::Backend {
                retryable: false,
                ..
            }
        ));
    }
}
